//! Alert Throttle (C4): decides, for a monitor already known to be in an
//! adverse state, whether a new alert record should be emitted.

use chrono::{DateTime, Utc};

use crate::model::AlertFrequency;

/// `true` iff enough time has passed since the last alert (or none was ever
/// sent) for a new one to be due. Only meaningful when the caller has
/// already established the monitor's fresh result is adverse — this
/// function does not itself inspect probe results.
pub fn should_alert(last_alert_sent_at: Option<DateTime<Utc>>, alert_frequency: AlertFrequency, now: DateTime<Utc>) -> bool {
    match last_alert_sent_at {
        None => true,
        Some(last) => (now - last).num_minutes() >= alert_frequency.minutes(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn no_prior_alert_is_always_due() {
        let now = Utc::now();
        assert!(should_alert(None, AlertFrequency::FiveMinutes, now));
    }

    #[test]
    fn gap_shorter_than_frequency_is_not_due() {
        let now = Utc::now();
        let last = now - Duration::minutes(2);
        assert!(!should_alert(Some(last), AlertFrequency::FiveMinutes, now));
    }

    #[test]
    fn gap_equal_to_frequency_is_due() {
        let now = Utc::now();
        let last = now - Duration::minutes(5);
        assert!(should_alert(Some(last), AlertFrequency::FiveMinutes, now));
    }

    #[test]
    fn gap_longer_than_frequency_is_due() {
        let now = Utc::now();
        let last = now - Duration::minutes(30);
        assert!(should_alert(Some(last), AlertFrequency::FiveMinutes, now));
    }
}

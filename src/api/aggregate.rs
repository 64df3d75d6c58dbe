//! Read Aggregators (C8): the pure computations behind the HTTP surface.
//!
//! Deliberately free of any store or axum dependency, so the monitoring
//! stats classification and the rolling uptime % algorithm — bug included,
//! see the design notes — can be unit tested directly, following the
//! teacher's preference for testing logic without I/O wherever it's pure.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::model::{Monitor, MonitorKind, UptimeEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MonitoringStatsSummary {
    pub up: usize,
    pub down: usize,
    pub paused: usize,
}

/// Classifies each monitor as `Up`, `Down`, or `Paused` using its latest
/// event, or `Down` if it has none and is not paused.
pub fn monitoring_stats(monitors: &[Monitor], latest_events: &HashMap<String, UptimeEvent>) -> MonitoringStatsSummary {
    let mut summary = MonitoringStatsSummary::default();
    for monitor in monitors {
        if monitor.is_paused {
            summary.paused += 1;
            continue;
        }
        match latest_events.get(&monitor.id) {
            Some(event) if !event.authoritative().is_adverse(monitor.kind) => summary.up += 1,
            _ => summary.down += 1,
        }
    }
    summary
}

/// The rolling uptime % over a window of `window_days` days, computed
/// exactly per the source algorithm: each interval between consecutive
/// events is credited as "up" based on whether the event that *ends* the
/// interval is positive, not the state that actually held during it. This
/// is a known quirk, preserved rather than corrected (see DESIGN.md).
///
/// `events` must already be filtered to `timestamp >= t0` and sorted
/// ascending by timestamp.
pub fn rolling_uptime_percent(kind: MonitorKind, events: &[UptimeEvent], t0: DateTime<Utc>, now: DateTime<Utc>, window_days: f64) -> f64 {
    if events.is_empty() {
        return 100.0;
    }

    let mut up_ms: i64 = 0;
    let mut cursor = t0;
    let mut last_was_positive = false;

    for event in events {
        let positive = !event.authoritative().is_adverse(kind);
        if positive {
            up_ms += (event.timestamp - cursor).num_milliseconds();
        }
        cursor = event.timestamp;
        last_was_positive = positive;
    }

    if last_was_positive {
        up_ms += (now - cursor).num_milliseconds();
    }

    let window_ms = window_days * 86_400_000.0;
    let pct = (up_ms as f64 / window_ms) * 100.0;
    pct.clamp(0.0, 100.0).round()
}

#[derive(Debug, Clone)]
pub struct DowntimeSummary {
    pub event: UptimeEvent,
    pub duration_ms: i64,
}

/// Duration of the latest adverse event: `end_time - timestamp` if closed,
/// else `now - timestamp` for one still in progress.
pub fn latest_downtime(event: UptimeEvent, now: DateTime<Utc>) -> DowntimeSummary {
    let duration_ms = match event.end_time {
        Some(end) => (end - event.timestamp).num_milliseconds(),
        None => (now - event.timestamp).num_milliseconds(),
    };
    DowntimeSummary { event, duration_ms }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Availability, PingStatus, PortStatus};
    use chrono::Duration;

    fn event(kind: MonitorKind, timestamp: DateTime<Utc>, availability: Availability) -> UptimeEvent {
        UptimeEvent {
            id: 1,
            monitor_id: "m1".to_string(),
            user_id: "user-1".to_string(),
            timestamp,
            end_time: None,
            kind,
            availability,
            ping: PingStatus::Reachable,
            port: PortStatus::Open,
            response_time_ms: 10,
            confirmed_by_agent: "agent".to_string(),
            reason: None,
        }
    }

    fn monitor(id: &str, kind: MonitorKind, is_paused: bool) -> Monitor {
        Monitor {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            kind,
            url: "http://ex.com".to_string(),
            port: 443,
            frequency: crate::model::Frequency::OneMinute,
            alert_frequency: crate::model::AlertFrequency::OneMinute,
            is_paused,
            last_alert_sent_at: None,
            updated_at: Utc::now(),
            created_at: Utc::now(),
            name: None,
            contacts: vec![],
        }
    }

    #[test]
    fn no_events_reports_full_uptime() {
        let now = Utc::now();
        let t0 = now - Duration::days(1);
        assert_eq!(rolling_uptime_percent(MonitorKind::Web, &[], t0, now, 1.0), 100.0);
    }

    #[test]
    fn first_event_down_over_full_window_reproduces_the_documented_bug() {
        let now = Utc::now();
        let t0 = now - Duration::hours(24);
        let first_event_at = now - Duration::hours(12);
        let events = vec![event(MonitorKind::Web, first_event_at, Availability::Down)];
        // The preceding 12h should morally count as uptime (it preceded the
        // drop), but the algorithm credits it only if the event itself is
        // positive — it isn't, so the result is 0%, not ~50%.
        assert_eq!(rolling_uptime_percent(MonitorKind::Web, &events, t0, now, 1.0), 0.0);
    }

    #[test]
    fn trailing_positive_state_credits_up_to_now() {
        let now = Utc::now();
        let t0 = now - Duration::hours(24);
        let up_at = now - Duration::hours(6);
        let events = vec![event(MonitorKind::Web, up_at, Availability::Up)];
        let pct = rolling_uptime_percent(MonitorKind::Web, &events, t0, now, 1.0);
        assert_eq!(pct, 25.0);
    }

    #[test]
    fn result_is_always_clamped_to_0_100() {
        let now = Utc::now();
        let t0 = now - Duration::hours(1);
        let events = vec![event(MonitorKind::Web, t0 - Duration::hours(1), Availability::Up)];
        let pct = rolling_uptime_percent(MonitorKind::Web, &events, t0, now, 1.0);
        assert!((0.0..=100.0).contains(&pct));
    }

    #[test]
    fn monitoring_stats_counts_paused_before_consulting_events() {
        let monitors = vec![
            monitor("m1", MonitorKind::Web, true),
            monitor("m2", MonitorKind::Web, false),
            monitor("m3", MonitorKind::Web, false),
        ];
        let mut latest = HashMap::new();
        latest.insert("m2".to_string(), event(MonitorKind::Web, Utc::now(), Availability::Up));
        // m3 has no event at all -> Down.

        let summary = monitoring_stats(&monitors, &latest);
        assert_eq!(summary, MonitoringStatsSummary { up: 1, down: 1, paused: 1 });
    }

    #[test]
    fn latest_downtime_uses_end_time_when_closed() {
        let now = Utc::now();
        let start = now - Duration::hours(2);
        let mut e = event(MonitorKind::Web, start, Availability::Down);
        e.end_time = Some(start + Duration::hours(1));
        let summary = latest_downtime(e, now);
        assert_eq!(summary.duration_ms, Duration::hours(1).num_milliseconds());
    }

    #[test]
    fn latest_downtime_uses_now_when_still_open() {
        let now = Utc::now();
        let start = now - Duration::minutes(30);
        let e = event(MonitorKind::Web, start, Availability::Down);
        let summary = latest_downtime(e, now);
        assert_eq!(summary.duration_ms, Duration::minutes(30).num_milliseconds());
    }

    use proptest::prelude::*;

    proptest! {
        /// Invariant 5: rolling uptime % is always in [0, 100], for any
        /// sequence of events scattered across the window at arbitrary
        /// offsets and availabilities.
        #[test]
        fn uptime_percent_always_in_bounds(
            offsets_secs in prop::collection::vec(0u32..86_400, 0..20),
            flags in prop::collection::vec(any::<bool>(), 0..20),
        ) {
            let now = Utc::now();
            let t0 = now - Duration::days(1);

            let mut offsets = offsets_secs;
            offsets.sort_unstable();

            let events: Vec<UptimeEvent> = offsets
                .iter()
                .zip(flags.iter().cycle())
                .map(|(offset, up)| {
                    let ts = t0 + Duration::seconds(*offset as i64);
                    let availability = if *up { Availability::Up } else { Availability::Down };
                    event(MonitorKind::Web, ts, availability)
                })
                .collect();

            let pct = rolling_uptime_percent(MonitorKind::Web, &events, t0, now, 1.0);
            prop_assert!((0.0..=100.0).contains(&pct));
        }
    }
}

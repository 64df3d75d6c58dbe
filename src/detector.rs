//! State-Change Detector (C3): a pure decision of whether a fresh probe
//! result represents a transition worth appending as a new event.

use crate::model::{AuthoritativeValue, MonitorKind};
use crate::probe::ProbeResultFields;

/// Decides whether a fresh result differs from the last-persisted
/// authoritative value for `kind`. `last` is `None` when no prior event
/// exists, in which case the `"Unknown"` sentinel always compares unequal
/// and an append always occurs.
pub fn should_append(kind: MonitorKind, fresh: ProbeResultFields, last: Option<ProbeResultFields>) -> bool {
    let fresh_auth = authoritative_value(kind, fresh);
    let last_auth = last
        .map(|l| authoritative_value(kind, l))
        .unwrap_or(AuthoritativeValue::Unknown);
    fresh_auth != last_auth
}

fn authoritative_value(kind: MonitorKind, fields: ProbeResultFields) -> AuthoritativeValue {
    match kind {
        MonitorKind::Web => AuthoritativeValue::Availability(fields.availability),
        MonitorKind::Ping => AuthoritativeValue::Ping(fields.ping),
        MonitorKind::Port => AuthoritativeValue::Port(fields.port),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Availability, PingStatus, PortStatus};

    fn fields(availability: Availability) -> ProbeResultFields {
        ProbeResultFields {
            availability,
            ping: PingStatus::Unreachable,
            port: PortStatus::Closed,
        }
    }

    #[test]
    fn no_prior_event_always_appends() {
        assert!(should_append(MonitorKind::Web, fields(Availability::Up), None));
        assert!(should_append(MonitorKind::Web, fields(Availability::Down), None));
    }

    #[test]
    fn identical_authoritative_value_does_not_append() {
        let last = fields(Availability::Up);
        let fresh = fields(Availability::Up);
        assert!(!should_append(MonitorKind::Web, fresh, Some(last)));
    }

    #[test]
    fn changed_authoritative_value_appends() {
        let last = fields(Availability::Up);
        let fresh = fields(Availability::Down);
        assert!(should_append(MonitorKind::Web, fresh, Some(last)));
    }

    #[test]
    fn only_the_kind_authoritative_field_is_compared() {
        // ping/port differ but web only cares about availability
        let last = ProbeResultFields {
            availability: Availability::Up,
            ping: PingStatus::Reachable,
            port: PortStatus::Open,
        };
        let fresh = ProbeResultFields {
            availability: Availability::Up,
            ping: PingStatus::Unreachable,
            port: PortStatus::Closed,
        };
        assert!(!should_append(MonitorKind::Web, fresh, Some(last)));
    }

    use proptest::prelude::*;

    fn arb_availability() -> impl Strategy<Value = Availability> {
        prop_oneof![Just(Availability::Up), Just(Availability::Down)]
    }

    fn arb_fields() -> impl Strategy<Value = ProbeResultFields> {
        arb_availability().prop_map(|availability| ProbeResultFields {
            availability,
            ping: PingStatus::Unreachable,
            port: PortStatus::Closed,
        })
    }

    proptest! {
        /// Invariant 2: feeding a random sequence of probe results through
        /// `should_append` and only keeping the ones that pass never yields
        /// two adjacent kept results with the same authoritative value.
        #[test]
        fn kept_results_strictly_alternate(results in prop::collection::vec(arb_fields(), 1..30)) {
            let mut last: Option<ProbeResultFields> = None;
            let mut kept = Vec::new();
            for fresh in results {
                if should_append(MonitorKind::Web, fresh, last) {
                    kept.push(fresh);
                    last = Some(fresh);
                }
            }
            for pair in kept.windows(2) {
                prop_assert_ne!(pair[0].availability, pair[1].availability);
            }
        }

        /// `should_append` is a pure function of its two inputs: calling it
        /// twice with the same arguments gives the same answer.
        #[test]
        fn is_pure(fresh in arb_fields(), last in proptest::option::of(arb_fields())) {
            let a = should_append(MonitorKind::Web, fresh, last);
            let b = should_append(MonitorKind::Web, fresh, last);
            prop_assert_eq!(a, b);
        }
    }
}

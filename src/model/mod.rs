//! The persisted data model: `Monitor`, `UptimeEvent`, `Alert`, `MonitorAgent`.
//!
//! Monitors are created/updated/deleted by the REST collaborator and merely
//! consumed here. `UptimeEvent`s and `Alert`s are produced exclusively by
//! this pipeline.

mod agent;
mod alert;
mod event;
mod monitor;

pub use agent::{AgentType, MonitorAgent};
pub use alert::Alert;
pub use event::{Availability, PingStatus, PortStatus, UptimeEvent};
pub use monitor::{AlertFrequency, Frequency, Monitor, MonitorKind};

/// The authoritative result of a probe, independent of which field actually
/// decides transitions for a given monitor kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AuthoritativeResult {
    pub availability: Availability,
    pub ping: PingStatus,
    pub port: PortStatus,
}

impl AuthoritativeResult {
    /// The field that matters for `kind`, as an opaque comparable token.
    pub fn authoritative_for(&self, kind: MonitorKind) -> AuthoritativeValue {
        match kind {
            MonitorKind::Web => AuthoritativeValue::Availability(self.availability),
            MonitorKind::Ping => AuthoritativeValue::Ping(self.ping),
            MonitorKind::Port => AuthoritativeValue::Port(self.port),
        }
    }

    /// Whether the authoritative field for `kind` is in its adverse state.
    pub fn is_adverse(&self, kind: MonitorKind) -> bool {
        match kind {
            MonitorKind::Web => self.availability == Availability::Down,
            MonitorKind::Ping => self.ping == PingStatus::Unreachable,
            MonitorKind::Port => self.port == PortStatus::Closed,
        }
    }
}

/// A single comparable value: either the authoritative field's value, or the
/// `"Unknown"` sentinel used when no prior event exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthoritativeValue {
    Availability(Availability),
    Ping(PingStatus),
    Port(PortStatus),
    Unknown,
}

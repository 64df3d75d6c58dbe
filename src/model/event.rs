use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::monitor::MonitorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Availability {
    Up,
    Down,
}

impl Availability {
    /// Normalizes a raw agent response string. Anything other than the exact
    /// string `"Up"` is adverse — including absence of the field.
    pub fn normalize(raw: Option<&str>) -> Availability {
        match raw {
            Some("Up") => Availability::Up,
            _ => Availability::Down,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum PingStatus {
    Reachable,
    Unreachable,
}

impl PingStatus {
    pub fn normalize(raw: Option<&str>) -> PingStatus {
        match raw {
            Some("Reachable") => PingStatus::Reachable,
            _ => PingStatus::Unreachable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum PortStatus {
    Open,
    Closed,
}

impl PortStatus {
    pub fn normalize(raw: Option<&str>) -> PortStatus {
        match raw {
            Some("Open") => PortStatus::Open,
            _ => PortStatus::Closed,
        }
    }
}

/// One append-only record of an observed state transition of a monitor.
///
/// Immutable once written except for `end_time`, which is set exactly once
/// by the very next event for the same monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UptimeEvent {
    pub id: i64,
    pub monitor_id: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub kind: MonitorKind,
    pub availability: Availability,
    pub ping: PingStatus,
    pub port: PortStatus,
    pub response_time_ms: i64,
    pub confirmed_by_agent: String,
    pub reason: Option<String>,
}

impl UptimeEvent {
    pub fn authoritative(&self) -> super::AuthoritativeResult {
        super::AuthoritativeResult {
            availability: self.availability,
            ping: self.ping,
            port: self.port,
        }
    }
}

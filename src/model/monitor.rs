use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The check mode of a monitor. Immutable after create in effect: changing it
/// invalidates historical state semantics (see the module-level design notes
/// on kind changes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorKind {
    Web,
    Ping,
    Port,
}

impl MonitorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorKind::Web => "web",
            MonitorKind::Ping => "ping",
            MonitorKind::Port => "port",
        }
    }
}

impl std::fmt::Display for MonitorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MonitorKind {
    type Err = InvalidEnumeration;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web" => Ok(MonitorKind::Web),
            "ping" => Ok(MonitorKind::Ping),
            "port" => Ok(MonitorKind::Port),
            other => Err(InvalidEnumeration(other.to_string())),
        }
    }
}

/// The polling cadence of a monitor, restricted to the fixed bucket set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Frequency {
    OneMinute,
    FiveMinutes,
    TenMinutes,
    ThirtyMinutes,
    SixtyMinutes,
}

impl Frequency {
    pub fn minutes(&self) -> u32 {
        match self {
            Frequency::OneMinute => 1,
            Frequency::FiveMinutes => 5,
            Frequency::TenMinutes => 10,
            Frequency::ThirtyMinutes => 30,
            Frequency::SixtyMinutes => 60,
        }
    }

    /// All five buckets, in ascending order. The Bucket Scheduler spawns one
    /// ticker per entry.
    pub fn all() -> [Frequency; 5] {
        [
            Frequency::OneMinute,
            Frequency::FiveMinutes,
            Frequency::TenMinutes,
            Frequency::ThirtyMinutes,
            Frequency::SixtyMinutes,
        ]
    }
}

impl TryFrom<u32> for Frequency {
    type Error = InvalidEnumeration;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Frequency::OneMinute),
            5 => Ok(Frequency::FiveMinutes),
            10 => Ok(Frequency::TenMinutes),
            30 => Ok(Frequency::ThirtyMinutes),
            60 => Ok(Frequency::SixtyMinutes),
            other => Err(InvalidEnumeration(other.to_string())),
        }
    }
}

impl From<Frequency> for u32 {
    fn from(value: Frequency) -> Self {
        value.minutes()
    }
}

/// The minimum gap between two alerts for a monitor, restricted to the fixed
/// enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum AlertFrequency {
    OneMinute,
    FiveMinutes,
    TenMinutes,
    TwentyMinutes,
    ThirtyMinutes,
    SixtyMinutes,
    OneDay,
}

impl AlertFrequency {
    pub fn minutes(&self) -> i64 {
        match self {
            AlertFrequency::OneMinute => 1,
            AlertFrequency::FiveMinutes => 5,
            AlertFrequency::TenMinutes => 10,
            AlertFrequency::TwentyMinutes => 20,
            AlertFrequency::ThirtyMinutes => 30,
            AlertFrequency::SixtyMinutes => 60,
            AlertFrequency::OneDay => 1440,
        }
    }
}

impl TryFrom<u32> for AlertFrequency {
    type Error = InvalidEnumeration;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(AlertFrequency::OneMinute),
            5 => Ok(AlertFrequency::FiveMinutes),
            10 => Ok(AlertFrequency::TenMinutes),
            20 => Ok(AlertFrequency::TwentyMinutes),
            30 => Ok(AlertFrequency::ThirtyMinutes),
            60 => Ok(AlertFrequency::SixtyMinutes),
            1440 => Ok(AlertFrequency::OneDay),
            other => Err(InvalidEnumeration(other.to_string())),
        }
    }
}

impl From<AlertFrequency> for u32 {
    fn from(value: AlertFrequency) -> Self {
        value.minutes() as u32
    }
}

#[derive(Debug, Clone)]
pub struct InvalidEnumeration(String);

impl std::fmt::Display for InvalidEnumeration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' is not one of the allowed enumerated values", self.0)
    }
}

impl std::error::Error for InvalidEnumeration {}

/// A single thing to be probed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monitor {
    pub id: String,
    pub user_id: String,
    pub kind: MonitorKind,
    pub url: String,
    pub port: u16,
    pub frequency: Frequency,
    pub alert_frequency: AlertFrequency,
    pub is_paused: bool,
    pub last_alert_sent_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub name: Option<String>,
    pub contacts: Vec<String>,
}

impl Monitor {
    /// `port` defaults to 443 when omitted at construction time (e.g. from a
    /// deserialized request where the field was left out entirely).
    pub fn default_port() -> u16 {
        443
    }
}

//! HTTP response DTOs for the Read Aggregators surface (C8).

use serde::{Deserialize, Serialize};

use crate::model::{MonitorKind, UptimeEvent};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

/// Response for `GET /api/v1/users/:id/stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStatsResponse {
    pub user_id: String,
    pub up: usize,
    pub down: usize,
    pub paused: usize,
}

/// Response for `GET /api/v1/monitors/:id/stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorStatsResponse {
    pub monitor_id: String,
    pub kind: MonitorKind,
    pub status: MonitorStatus,
    pub latest_event: Option<UptimeEventDto>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MonitorStatus {
    Up,
    Down,
    Paused,
}

/// Response for `GET /api/v1/monitors/:id/uptime?days=N`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UptimeResponse {
    pub monitor_id: String,
    pub window_days: f64,
    pub uptime_percent: f64,
}

/// Response for `GET /api/v1/monitors/:id/events?page=N`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsResponse {
    pub monitor_id: String,
    pub page: i64,
    pub events: Vec<UptimeEventDto>,
}

/// Response for `GET /api/v1/downtime/latest[?user_id=...]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestDowntimeResponse {
    pub event: Option<UptimeEventDto>,
    pub duration_ms: Option<i64>,
}

/// A wire-friendly projection of `UptimeEvent`, with RFC3339 timestamp
/// strings instead of `DateTime<Utc>` to keep the JSON shape stable
/// regardless of how `chrono`'s own serde impl happens to format things.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UptimeEventDto {
    pub id: i64,
    pub monitor_id: String,
    pub timestamp: String,
    pub end_time: Option<String>,
    pub availability: String,
    pub ping: String,
    pub port: String,
    pub response_time_ms: i64,
    pub confirmed_by_agent: String,
    pub reason: Option<String>,
}

impl From<UptimeEvent> for UptimeEventDto {
    fn from(event: UptimeEvent) -> Self {
        Self {
            id: event.id,
            monitor_id: event.monitor_id,
            timestamp: event.timestamp.to_rfc3339(),
            end_time: event.end_time.map(|t| t.to_rfc3339()),
            availability: format!("{:?}", event.availability),
            ping: format!("{:?}", event.ping),
            port: format!("{:?}", event.port),
            response_time_ms: event.response_time_ms,
            confirmed_by_agent: event.confirmed_by_agent,
            reason: event.reason,
        }
    }
}

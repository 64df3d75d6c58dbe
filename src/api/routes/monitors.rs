//! Per-monitor read endpoints: stats, rolling uptime %, event history.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{Duration, Utc};
use serde::Deserialize;

use crate::api::aggregate;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::ApiState;
use crate::api::types::{EventsResponse, MonitorStatsResponse, MonitorStatus, UptimeEventDto, UptimeResponse};

#[derive(Debug, Deserialize)]
pub struct UptimeQuery {
    #[serde(default = "default_window_days")]
    days: f64,
}

fn default_window_days() -> f64 {
    30.0
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    page: i64,
}

/// `GET /api/v1/monitors/:id/stats`
pub async fn get_monitor_stats(State(state): State<ApiState>, Path(monitor_id): Path<String>) -> ApiResult<Json<MonitorStatsResponse>> {
    let monitor = state
        .store
        .get_monitor(&monitor_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("monitor {monitor_id} not found")))?;

    let latest_event = state.store.latest_event(&monitor_id).await?;

    let status = if monitor.is_paused {
        MonitorStatus::Paused
    } else {
        match &latest_event {
            Some(event) if !event.authoritative().is_adverse(monitor.kind) => MonitorStatus::Up,
            _ => MonitorStatus::Down,
        }
    };

    Ok(Json(MonitorStatsResponse {
        monitor_id,
        kind: monitor.kind,
        status,
        latest_event: latest_event.map(UptimeEventDto::from),
    }))
}

/// `GET /api/v1/monitors/:id/uptime?days=N`
pub async fn get_monitor_uptime(
    State(state): State<ApiState>,
    Path(monitor_id): Path<String>,
    Query(query): Query<UptimeQuery>,
) -> ApiResult<Json<UptimeResponse>> {
    if query.days <= 0.0 {
        return Err(ApiError::InvalidRequest("days must be positive".to_string()));
    }

    let monitor = state
        .store
        .get_monitor(&monitor_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("monitor {monitor_id} not found")))?;

    let now = Utc::now();
    let t0 = now - Duration::milliseconds((query.days * 86_400_000.0) as i64);
    let events = state.store.events_since(&monitor_id, t0).await?;

    let uptime_percent = aggregate::rolling_uptime_percent(monitor.kind, &events, t0, now, query.days);

    Ok(Json(UptimeResponse {
        monitor_id,
        window_days: query.days,
        uptime_percent,
    }))
}

/// `GET /api/v1/monitors/:id/events?page=N`
pub async fn get_monitor_events(
    State(state): State<ApiState>,
    Path(monitor_id): Path<String>,
    Query(query): Query<EventsQuery>,
) -> ApiResult<Json<EventsResponse>> {
    if query.page < 0 {
        return Err(ApiError::InvalidRequest("page must be non-negative".to_string()));
    }

    let events = state.store.paged_events(&monitor_id, query.page).await?;

    Ok(Json(EventsResponse {
        monitor_id,
        page: query.page,
        events: events.into_iter().map(UptimeEventDto::from).collect(),
    }))
}

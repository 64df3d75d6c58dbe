//! Per-user monitoring stats (C8's `monitoringStats` aggregator).

use axum::extract::{Path, State};
use axum::Json;
use std::collections::HashMap;

use crate::api::aggregate;
use crate::api::error::ApiResult;
use crate::api::state::ApiState;
use crate::api::types::UserStatsResponse;

/// `GET /api/v1/users/:id/stats`
pub async fn get_user_stats(State(state): State<ApiState>, Path(user_id): Path<String>) -> ApiResult<Json<UserStatsResponse>> {
    let monitors = state.store.monitors_for_user(&user_id).await?;

    let mut latest_events = HashMap::with_capacity(monitors.len());
    for monitor in &monitors {
        if let Some(event) = state.store.latest_event(&monitor.id).await? {
            latest_events.insert(monitor.id.clone(), event);
        }
    }

    let summary = aggregate::monitoring_stats(&monitors, &latest_events);

    Ok(Json(UserStatsResponse {
        user_id,
        up: summary.up,
        down: summary.down,
        paused: summary.paused,
    }))
}

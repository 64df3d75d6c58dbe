//! Latest-downtime aggregator (C8), optionally scoped to a user.

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::api::aggregate;
use crate::api::error::ApiResult;
use crate::api::state::ApiState;
use crate::api::types::{LatestDowntimeResponse, UptimeEventDto};

#[derive(Debug, Deserialize)]
pub struct DowntimeQuery {
    user_id: Option<String>,
}

/// `GET /api/v1/downtime/latest[?user_id=...]`
pub async fn get_latest_downtime(State(state): State<ApiState>, Query(query): Query<DowntimeQuery>) -> ApiResult<Json<LatestDowntimeResponse>> {
    let event = state.store.latest_adverse_event(query.user_id.as_deref()).await?;

    let response = match event {
        Some(event) => {
            let summary = aggregate::latest_downtime(event, Utc::now());
            LatestDowntimeResponse {
                event: Some(UptimeEventDto::from(summary.event)),
                duration_ms: Some(summary.duration_ms),
            }
        }
        None => LatestDowntimeResponse { event: None, duration_ms: None },
    };

    Ok(Json(response))
}

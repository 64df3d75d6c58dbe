//! Read Aggregators HTTP exposure (C8).
//!
//! This module provides read-only HTTP endpoints over the Event/Alert
//! Store: per-monitor stats and uptime, per-user stats, latest downtime,
//! and a health check. It is independent of the tick path — C1-C6 keep
//! running whether or not the API is enabled.
//!
//! ## Endpoints
//!
//! - `GET /api/v1/health`
//! - `GET /api/v1/monitors/{id}/stats`
//! - `GET /api/v1/monitors/{id}/uptime`
//! - `GET /api/v1/monitors/{id}/events`
//! - `GET /api/v1/users/{id}/stats`
//! - `GET /api/v1/downtime/latest`

#[cfg(feature = "api")]
pub mod aggregate;
#[cfg(feature = "api")]
pub mod error;
#[cfg(feature = "api")]
pub mod middleware;
#[cfg(feature = "api")]
pub mod routes;
#[cfg(feature = "api")]
pub mod state;
#[cfg(feature = "api")]
pub mod types;

#[cfg(feature = "api")]
pub use error::{ApiError, ApiResult};
#[cfg(feature = "api")]
pub use state::ApiState;
#[cfg(feature = "api")]
pub use types::{EventsResponse, HealthResponse, LatestDowntimeResponse, MonitorStatsResponse, UptimeResponse, UserStatsResponse};

#[cfg(feature = "api")]
use axum::{Router, routing::get};
use std::net::SocketAddr;
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:8080")
    pub bind_addr: SocketAddr,

    /// Optional authentication token
    pub auth_token: Option<String>,

    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".parse().unwrap(),
            auth_token: None,
            enable_cors: true,
        }
    }
}

/// Spawns the API server as an Axum HTTP server in a background task.
/// Returns the server's local address.
#[cfg(feature = "api")]
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    info!("starting API server on {}", config.bind_addr);

    let mut app = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/monitors/:id/stats", get(routes::monitors::get_monitor_stats))
        .route("/api/v1/monitors/:id/uptime", get(routes::monitors::get_monitor_uptime))
        .route("/api/v1/monitors/:id/events", get(routes::monitors::get_monitor_events))
        .route("/api/v1/users/:id/stats", get(routes::users::get_user_stats))
        .route("/api/v1/downtime/latest", get(routes::downtime::get_latest_downtime))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.enable_cors {
        let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
        app = app.layer(cors);
    }

    if let Some(token) = config.auth_token {
        app = app.layer(axum::middleware::from_fn_with_state(token, middleware::auth::auth_middleware));
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}

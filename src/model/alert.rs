use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An intent-to-notify record: a durable queue entry for an external
/// delivery worker. This pipeline only enqueues these; it never sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    pub user_id: String,
    pub monitor_id: String,
    pub url: String,
    pub tries: i32,
    pub max_tries: i32,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    pub const DEFAULT_TRIES: i32 = 0;
    pub const DEFAULT_MAX_TRIES: i32 = 3;
}

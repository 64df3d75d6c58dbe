//! Event / Alert Store Contracts (C7): the data model and query patterns the
//! pipeline reads and writes, abstracted behind a trait so the concrete
//! backend can be swapped, following the teacher's `StorageBackend`
//! abstraction.

pub mod error;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use error::{StorageError, StorageResult};

use crate::model::{Alert, Frequency, Monitor, MonitorAgent, UptimeEvent};
use crate::probe::ProbeResultFields;

/// Fields needed to append a new `UptimeEvent`; the id is assigned by the
/// backend.
#[derive(Debug, Clone)]
pub struct NewUptimeEvent {
    pub monitor_id: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: crate::model::MonitorKind,
    pub fields: ProbeResultFields,
    pub response_time_ms: i64,
    pub confirmed_by_agent: String,
    pub reason: Option<String>,
}

/// Fields needed to enqueue a new `Alert`; the id is assigned by the backend.
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub user_id: String,
    pub monitor_id: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// A page of monitors due for probing in a given bucket tick.
#[derive(Debug, Clone)]
pub struct DuePage {
    pub monitors: Vec<Monitor>,
    pub has_more: bool,
}

/// A stable position in the due-monitor ordering, keyed on `(updated_at,
/// id)` rather than a row count. Passed back into `due_monitors` to fetch
/// the next page; anchoring to the last-seen key (instead of a numeric
/// `OFFSET`) keeps pagination correct even though `touch_monitor` moves
/// already-processed rows out of the `WHERE updated_at <= cutoff` filter
/// mid-tick — an `OFFSET` would silently skip rows as the underlying result
/// set shrinks out from under it.
#[derive(Debug, Clone)]
pub struct DueCursor {
    pub updated_at: DateTime<Utc>,
    pub id: String,
}

pub const DUE_PAGE_SIZE: i64 = 100;
pub const EVENT_HISTORY_PAGE_SIZE: i64 = 10;

/// The store abstraction required by C1–C8. All methods that can fail with a
/// storage error return `StorageResult`; callers are responsible for mapping
/// failures into the `PersistenceRead`/`PersistenceWrite` handling rules
/// described in the design (in particular: a failed latest-event read must
/// never be treated as "no prior event").
#[async_trait]
pub trait EventStore: Send + Sync {
    /// The most recent event for a monitor, or `None` if none exists yet.
    async fn latest_event(&self, monitor_id: &str) -> StorageResult<Option<UptimeEvent>>;

    /// Appends a new event and, if `close_prior` is `Some`, sets that prior
    /// event's `end_time` to the new event's timestamp. Implementations must
    /// perform the prior-event update before (or atomically with) the
    /// append, but the new event is considered "written last" in the sense
    /// that readers racing with the append never see it for an instant
    /// alongside a still-open prior event with no other explanation.
    async fn append_event(&self, event: NewUptimeEvent, close_prior_event_id: Option<i64>) -> StorageResult<UptimeEvent>;

    /// Monitors in `frequency`'s bucket with `is_paused = false` and
    /// `updated_at <= cutoff`, ordered by `(updated_at, id)` ascending and
    /// paged at `DUE_PAGE_SIZE` using a keyset cursor rather than an
    /// `OFFSET` — see [`DueCursor`] for why.
    async fn due_monitors(&self, frequency: Frequency, cutoff: DateTime<Utc>, after: Option<DueCursor>) -> StorageResult<DuePage>;

    /// Unconditionally bumps a monitor's `updated_at`.
    async fn touch_monitor(&self, monitor_id: &str, now: DateTime<Utc>) -> StorageResult<()>;

    /// Fetches a single monitor by id, used by the worker to read
    /// `alert_frequency`/`last_alert_sent_at`/`user_id` right before
    /// consulting the throttle.
    async fn get_monitor(&self, monitor_id: &str) -> StorageResult<Option<Monitor>>;

    /// Inserts a new alert record.
    async fn insert_alert(&self, alert: NewAlert) -> StorageResult<Alert>;

    /// Sets `monitor.last_alert_sent_at`. Performed regardless of whether
    /// the alert insert above succeeded, so a late/duplicate alert next tick
    /// is still throttled.
    async fn mark_alert_sent(&self, monitor_id: &str, now: DateTime<Utc>) -> StorageResult<()>;

    /// All registered monitor agents (both `monitorAgents` and
    /// `alertAgents` types — filtering to `monitorAgents` is the Agent
    /// Pool's job).
    async fn list_monitor_agents(&self) -> StorageResult<Vec<MonitorAgent>>;

    /// Events for a monitor with `timestamp >= since`, ascending. Used by
    /// the rolling uptime % aggregator.
    async fn events_since(&self, monitor_id: &str, since: DateTime<Utc>) -> StorageResult<Vec<UptimeEvent>>;

    /// Paged event history for a monitor, descending by timestamp, at
    /// `EVENT_HISTORY_PAGE_SIZE` per page.
    async fn paged_events(&self, monitor_id: &str, page: i64) -> StorageResult<Vec<UptimeEvent>>;

    /// All monitors owned by a user — used by the monitoring-stats
    /// aggregator.
    async fn monitors_for_user(&self, user_id: &str) -> StorageResult<Vec<Monitor>>;

    /// The single most recent event with any adverse field, optionally
    /// scoped to a user. Used by the latest-downtime aggregator.
    async fn latest_adverse_event(&self, user_id: Option<&str>) -> StorageResult<Option<UptimeEvent>>;

    /// Deletes any rows in the optional atomic-lease table (§4.6a), run once
    /// at startup before the bucket tickers are spawned.
    async fn clear_scheduler_leases(&self) -> StorageResult<()>;
}

//! SQLite-backed implementation of [`EventStore`].
//!
//! Connection setup (WAL journal mode, `Normal` synchronous, busy timeout,
//! bounded pool) follows the teacher's `storage/sqlite.rs`. Migrations are
//! run with `sqlx::migrate!` against the `migrations/` directory at the
//! workspace root.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, Sqlite, SqlitePool};
use tracing::{debug, instrument};

use super::error::{StorageError, StorageResult};
use super::{DueCursor, DuePage, EventStore, NewAlert, NewUptimeEvent, DUE_PAGE_SIZE, EVENT_HISTORY_PAGE_SIZE};
use crate::model::{
    Alert, AgentType, Availability, Frequency, Monitor, MonitorAgent, MonitorKind, PingStatus,
    PortStatus, UptimeEvent,
};

pub struct SqliteEventStore {
    pool: SqlitePool,
}

impl SqliteEventStore {
    pub async fn connect(database_path: &str) -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str(database_path)
            .map_err(|err| StorageError::ConnectionFailed(err.to_string()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|err| StorageError::ConnectionFailed(err.to_string()))?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    #[cfg(test)]
    pub async fn connect_in_memory() -> StorageResult<Self> {
        Self::connect(":memory:").await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn parse_ts(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| StorageError::SerializationError(err.to_string()))
}

fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

fn row_to_monitor(row: &sqlx::sqlite::SqliteRow) -> StorageResult<Monitor> {
    let kind_str: String = row.try_get("kind").map_err(|e| StorageError::QueryFailed(e.to_string()))?;
    let kind = MonitorKind::from_str(&kind_str).map_err(|e| StorageError::SerializationError(e.to_string()))?;
    let frequency_raw: i64 = row.try_get("frequency").map_err(|e| StorageError::QueryFailed(e.to_string()))?;
    let frequency = Frequency::try_from(frequency_raw as u32).map_err(|e| StorageError::SerializationError(e.to_string()))?;
    let alert_frequency_raw: i64 = row
        .try_get("alert_frequency")
        .map_err(|e| StorageError::QueryFailed(e.to_string()))?;
    let alert_frequency = crate::model::AlertFrequency::try_from(alert_frequency_raw as u32)
        .map_err(|e| StorageError::SerializationError(e.to_string()))?;
    let last_alert_sent_at: Option<String> = row
        .try_get("last_alert_sent_at")
        .map_err(|e| StorageError::QueryFailed(e.to_string()))?;
    let updated_at: String = row.try_get("updated_at").map_err(|e| StorageError::QueryFailed(e.to_string()))?;
    let created_at: String = row.try_get("created_at").map_err(|e| StorageError::QueryFailed(e.to_string()))?;
    let contacts_json: String = row.try_get("contacts").map_err(|e| StorageError::QueryFailed(e.to_string()))?;
    let contacts: Vec<String> =
        serde_json::from_str(&contacts_json).map_err(|e| StorageError::SerializationError(e.to_string()))?;
    let port_raw: i64 = row.try_get("port").map_err(|e| StorageError::QueryFailed(e.to_string()))?;

    Ok(Monitor {
        id: row.try_get("id").map_err(|e| StorageError::QueryFailed(e.to_string()))?,
        user_id: row.try_get("user_id").map_err(|e| StorageError::QueryFailed(e.to_string()))?,
        kind,
        url: row.try_get("url").map_err(|e| StorageError::QueryFailed(e.to_string()))?,
        port: port_raw as u16,
        frequency,
        alert_frequency,
        is_paused: row.try_get::<i64, _>("is_paused").map_err(|e| StorageError::QueryFailed(e.to_string()))? != 0,
        last_alert_sent_at: last_alert_sent_at.map(|s| parse_ts(&s)).transpose()?,
        updated_at: parse_ts(&updated_at)?,
        created_at: parse_ts(&created_at)?,
        name: row.try_get("name").map_err(|e| StorageError::QueryFailed(e.to_string()))?,
        contacts,
    })
}

fn row_to_event(row: &sqlx::sqlite::SqliteRow) -> StorageResult<UptimeEvent> {
    let kind_str: String = row.try_get("kind").map_err(|e| StorageError::QueryFailed(e.to_string()))?;
    let kind = MonitorKind::from_str(&kind_str).map_err(|e| StorageError::SerializationError(e.to_string()))?;
    let timestamp: String = row.try_get("timestamp").map_err(|e| StorageError::QueryFailed(e.to_string()))?;
    let end_time: Option<String> = row.try_get("end_time").map_err(|e| StorageError::QueryFailed(e.to_string()))?;
    let availability_str: String = row.try_get("availability").map_err(|e| StorageError::QueryFailed(e.to_string()))?;
    let ping_str: String = row.try_get("ping").map_err(|e| StorageError::QueryFailed(e.to_string()))?;
    let port_str: String = row.try_get("port").map_err(|e| StorageError::QueryFailed(e.to_string()))?;

    Ok(UptimeEvent {
        id: row.try_get("id").map_err(|e| StorageError::QueryFailed(e.to_string()))?,
        monitor_id: row.try_get("monitor_id").map_err(|e| StorageError::QueryFailed(e.to_string()))?,
        user_id: row.try_get("user_id").map_err(|e| StorageError::QueryFailed(e.to_string()))?,
        timestamp: parse_ts(&timestamp)?,
        end_time: end_time.map(|s| parse_ts(&s)).transpose()?,
        kind,
        availability: availability_from_str(&availability_str),
        ping: ping_from_str(&ping_str),
        port: port_from_str(&port_str),
        response_time_ms: row
            .try_get("response_time_ms")
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?,
        confirmed_by_agent: row
            .try_get("confirmed_by_agent")
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?,
        reason: row.try_get("reason").map_err(|e| StorageError::QueryFailed(e.to_string()))?,
    })
}

fn availability_from_str(s: &str) -> Availability {
    if s == "Up" { Availability::Up } else { Availability::Down }
}
fn ping_from_str(s: &str) -> PingStatus {
    if s == "Reachable" { PingStatus::Reachable } else { PingStatus::Unreachable }
}
fn port_from_str(s: &str) -> PortStatus {
    if s == "Open" { PortStatus::Open } else { PortStatus::Closed }
}
fn availability_str(a: Availability) -> &'static str {
    match a { Availability::Up => "Up", Availability::Down => "Down" }
}
fn ping_str(p: PingStatus) -> &'static str {
    match p { PingStatus::Reachable => "Reachable", PingStatus::Unreachable => "Unreachable" }
}
fn port_str(p: PortStatus) -> &'static str {
    match p { PortStatus::Open => "Open", PortStatus::Closed => "Closed" }
}

#[async_trait]
impl EventStore for SqliteEventStore {
    #[instrument(skip(self))]
    async fn latest_event(&self, monitor_id: &str) -> StorageResult<Option<UptimeEvent>> {
        let row = sqlx::query(
            "SELECT * FROM uptime_events WHERE monitor_id = ? ORDER BY timestamp DESC LIMIT 1",
        )
        .bind(monitor_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_event).transpose()
    }

    #[instrument(skip(self, event))]
    async fn append_event(&self, event: NewUptimeEvent, close_prior_event_id: Option<i64>) -> StorageResult<UptimeEvent> {
        let mut tx = self.pool.begin().await?;

        if let Some(prior_id) = close_prior_event_id {
            sqlx::query("UPDATE uptime_events SET end_time = ? WHERE id = ?")
                .bind(fmt_ts(event.timestamp))
                .bind(prior_id)
                .execute(&mut *tx)
                .await?;
        }

        let inserted = sqlx::query(
            "INSERT INTO uptime_events
                (monitor_id, user_id, timestamp, end_time, kind, availability, ping, port, response_time_ms, confirmed_by_agent, reason)
             VALUES (?, ?, ?, NULL, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.monitor_id)
        .bind(&event.user_id)
        .bind(fmt_ts(event.timestamp))
        .bind(event.kind.as_str())
        .bind(availability_str(event.fields.availability))
        .bind(ping_str(event.fields.ping))
        .bind(port_str(event.fields.port))
        .bind(event.response_time_ms)
        .bind(&event.confirmed_by_agent)
        .bind(&event.reason)
        .execute(&mut *tx)
        .await?;

        let new_id = inserted.last_insert_rowid();

        let row = sqlx::query("SELECT * FROM uptime_events WHERE id = ?")
            .bind(new_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        row_to_event(&row)
    }

    #[instrument(skip(self))]
    async fn due_monitors(&self, frequency: Frequency, cutoff: DateTime<Utc>, after: Option<DueCursor>) -> StorageResult<DuePage> {
        // Keyset pagination on `(updated_at, id)`, not `OFFSET`: `touch_monitor`
        // bumps `updated_at` past `cutoff` for every monitor already handed
        // out, which drops it out of this very `WHERE` clause mid-tick. An
        // `OFFSET` counts positions into a result set that is shrinking
        // under it and silently skips rows; anchoring to the last-seen key
        // is immune to that because it never relies on row counts.
        let rows = match after {
            Some(cursor) => {
                sqlx::query(
                    "SELECT * FROM monitors
                     WHERE frequency = ? AND is_paused = 0 AND updated_at <= ?
                       AND (updated_at > ? OR (updated_at = ? AND id > ?))
                     ORDER BY updated_at ASC, id ASC
                     LIMIT ?",
                )
                .bind(frequency.minutes() as i64)
                .bind(fmt_ts(cutoff))
                .bind(fmt_ts(cursor.updated_at))
                .bind(fmt_ts(cursor.updated_at))
                .bind(&cursor.id)
                .bind(DUE_PAGE_SIZE + 1)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT * FROM monitors
                     WHERE frequency = ? AND is_paused = 0 AND updated_at <= ?
                     ORDER BY updated_at ASC, id ASC
                     LIMIT ?",
                )
                .bind(frequency.minutes() as i64)
                .bind(fmt_ts(cutoff))
                .bind(DUE_PAGE_SIZE + 1)
                .fetch_all(&self.pool)
                .await?
            }
        };

        let has_more = rows.len() as i64 > DUE_PAGE_SIZE;
        let monitors = rows
            .iter()
            .take(DUE_PAGE_SIZE as usize)
            .map(row_to_monitor)
            .collect::<StorageResult<Vec<_>>>()?;

        debug!(count = monitors.len(), bucket = frequency.minutes(), "due monitors page fetched");
        Ok(DuePage { monitors, has_more })
    }

    #[instrument(skip(self))]
    async fn touch_monitor(&self, monitor_id: &str, now: DateTime<Utc>) -> StorageResult<()> {
        sqlx::query("UPDATE monitors SET updated_at = ? WHERE id = ?")
            .bind(fmt_ts(now))
            .bind(monitor_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_monitor(&self, monitor_id: &str) -> StorageResult<Option<Monitor>> {
        let row = sqlx::query("SELECT * FROM monitors WHERE id = ?")
            .bind(monitor_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_monitor).transpose()
    }

    #[instrument(skip(self, alert))]
    async fn insert_alert(&self, alert: NewAlert) -> StorageResult<Alert> {
        let inserted = sqlx::query(
            "INSERT INTO alerts (user_id, monitor_id, url, tries, max_tries, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&alert.user_id)
        .bind(&alert.monitor_id)
        .bind(&alert.url)
        .bind(Alert::DEFAULT_TRIES)
        .bind(Alert::DEFAULT_MAX_TRIES)
        .bind(fmt_ts(alert.created_at))
        .execute(&self.pool)
        .await?;

        Ok(Alert {
            id: inserted.last_insert_rowid(),
            user_id: alert.user_id,
            monitor_id: alert.monitor_id,
            url: alert.url,
            tries: Alert::DEFAULT_TRIES,
            max_tries: Alert::DEFAULT_MAX_TRIES,
            created_at: alert.created_at,
        })
    }

    #[instrument(skip(self))]
    async fn mark_alert_sent(&self, monitor_id: &str, now: DateTime<Utc>) -> StorageResult<()> {
        sqlx::query("UPDATE monitors SET last_alert_sent_at = ? WHERE id = ?")
            .bind(fmt_ts(now))
            .bind(monitor_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_monitor_agents(&self) -> StorageResult<Vec<MonitorAgent>> {
        let rows = sqlx::query("SELECT * FROM monitor_agents").fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                let type_str: String = row.try_get("type").map_err(|e| StorageError::QueryFailed(e.to_string()))?;
                let agent_type = match type_str.as_str() {
                    "monitorAgents" => AgentType::MonitorAgents,
                    _ => AgentType::AlertAgents,
                };
                Ok(MonitorAgent {
                    id: row.try_get("id").map_err(|e| StorageError::QueryFailed(e.to_string()))?,
                    agent_type,
                    region: row.try_get("region").map_err(|e| StorageError::QueryFailed(e.to_string()))?,
                    url: row.try_get("url").map_err(|e| StorageError::QueryFailed(e.to_string()))?,
                })
            })
            .collect()
    }

    #[instrument(skip(self))]
    async fn events_since(&self, monitor_id: &str, since: DateTime<Utc>) -> StorageResult<Vec<UptimeEvent>> {
        let rows = sqlx::query(
            "SELECT * FROM uptime_events WHERE monitor_id = ? AND timestamp >= ? ORDER BY timestamp ASC",
        )
        .bind(monitor_id)
        .bind(fmt_ts(since))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_event).collect()
    }

    #[instrument(skip(self))]
    async fn paged_events(&self, monitor_id: &str, page: i64) -> StorageResult<Vec<UptimeEvent>> {
        let offset = page * EVENT_HISTORY_PAGE_SIZE;
        let rows = sqlx::query(
            "SELECT * FROM uptime_events WHERE monitor_id = ? ORDER BY timestamp DESC LIMIT ? OFFSET ?",
        )
        .bind(monitor_id)
        .bind(EVENT_HISTORY_PAGE_SIZE)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_event).collect()
    }

    #[instrument(skip(self))]
    async fn monitors_for_user(&self, user_id: &str) -> StorageResult<Vec<Monitor>> {
        let rows = sqlx::query("SELECT * FROM monitors WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_monitor).collect()
    }

    #[instrument(skip(self))]
    async fn latest_adverse_event(&self, user_id: Option<&str>) -> StorageResult<Option<UptimeEvent>> {
        let row = match user_id {
            Some(uid) => {
                sqlx::query(
                    "SELECT * FROM uptime_events
                     WHERE user_id = ? AND (availability = 'Down' OR ping = 'Unreachable' OR port = 'Closed')
                     ORDER BY timestamp DESC LIMIT 1",
                )
                .bind(uid)
                .fetch_optional(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT * FROM uptime_events
                     WHERE (availability = 'Down' OR ping = 'Unreachable' OR port = 'Closed')
                     ORDER BY timestamp DESC LIMIT 1",
                )
                .fetch_optional(&self.pool)
                .await?
            }
        };
        row.as_ref().map(row_to_event).transpose()
    }

    #[instrument(skip(self))]
    async fn clear_scheduler_leases(&self) -> StorageResult<()> {
        sqlx::query("DELETE FROM scheduler_leases").execute(&self.pool).await?;
        Ok(())
    }
}

//! An in-memory `EventStore` test double, used only by unit tests that want
//! to drive C4/C5 without a real database. Not compiled into production
//! builds — see the design notes on why no in-memory backend ships for C7
//! outside of tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::error::StorageResult;
use super::{DueCursor, DuePage, EventStore, NewAlert, NewUptimeEvent, DUE_PAGE_SIZE, EVENT_HISTORY_PAGE_SIZE};
use crate::model::{Alert, Monitor, MonitorAgent, UptimeEvent};

#[derive(Default)]
struct State {
    monitors: HashMap<String, Monitor>,
    events: Vec<UptimeEvent>,
    alerts: Vec<Alert>,
    agents: Vec<MonitorAgent>,
    next_event_id: i64,
    next_alert_id: i64,
}

pub struct InMemoryEventStore {
    state: Mutex<State>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    pub async fn seed_monitor(&self, monitor: Monitor) {
        self.state.lock().await.monitors.insert(monitor.id.clone(), monitor);
    }

    pub async fn seed_agents(&self, agents: Vec<MonitorAgent>) {
        self.state.lock().await.agents = agents;
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn latest_event(&self, monitor_id: &str) -> StorageResult<Option<UptimeEvent>> {
        let state = self.state.lock().await;
        Ok(state
            .events
            .iter()
            .filter(|e| e.monitor_id == monitor_id)
            .max_by_key(|e| e.timestamp)
            .cloned())
    }

    async fn append_event(&self, event: NewUptimeEvent, close_prior_event_id: Option<i64>) -> StorageResult<UptimeEvent> {
        let mut state = self.state.lock().await;

        if let Some(prior_id) = close_prior_event_id {
            let ts = event.timestamp;
            if let Some(prior) = state.events.iter_mut().find(|e| e.id == prior_id) {
                prior.end_time = Some(ts);
            }
        }

        state.next_event_id += 1;
        let id = state.next_event_id;
        let written = UptimeEvent {
            id,
            monitor_id: event.monitor_id,
            user_id: event.user_id,
            timestamp: event.timestamp,
            end_time: None,
            kind: event.kind,
            availability: event.fields.availability,
            ping: event.fields.ping,
            port: event.fields.port,
            response_time_ms: event.response_time_ms,
            confirmed_by_agent: event.confirmed_by_agent,
            reason: event.reason,
        };
        state.events.push(written.clone());
        Ok(written)
    }

    async fn due_monitors(&self, frequency: crate::model::Frequency, cutoff: DateTime<Utc>, after: Option<DueCursor>) -> StorageResult<DuePage> {
        let state = self.state.lock().await;
        let mut matching: Vec<Monitor> = state
            .monitors
            .values()
            .filter(|m| m.frequency == frequency && !m.is_paused && m.updated_at <= cutoff)
            .filter(|m| match &after {
                Some(cursor) => (m.updated_at, &m.id) > (cursor.updated_at, &cursor.id),
                None => true,
            })
            .cloned()
            .collect();
        matching.sort_by_key(|m| (m.updated_at, m.id.clone()));

        let has_more = matching.len() > DUE_PAGE_SIZE as usize;
        let page_items = matching.into_iter().take(DUE_PAGE_SIZE as usize).collect();
        Ok(DuePage {
            monitors: page_items,
            has_more,
        })
    }

    async fn touch_monitor(&self, monitor_id: &str, now: DateTime<Utc>) -> StorageResult<()> {
        let mut state = self.state.lock().await;
        if let Some(m) = state.monitors.get_mut(monitor_id) {
            m.updated_at = now;
        }
        Ok(())
    }

    async fn get_monitor(&self, monitor_id: &str) -> StorageResult<Option<Monitor>> {
        Ok(self.state.lock().await.monitors.get(monitor_id).cloned())
    }

    async fn insert_alert(&self, alert: NewAlert) -> StorageResult<Alert> {
        let mut state = self.state.lock().await;
        state.next_alert_id += 1;
        let written = Alert {
            id: state.next_alert_id,
            user_id: alert.user_id,
            monitor_id: alert.monitor_id,
            url: alert.url,
            tries: Alert::DEFAULT_TRIES,
            max_tries: Alert::DEFAULT_MAX_TRIES,
            created_at: alert.created_at,
        };
        state.alerts.push(written.clone());
        Ok(written)
    }

    async fn mark_alert_sent(&self, monitor_id: &str, now: DateTime<Utc>) -> StorageResult<()> {
        let mut state = self.state.lock().await;
        if let Some(m) = state.monitors.get_mut(monitor_id) {
            m.last_alert_sent_at = Some(now);
        }
        Ok(())
    }

    async fn list_monitor_agents(&self) -> StorageResult<Vec<MonitorAgent>> {
        Ok(self.state.lock().await.agents.clone())
    }

    async fn events_since(&self, monitor_id: &str, since: DateTime<Utc>) -> StorageResult<Vec<UptimeEvent>> {
        let state = self.state.lock().await;
        let mut events: Vec<UptimeEvent> = state
            .events
            .iter()
            .filter(|e| e.monitor_id == monitor_id && e.timestamp >= since)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }

    async fn paged_events(&self, monitor_id: &str, page: i64) -> StorageResult<Vec<UptimeEvent>> {
        let state = self.state.lock().await;
        let mut events: Vec<UptimeEvent> = state.events.iter().filter(|e| e.monitor_id == monitor_id).cloned().collect();
        events.sort_by_key(|e| std::cmp::Reverse(e.timestamp));
        let start = (page * EVENT_HISTORY_PAGE_SIZE) as usize;
        Ok(events.into_iter().skip(start).take(EVENT_HISTORY_PAGE_SIZE as usize).collect())
    }

    async fn monitors_for_user(&self, user_id: &str) -> StorageResult<Vec<Monitor>> {
        Ok(self
            .state
            .lock()
            .await
            .monitors
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn latest_adverse_event(&self, user_id: Option<&str>) -> StorageResult<Option<UptimeEvent>> {
        let state = self.state.lock().await;
        Ok(state
            .events
            .iter()
            .filter(|e| match user_id {
                Some(uid) => e.user_id == uid,
                None => true,
            })
            .filter(|e| {
                e.availability == crate::model::Availability::Down
                    || e.ping == crate::model::PingStatus::Unreachable
                    || e.port == crate::model::PortStatus::Closed
            })
            .max_by_key(|e| e.timestamp)
            .cloned())
    }

    async fn clear_scheduler_leases(&self) -> StorageResult<()> {
        Ok(())
    }
}

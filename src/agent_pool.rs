//! Agent Pool (C1): round-robin selection and failover across dispatchable
//! monitor-agent endpoints.
//!
//! The rotation index is process-wide shared mutable state, advancing on
//! every call to [`AgentPool::next`]; successive calls from any worker
//! interleave fairly. This is implemented with a plain [`AtomicUsize`],
//! following the spec's explicit prescription in the design notes rather
//! than a mutex — there is no critical section beyond the increment itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::error::PipelineError;
use crate::model::{AgentType, MonitorAgent};
use crate::store::EventStore;

/// A thread-safe, atomically-rotating pool of agent URLs.
#[derive(Debug)]
pub struct AgentPool {
    agents: RwLock<Vec<MonitorAgent>>,
    cursor: AtomicUsize,
}

impl AgentPool {
    pub fn new(agents: Vec<MonitorAgent>) -> Self {
        Self {
            agents: RwLock::new(agents),
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Returns the next agent in round-robin order. Fails with
    /// [`PipelineError::NoAgents`] if the pool is empty.
    #[instrument(skip(self))]
    pub async fn next(&self) -> Result<MonitorAgent, PipelineError> {
        let agents = self.agents.read().await;
        if agents.is_empty() {
            return Err(PipelineError::NoAgents);
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % agents.len();
        Ok(agents[idx].clone())
    }

    /// Returns any agent whose URL is not `except`. "Any" is the first
    /// non-matching entry in stable order; callers do not depend on which.
    /// Returns `None` if no such agent exists (pool empty, or the only
    /// agent registered is `except`).
    #[instrument(skip(self))]
    pub async fn other(&self, except: &str) -> Option<MonitorAgent> {
        let agents = self.agents.read().await;
        agents.iter().find(|a| a.url != except).cloned()
    }

    /// Replaces the pool contents wholesale. Used by the refresh task and by
    /// tests; does not reset the rotation cursor, so in-flight rotation
    /// fairness is preserved across a refresh.
    pub async fn set_agents(&self, agents: Vec<MonitorAgent>) {
        let mut guard = self.agents.write().await;
        *guard = agents;
    }

    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.agents.read().await.is_empty()
    }
}

/// Background refresh of the pool from the `MonitorAgent` store, on an
/// interval independent of the bucket tickers. Mirrors the teacher's pattern
/// of a small standalone `tokio::time::interval` loop per concern
/// (`actors/service_monitor.rs`).
pub struct AgentPoolRefresher {
    pool: Arc<AgentPool>,
    store: Arc<dyn EventStore>,
    interval: std::time::Duration,
}

impl AgentPoolRefresher {
    pub fn new(pool: Arc<AgentPool>, store: Arc<dyn EventStore>, interval: std::time::Duration) -> Self {
        Self {
            pool,
            store,
            interval,
        }
    }

    /// Performs one refresh immediately; useful at startup so the pool is
    /// never empty on a cold start if agents are registered, and in tests.
    pub async fn refresh_once(&self) -> Result<(), PipelineError> {
        let all = self
            .store
            .list_monitor_agents()
            .await
            .map_err(PipelineError::from)?;
        let monitor_agents: Vec<MonitorAgent> = all
            .into_iter()
            .filter(|a| a.agent_type == AgentType::MonitorAgents)
            .collect();
        debug!(count = monitor_agents.len(), "refreshed agent pool");
        self.pool.set_agents(monitor_agents).await;
        Ok(())
    }

    /// Runs forever, refreshing on each tick. Intended to be spawned as a
    /// background task by C9.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.tick().await; // first tick fires immediately; startup already did an eager refresh
        loop {
            ticker.tick().await;
            if let Err(err) = self.refresh_once().await {
                warn!(%err, "agent pool refresh failed, keeping previous pool contents");
            }
        }
    }
}

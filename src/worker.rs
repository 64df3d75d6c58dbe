//! Monitor Worker (C5): the per-monitor algorithm executed once per tick —
//! select agent, probe, verify on failure, detect transition, persist,
//! throttle-alert, and bump `updatedAt`.
//!
//! Runs at most once concurrently per monitor; callers (the Bucket
//! Scheduler) are responsible for enforcing that via the due-set predicate.
//! Nothing here is fatal: every fallible step aborts only this monitor for
//! this tick and is logged, per the design's failure semantics.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{instrument, warn};

use crate::agent_pool::AgentPool;
use crate::detector;
use crate::model::{Monitor, UptimeEvent};
use crate::probe::{self, ProbeResult, ProbeResultFields, ProbeTarget};
use crate::store::{EventStore, NewAlert, NewUptimeEvent};
use crate::throttle;

/// What happened to a single monitor on a single tick, for observability and
/// for tests that want to assert on outcomes without reaching into storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// Both agents failed, or the pool was empty; nothing was written.
    Skipped(SkipReason),
    /// A probe completed; an event may or may not have been appended.
    Completed { appended_event: bool, alerted: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoAgents,
    BothAgentsFailed,
    PriorEventReadFailed,
    /// The monitor was paused. The scheduler's due-set query already filters
    /// these out; this is `run_once` restating the invariant defensively.
    Paused,
}

pub struct WorkerDeps<'a> {
    pub pool: &'a AgentPool,
    pub store: &'a dyn EventStore,
    pub client: &'a reqwest::Client,
    pub token: &'a str,
}

/// Runs the full C5 algorithm for one monitor, once.
#[instrument(skip(deps, monitor), fields(monitor_id = %monitor.id))]
pub async fn run_once(monitor: &Monitor, now: DateTime<Utc>, deps: &WorkerDeps<'_>) -> WorkerOutcome {
    if monitor.is_paused {
        // The scheduler should never hand us a paused monitor, but the
        // invariant is cheap to restate here.
        return WorkerOutcome::Skipped(SkipReason::Paused);
    }

    // Step 1: load the monitor's latest prior event.
    let last_event = match deps.store.latest_event(&monitor.id).await {
        Ok(event) => event,
        Err(err) => {
            warn!(%err, "latest-event read failed, skipping monitor this tick");
            return WorkerOutcome::Skipped(SkipReason::PriorEventReadFailed);
        }
    };

    // Step 2: pick a primary agent.
    let primary = match deps.pool.next().await {
        Ok(agent) => agent,
        Err(_) => {
            warn!("agent pool empty, skipping monitor this tick");
            return WorkerOutcome::Skipped(SkipReason::NoAgents);
        }
    };

    let target = ProbeTarget {
        url: &monitor.url,
        port: monitor.port,
        kind: monitor.kind,
    };

    // Steps 3-4: probe primary, falling back to one alternate on error.
    let (mut result, mut confirmed_by_agent) =
        match probe::probe(deps.client, &primary.url, target, deps.token).await {
            Ok(result) => (result, primary.url.clone()),
            Err(primary_err) => {
                warn!(%primary_err, agent = %primary.url, "primary probe failed, trying alternate");
                let Some(alt) = deps.pool.other(&primary.url).await else {
                    warn!("no alternate agent available, skipping monitor this tick");
                    return WorkerOutcome::Skipped(SkipReason::NoAgents);
                };
                match probe::probe(deps.client, &alt.url, target, deps.token).await {
                    Ok(result) => (result, alt.url.clone()),
                    Err(alt_err) => {
                        warn!(%alt_err, agent = %alt.url, "alternate probe also failed, skipping monitor this tick");
                        return WorkerOutcome::Skipped(SkipReason::BothAgentsFailed);
                    }
                }
            }
        };

    // Step 6: failure verification. Only the `availability` field is ever
    // overwritten by the verifier, per the design notes — preserved as-is
    // even though it looks asymmetric for ping/port monitors.
    if result.is_adverse(monitor.kind) {
        if let Some(verifier) = deps.pool.other(&confirmed_by_agent).await {
            match probe::probe(deps.client, &verifier.url, target, deps.token).await {
                Ok(verified) => {
                    result.fields.availability = verified.fields.availability;
                    confirmed_by_agent = verifier.url.clone();
                }
                Err(verifier_err) => {
                    warn!(%verifier_err, agent = %verifier.url, "verification probe failed, candidate stands");
                }
            }
        }
    }

    let appended_event = persist_transition(monitor, &last_event, &result, &confirmed_by_agent, now, deps).await;

    let alerted = if result.is_adverse(monitor.kind) {
        maybe_alert(monitor, now, deps).await
    } else {
        false
    };

    // Step 9: bump updatedAt unconditionally, now that we have a candidate.
    if let Err(err) = deps.store.touch_monitor(&monitor.id, now).await {
        warn!(%err, "failed to bump monitor updatedAt");
    }

    WorkerOutcome::Completed { appended_event, alerted }
}

async fn persist_transition(
    monitor: &Monitor,
    last_event: &Option<UptimeEvent>,
    result: &ProbeResult,
    confirmed_by_agent: &str,
    now: DateTime<Utc>,
    deps: &WorkerDeps<'_>,
) -> bool {
    let last_fields = last_event.as_ref().map(|e| ProbeResultFields {
        availability: e.availability,
        ping: e.ping,
        port: e.port,
    });

    if !detector::should_append(monitor.kind, result.fields, last_fields) {
        return false;
    }

    let new_event = NewUptimeEvent {
        monitor_id: monitor.id.clone(),
        user_id: monitor.user_id.clone(),
        timestamp: now,
        kind: monitor.kind,
        fields: result.fields,
        response_time_ms: result.response_time_ms,
        confirmed_by_agent: confirmed_by_agent.to_string(),
        reason: result.reason.clone(),
    };

    let close_prior = last_event.as_ref().map(|e| e.id);
    match deps.store.append_event(new_event, close_prior).await {
        Ok(_) => true,
        Err(err) => {
            warn!(%err, "event append failed; updatedAt will still be bumped");
            false
        }
    }
}

async fn maybe_alert(monitor: &Monitor, now: DateTime<Utc>, deps: &WorkerDeps<'_>) -> bool {
    if monitor.user_id.is_empty() {
        return false;
    }

    if !throttle::should_alert(monitor.last_alert_sent_at, monitor.alert_frequency, now) {
        return false;
    }

    // These two writes need not be transactional; the monitor update must
    // happen even if the alert insert races, per the design.
    let insert_result = deps
        .store
        .insert_alert(NewAlert {
            user_id: monitor.user_id.clone(),
            monitor_id: monitor.id.clone(),
            url: monitor.url.clone(),
            created_at: now,
        })
        .await;
    if let Err(err) = &insert_result {
        warn!(%err, "alert insert failed");
    }

    if let Err(err) = deps.store.mark_alert_sent(&monitor.id, now).await {
        warn!(%err, "failed to record lastAlertSentAt");
    }

    insert_result.is_ok()
}

/// Wraps [`run_once`] with the `B + 2s` cancellation bound from the
/// concurrency model. On timeout, whatever the in-flight future had not yet
/// committed is simply dropped — no partial event, alert, or `updatedAt`
/// mutation is visible, because all of those happen only after every
/// fallible step has already resolved.
pub async fn run_with_deadline(
    monitor: Arc<Monitor>,
    now: DateTime<Utc>,
    pool: Arc<AgentPool>,
    store: Arc<dyn EventStore>,
    client: reqwest::Client,
    token: String,
    bucket_minutes: u32,
) -> Option<WorkerOutcome> {
    let deadline = std::time::Duration::from_secs(bucket_minutes as u64 * 60 + 2);
    let deps = WorkerDeps {
        pool: &pool,
        store: store.as_ref(),
        client: &client,
        token: &token,
    };
    match tokio::time::timeout(deadline, run_once(&monitor, now, &deps)).await {
        Ok(outcome) => Some(outcome),
        Err(_) => {
            warn!(monitor_id = %monitor.id, "monitor worker exceeded deadline, cancelled");
            None
        }
    }
}

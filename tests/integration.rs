//! End-to-end scenario tests wiring the Monitor Worker and Bucket Scheduler
//! against a real SQLite store and mocked agents.

use chrono::Utc;
use probewatch::agent_pool::AgentPool;
use probewatch::model::{AgentType, AlertFrequency, Frequency, Monitor, MonitorAgent, MonitorKind};
use probewatch::store::sqlite::SqliteEventStore;
use probewatch::store::EventStore;
use probewatch::worker::{self, SkipReason, WorkerDeps, WorkerOutcome};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn monitor(id: &str, kind: MonitorKind, is_paused: bool) -> Monitor {
    let now = Utc::now();
    Monitor {
        id: id.to_string(),
        user_id: "user-1".to_string(),
        kind,
        url: "http://target.example".to_string(),
        port: 443,
        frequency: Frequency::OneMinute,
        alert_frequency: AlertFrequency::OneMinute,
        is_paused,
        last_alert_sent_at: None,
        updated_at: now,
        created_at: now,
        name: None,
        contacts: vec![],
    }
}

/// Opens a second connection straight to the same on-disk database the
/// `EventStore` under test is using, purely to seed a `monitors` row — that
/// table is owned by the REST collaborator in production, not by this
/// pipeline, so `EventStore` deliberately has no monitor-insert method.
async fn seed_monitor_row(db_path: &str, m: &Monitor) {
    let pool = sqlx::SqlitePool::connect(db_path).await.unwrap();
    sqlx::query(
        "INSERT INTO monitors (id, user_id, kind, url, port, frequency, alert_frequency, is_paused, updated_at, created_at, contacts)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, '[]')",
    )
    .bind(&m.id)
    .bind(&m.user_id)
    .bind(m.kind.as_str())
    .bind(&m.url)
    .bind(m.port as i64)
    .bind(m.frequency.minutes() as i64)
    .bind(m.alert_frequency.minutes() as i64)
    .bind(m.is_paused as i64)
    .bind(m.updated_at.to_rfc3339())
    .bind(m.created_at.to_rfc3339())
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;
}

/// S6: a paused monitor is never processed, even when handed directly to
/// the worker (the scheduler's own `due_monitors` query already filters on
/// `is_paused = 0`; this is the worker's own belt-and-braces check).
#[tokio::test]
async fn s6_paused_monitor_produces_no_output() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/probe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "availability": "Up" })))
        .mount(&server)
        .await;

    let agent_pool = AgentPool::new(vec![MonitorAgent {
        id: "a1".to_string(),
        agent_type: AgentType::MonitorAgents,
        region: "test".to_string(),
        url: format!("{}/probe", server.uri()),
    }]);
    let store = SqliteEventStore::connect_in_memory().await.unwrap();
    let client = reqwest::Client::new();
    let deps = WorkerDeps {
        pool: &agent_pool,
        store: &store,
        client: &client,
        token: "secret",
    };

    let paused = monitor("paused-1", MonitorKind::Web, true);
    let outcome = worker::run_once(&paused, Utc::now(), &deps).await;

    assert_eq!(outcome, WorkerOutcome::Skipped(SkipReason::Paused));
    assert!(store.latest_event("paused-1").await.unwrap().is_none());
    assert_eq!(server.received_requests().await.unwrap().len(), 0);
}

/// End-to-end: a monitor's first tick, against a real on-disk SQLite store,
/// appends an event and bumps `updated_at`.
#[tokio::test]
async fn first_tick_against_sqlite_store_appends_event_and_touches_monitor() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/probe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "availability": "Down",
            "data": { "status": "timeout" }
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("probewatch-test.db");
    let db_url = db_path.display().to_string();

    let store = SqliteEventStore::connect(&db_url).await.unwrap();

    let m = monitor("m1", MonitorKind::Web, false);
    seed_monitor_row(&db_url, &m).await;

    let agent_pool = AgentPool::new(vec![MonitorAgent {
        id: "a1".to_string(),
        agent_type: AgentType::MonitorAgents,
        region: "test".to_string(),
        url: format!("{}/probe", server.uri()),
    }]);
    let client = reqwest::Client::new();
    let deps = WorkerDeps {
        pool: &agent_pool,
        store: &store,
        client: &client,
        token: "secret",
    };

    let now = Utc::now();
    let outcome = worker::run_once(&m, now, &deps).await;
    assert_eq!(outcome, WorkerOutcome::Completed { appended_event: true, alerted: false });

    let latest = store.latest_event("m1").await.unwrap().unwrap();
    assert_eq!(latest.availability, probewatch::model::Availability::Down);

    let reloaded = store.get_monitor("m1").await.unwrap().unwrap();
    assert!(reloaded.updated_at >= now);

    store.close().await;
}

/// S5: across many calls to `AgentPool::next`, dispatch across a small
/// fleet of agents is exactly even.
#[tokio::test]
async fn round_robin_fanout_is_fair_across_a_realistic_fleet() {
    let agents: Vec<MonitorAgent> = (0..4)
        .map(|i| MonitorAgent {
            id: format!("a{i}"),
            agent_type: AgentType::MonitorAgents,
            region: "test".to_string(),
            url: format!("http://agent-{i}.example"),
        })
        .collect();
    let pool = AgentPool::new(agents);

    let mut counts = std::collections::HashMap::new();
    for _ in 0..40 {
        let agent = pool.next().await.unwrap();
        *counts.entry(agent.url).or_insert(0) += 1;
    }

    assert_eq!(counts.len(), 4);
    for count in counts.values() {
        assert_eq!(*count, 10);
    }
}

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use probewatch::agent_pool::{AgentPool, AgentPoolRefresher};
use probewatch::config::read_config_file;
use probewatch::scheduler::{self, BucketTicker};
use probewatch::store::EventStore;
use probewatch::store::sqlite::SqliteEventStore;
use probewatch::model::Frequency;
use probewatch::probe;
use tokio::task::JoinSet;
use tracing::{error, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("probewatch", LevelFilter::TRACE),
        ("probewatch_hub", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(std::io::stderr)
                .compact(),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = read_config_file(&args.file)?;
    let resolved = config.resolve()?;
    info!("resolved configuration: {resolved:#?}");

    run_pipeline(resolved).await
}

async fn run_pipeline(resolved: probewatch::config::ResolvedConfig) -> anyhow::Result<()> {
    let store: Arc<dyn EventStore> = Arc::new(SqliteEventStore::connect(&resolved.database_path).await?);

    scheduler::wipe_stale_leases(store.as_ref()).await?;
    info!("scheduler leases cleared");

    let pool = Arc::new(AgentPool::new(resolved.seed_agents.clone()));
    let refresher = AgentPoolRefresher::new(
        pool.clone(),
        store.clone(),
        Duration::from_secs(resolved.agent_refresh_interval_secs),
    );
    if let Err(err) = refresher.refresh_once().await {
        warn!(%err, "initial agent pool refresh failed, starting with seed agents only");
    }
    tokio::spawn(refresher.run());
    info!(agents = pool.len().await, "agent pool ready");

    let client = probe::build_probe_client();

    let (shutdown_tx, shutdown_rx) = scheduler::shutdown_channel();
    let mut tickers = JoinSet::new();
    for frequency in Frequency::all() {
        let ticker = BucketTicker::new(frequency, pool.clone(), store.clone(), client.clone(), resolved.bearer_token.clone());
        let rx = shutdown_rx.clone();
        tickers.spawn(ticker.run(rx));
    }
    info!("all bucket tickers started");

    #[cfg(feature = "api")]
    if let Some(api_config) = resolved.api {
        use probewatch::api::{ApiConfig, ApiState, spawn_api_server};
        use std::net::SocketAddr;

        let bind_addr: SocketAddr = format!("{}:{}", api_config.bind, api_config.port)
            .parse()
            .expect("invalid API bind address");

        let api_state = ApiState::new(store.clone());
        let api_config = ApiConfig {
            bind_addr,
            auth_token: api_config.auth_token,
            enable_cors: api_config.enable_cors,
        };

        match spawn_api_server(api_config, api_state).await {
            Ok(addr) => info!("API server started on http://{}", addr),
            Err(err) => error!(%err, "failed to start API server"),
        }
    } else {
        info!("API server disabled (not configured)");
    }

    #[cfg(not(feature = "api"))]
    info!("API server disabled (feature not enabled)");

    info!("press Ctrl+C to shutdown gracefully");
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received shutdown signal, stopping bucket tickers..."),
        Err(err) => error!(%err, "unable to listen for shutdown signal"),
    }

    let _ = shutdown_tx.send(true);
    while tickers.join_next().await.is_some() {}
    info!("all bucket tickers stopped, exiting");

    Ok(())
}

//! Process & Config Host (C9) configuration: a two-phase `Config` →
//! `ResolvedConfig` layer, following the teacher's merge-with-defaults
//! pattern but without a server/service registry (this pipeline consumes
//! monitors from the store, not from static config).

use tracing::trace;

use crate::model::MonitorAgent;

/// Top-level JSON configuration file shape.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Shared bearer token sent to monitor agents and, if `api.auth_token`
    /// is not set, required of API callers too.
    pub bearer_token: String,

    /// How often the agent pool is rebuilt from the `monitor_agents` table.
    #[serde(default = "default_agent_refresh_interval_secs")]
    pub agent_refresh_interval_secs: u64,

    /// Agents to seed the pool with before the first refresh completes.
    /// Optional; a cold start with no seed and no agents registered yet
    /// simply runs with an empty pool until the first refresh.
    #[serde(default)]
    pub seed_agents: Vec<MonitorAgent>,

    /// Enables the disabled-by-default atomic-lease scheduler mode (§4.6a).
    #[serde(default)]
    pub atomic_lease: bool,

    /// API server configuration (API disabled if not specified).
    #[cfg(feature = "api")]
    pub api: Option<ApiConfig>,
}

#[cfg(feature = "api")]
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_bind")]
    pub bind: String,

    #[serde(default = "default_api_port")]
    pub port: u16,

    /// Bearer token API callers must present. Defaults to the top-level
    /// `bearer_token` when absent.
    pub auth_token: Option<String>,

    #[serde(default = "default_api_cors")]
    pub enable_cors: bool,
}

fn default_database_path() -> String {
    "./probewatch.db".to_string()
}

fn default_agent_refresh_interval_secs() -> u64 {
    600
}

#[cfg(feature = "api")]
fn default_api_bind() -> String {
    "127.0.0.1".to_string()
}

#[cfg(feature = "api")]
fn default_api_port() -> u16 {
    8080
}

#[cfg(feature = "api")]
fn default_api_cors() -> bool {
    true
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid configuration file provided!"))
        .inspect(|config: &Config| trace!("loaded config: {config:?}"))
}

/// Resolved configuration, with every default applied. Kept as a distinct
/// type from `Config` so callers never see an `Option` where a default
/// should already have filled it in.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub database_path: String,
    pub bearer_token: String,
    pub agent_refresh_interval_secs: u64,
    pub seed_agents: Vec<MonitorAgent>,
    pub atomic_lease: bool,
    #[cfg(feature = "api")]
    pub api: Option<ResolvedApiConfig>,
}

#[cfg(feature = "api")]
#[derive(Debug, Clone)]
pub struct ResolvedApiConfig {
    pub bind: String,
    pub port: u16,
    pub auth_token: Option<String>,
    pub enable_cors: bool,
}

impl Config {
    pub fn resolve(self) -> anyhow::Result<ResolvedConfig> {
        if self.bearer_token.trim().is_empty() {
            return Err(anyhow::anyhow!("bearer_token must not be empty"));
        }

        #[cfg(feature = "api")]
        let api = self.api.map(|api| ResolvedApiConfig {
            bind: api.bind,
            port: api.port,
            auth_token: api.auth_token.or_else(|| Some(self.bearer_token.clone())),
            enable_cors: api.enable_cors,
        });

        Ok(ResolvedConfig {
            database_path: self.database_path,
            bearer_token: self.bearer_token,
            agent_refresh_interval_secs: self.agent_refresh_interval_secs,
            seed_agents: self.seed_agents,
            atomic_lease: self.atomic_lease,
            #[cfg(feature = "api")]
            api,
        })
    }
}

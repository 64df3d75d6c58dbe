use serde::{Deserialize, Serialize};

/// Only `MonitorAgents` is read by the Agent Pool / Monitor Worker; entries
/// of type `AlertAgents` exist in the same collection but are out of scope
/// for this pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AgentType {
    MonitorAgents,
    AlertAgents,
}

/// An agent registration: a dispatchable monitor-agent endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorAgent {
    pub id: String,
    #[serde(rename = "type")]
    pub agent_type: AgentType,
    pub region: String,
    pub url: String,
}

//! Crate-wide error taxonomy for the probing/alerting pipeline.
//!
//! Mirrors the taxonomy in the design: `AgentTransport` and `NoAgents` are
//! recoverable at the monitor level and never escape a single worker.
//! `PersistenceWrite`/`PersistenceRead` are logged and handled per the rules
//! in each call site. `Fatal` aborts the process at startup only.

use std::fmt;

/// Errors surfaced by the pipeline above the level of a single monitor.
#[derive(Debug)]
pub enum PipelineError {
    /// Network failure, non-2xx, timeout, or malformed JSON talking to an
    /// agent.
    AgentTransport(String),

    /// The agent pool had no entries when one was requested.
    NoAgents,

    /// An event or alert insert/update failed.
    PersistenceWrite(String),

    /// The latest-event read for a monitor failed. Callers must NOT fail
    /// open to "no prior event" — that would fabricate a spurious first
    /// transition every tick.
    PersistenceRead(String),

    /// Database connection lost at startup. Process must abort.
    Fatal(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::AgentTransport(msg) => write!(f, "agent transport error: {msg}"),
            PipelineError::NoAgents => write!(f, "agent pool is empty"),
            PipelineError::PersistenceWrite(msg) => write!(f, "persistence write failed: {msg}"),
            PipelineError::PersistenceRead(msg) => write!(f, "persistence read failed: {msg}"),
            PipelineError::Fatal(msg) => write!(f, "fatal error: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl From<crate::store::StorageError> for PipelineError {
    fn from(err: crate::store::StorageError) -> Self {
        PipelineError::PersistenceWrite(err.to_string())
    }
}

impl From<crate::probe::ProbeError> for PipelineError {
    fn from(err: crate::probe::ProbeError) -> Self {
        PipelineError::AgentTransport(err.to_string())
    }
}

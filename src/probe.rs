//! Probe Client (C2): one outbound HTTP call to an agent with a bounded
//! timeout, returning a normalized probe result.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::model::{Availability, MonitorKind, PingStatus, PortStatus};

/// Hard per-call timeout. No retries happen at this layer; the caller (the
/// Monitor Worker) implements at most one retry via an alternate agent.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct ProbeRequest<'a> {
    url: &'a str,
    port: u16,
    #[serde(rename = "type")]
    kind: MonitorKind,
    token: &'a str,
}

#[derive(Debug, Deserialize, Default)]
struct ProbeResponseBody {
    availability: Option<String>,
    ping: Option<String>,
    port: Option<String>,
    data: Option<ProbeResponseData>,
}

#[derive(Debug, Deserialize, Default)]
struct ProbeResponseData {
    status: Option<String>,
    output: Option<String>,
}

/// A normalized probe result. Absent fields in the agent response default to
/// the adverse variant, per the design's "adverse-default when agent omits
/// fields" note — this is load-bearing for `web` monitors, whose agents
/// never populate `ping`/`port`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResultFields {
    pub availability: Availability,
    pub ping: PingStatus,
    pub port: PortStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub fields: ProbeResultFields,
    pub reason: Option<String>,
    pub response_time_ms: i64,
}

impl ProbeResult {
    pub fn is_adverse(&self, kind: MonitorKind) -> bool {
        match kind {
            MonitorKind::Web => self.fields.availability == Availability::Down,
            MonitorKind::Ping => self.fields.ping == PingStatus::Unreachable,
            MonitorKind::Port => self.fields.port == PortStatus::Closed,
        }
    }
}

/// Network failure, non-2xx, timeout, or malformed JSON — collapsed to a
/// single error kind per the design.
#[derive(Debug, Clone)]
pub struct ProbeError {
    message: String,
}

impl ProbeError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "probe failed: {}", self.message)
    }
}

impl std::error::Error for ProbeError {}

/// What to probe: carried straight from the `Monitor` row the worker is
/// currently servicing.
#[derive(Debug, Clone, Copy)]
pub struct ProbeTarget<'a> {
    pub url: &'a str,
    pub port: u16,
    pub kind: MonitorKind,
}

/// Makes one outbound HTTP call to `agent_url` and returns a normalized
/// result, or a single collapsed `ProbeError`.
#[instrument(skip(client, token), fields(agent = agent_url))]
pub async fn probe(
    client: &reqwest::Client,
    agent_url: &str,
    target: ProbeTarget<'_>,
    token: &str,
) -> Result<ProbeResult, ProbeError> {
    let body = ProbeRequest {
        url: target.url,
        port: target.port,
        kind: target.kind,
        token,
    };

    let started = Instant::now();
    let response = client
        .post(agent_url)
        .bearer_auth(token)
        .timeout(PROBE_TIMEOUT)
        .json(&body)
        .send()
        .await
        .map_err(|err| ProbeError::new(describe_reqwest_error(&err)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ProbeError::new(format!("agent responded with status {status}")));
    }

    let parsed: ProbeResponseBody = response
        .json()
        .await
        .map_err(|err| ProbeError::new(format!("malformed JSON response: {err}")))?;

    let response_time_ms = started.elapsed().as_millis() as i64;

    let availability = Availability::normalize(parsed.availability.as_deref());
    let ping = PingStatus::normalize(parsed.ping.as_deref());
    let port = PortStatus::normalize(parsed.port.as_deref());

    let reason = parsed.data.and_then(|data| match target.kind {
        MonitorKind::Web => data.status,
        MonitorKind::Ping | MonitorKind::Port => data.output,
    });

    Ok(ProbeResult {
        fields: ProbeResultFields {
            availability,
            ping,
            port,
        },
        reason,
        response_time_ms,
    })
}

fn describe_reqwest_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_connect() {
        "connection failed".to_string()
    } else {
        format!("request failed: {error}")
    }
}

/// Builds the shared `reqwest::Client` used for all probe dispatch. Built
/// once per process and reused, following the teacher's client-construction
/// idiom of baking the timeout in at build time as a backstop in addition to
/// the per-request timeout override above.
pub fn build_probe_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(PROBE_TIMEOUT)
        .build()
        .unwrap_or_else(|err| {
            warn!(%err, "failed to build tuned reqwest client, falling back to default");
            reqwest::Client::new()
        })
}

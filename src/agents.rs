use crate::dependencies::{Environment, HttpGet};
use crate::error::{ApplicationError, Result};
use anyhow::anyhow;
use serde::Deserialize;
use std::time::Duration;

// Base URL of the agent directory, overridable with $AGENTBEATS_API_URL
pub const DEFAULT_API_URL: &str = "https://agentbeats.dev/api/agents";

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Deserialize)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub struct AgentInfo {
    #[serde(default)]
    pub name: Option<String>,
    pub agent_url: String,
}

fn api_url(deps: &impl Environment) -> String {
    deps.read_var("AGENTBEATS_API_URL")
        .unwrap_or_else(|_| String::from(DEFAULT_API_URL))
}

// Fetch a remote agent's metadata from the agent directory
pub fn fetch_agent_info(deps: &(impl Environment + HttpGet), agent_id: &str) -> Result<AgentInfo> {
    let url = format!("{}/{agent_id}", api_url(deps));
    let body = deps
        .http_get(&url, FETCH_TIMEOUT)
        .map_err(|err| ApplicationError::FetchAgent(String::from(agent_id), err))?;
    serde_json::from_str(&body).map_err(|err| {
        ApplicationError::FetchAgent(
            String::from(agent_id),
            anyhow!("invalid JSON response: {err}"),
        )
    })
}

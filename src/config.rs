use crate::dependencies::ReadFile;
use crate::error::{ApplicationError, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

// Service and container name reserved for the green agent
pub const GREEN_AGENT_NAME: &str = "green-agent";

#[derive(Deserialize)]
#[cfg_attr(test, derive(Debug))]
pub struct Scenario {
    pub green_agent: GreenAgent,

    #[serde(default)]
    pub purple_agents: Vec<PurpleAgent>,
}

// The green agent always runs locally, so an image is required
#[derive(Deserialize)]
#[cfg_attr(test, derive(Debug))]
pub struct GreenAgent {
    pub image: String,
    pub platform: Option<String>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[cfg_attr(test, derive(Debug))]
pub struct PurpleAgent {
    pub name: String,
    pub image: Option<String>,
    pub agentbeats_id: Option<String>,
    pub platform: Option<String>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

// Where a participant runs: as a local container built from an image, or as a
// remote agent looked up in the agent directory
pub enum AgentSource<'a> {
    Image(&'a str),
    AgentbeatsId(&'a str),
}

impl PurpleAgent {
    pub fn source(&self) -> Result<AgentSource> {
        match (&self.image, &self.agentbeats_id) {
            (Some(image), None) => Ok(AgentSource::Image(image)),
            (None, Some(agentbeats_id)) => Ok(AgentSource::AgentbeatsId(agentbeats_id)),
            (Some(_), Some(_)) => Err(ApplicationError::ValidateScenario(format!(
                "participant \"{}\" must not set both image and agentbeats_id",
                self.name
            ))),
            (None, None) => Err(ApplicationError::ValidateScenario(format!(
                "participant \"{}\" must set either image or agentbeats_id",
                self.name
            ))),
        }
    }
}

impl Scenario {
    // Load the scenario from the file
    // Return None if the file doesn't exist
    pub fn load(deps: &impl ReadFile, path: &Path) -> Result<Option<Self>> {
        deps.read_file(path)?
            .map(|scenario_str| Self::from_toml(&scenario_str))
            .transpose()
    }

    // Return a new scenario from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let scenario: Scenario =
            toml::from_str(toml_str).map_err(ApplicationError::DeserializeScenario)?;
        scenario.validate()?;
        Ok(scenario)
    }

    fn validate(&self) -> Result<()> {
        let mut names: HashSet<&str> = HashSet::new();
        for agent in &self.purple_agents {
            validate_name(&agent.name)?;
            if agent.name == GREEN_AGENT_NAME {
                return Err(ApplicationError::ValidateScenario(format!(
                    "participant name \"{GREEN_AGENT_NAME}\" is reserved for the green agent"
                )));
            }
            if !names.insert(agent.name.as_str()) {
                return Err(ApplicationError::ValidateScenario(format!(
                    "duplicate participant name \"{}\"",
                    agent.name
                )));
            }
            let source = agent.source()?;
            if matches!(source, AgentSource::AgentbeatsId(_))
                && !(agent.env.is_empty() && agent.platform.is_none())
            {
                return Err(ApplicationError::ValidateScenario(format!(
                    "remote participant \"{}\" must not set env or platform",
                    agent.name
                )));
            }
        }
        Ok(())
    }
}

// Validate an agent name for use as a compose service name, container name,
// and network hostname
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ApplicationError::InvalidAgentName(
            String::from(name),
            "must not be empty",
        ));
    }
    if name.len() > 63 {
        return Err(ApplicationError::InvalidAgentName(
            String::from(name),
            "must not exceed 63 characters",
        ));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(ApplicationError::InvalidAgentName(
            String::from(name),
            "must not start or end with a dash",
        ));
    }
    if name.contains("--") {
        return Err(ApplicationError::InvalidAgentName(
            String::from(name),
            "must not contain consecutive dashes",
        ));
    }
    if name
        .chars()
        .any(|char| !(char.is_ascii_lowercase() || char.is_numeric() || char == '-'))
    {
        return Err(ApplicationError::InvalidAgentName(
            String::from(name),
            "must only contain lowercase alphanumeric characters and dashes",
        ));
    }
    Ok(())
}

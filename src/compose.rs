use crate::agents::fetch_agent_info;
use crate::config::{AgentSource, PurpleAgent, Scenario, GREEN_AGENT_NAME};
use crate::dependencies::{Environment, Exec, HttpGet};
use crate::error::{ApplicationError, Result};
use crate::ports::resolve_port;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub const COMPOSE_PATH: &str = "docker-compose.yml";
pub const RUNTIME_SCENARIO_PATH: &str = "a2a-scenario.toml";
pub const ENV_EXAMPLE_PATH: &str = ".env.example";

const DEFAULT_PLATFORM: &str = "linux/amd64";

// Merged under every service environment so agent output streams unbuffered
const DEFAULT_ENV_VARS: &[(&str, &str)] = &[("PYTHONUNBUFFERED", "1")];

// An agent that runs as a service in the generated compose file
#[cfg_attr(test, derive(Debug))]
pub struct Service {
    pub name: String,
    pub image: String,
    pub platform: String,
    pub port: u16,
    pub env: BTreeMap<String, String>,
}

impl Service {
    fn resolve(
        deps: &impl Exec,
        name: &str,
        image: &str,
        platform: Option<&str>,
        env: &BTreeMap<String, String>,
    ) -> Self {
        let mut merged_env: BTreeMap<String, String> = DEFAULT_ENV_VARS
            .iter()
            .map(|(key, value)| (String::from(*key), String::from(*value)))
            .collect();
        merged_env.extend(env.clone());
        Service {
            name: String::from(name),
            image: String::from(image),
            platform: String::from(platform.unwrap_or(DEFAULT_PLATFORM)),
            port: resolve_port(deps, image),
            env: merged_env,
        }
    }

    // Host-reachable endpoint, valid because the port is published 1:1
    fn url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }
}

#[cfg_attr(test, derive(Debug))]
pub enum Participant {
    Local(Service),
    Remote { name: String, url: String },
}

impl Participant {
    fn resolve(deps: &(impl Environment + Exec + HttpGet), agent: &PurpleAgent) -> Result<Self> {
        match agent.source()? {
            AgentSource::Image(image) => Ok(Participant::Local(Service::resolve(
                deps,
                &agent.name,
                image,
                agent.platform.as_deref(),
                &agent.env,
            ))),
            AgentSource::AgentbeatsId(agentbeats_id) => {
                let info = fetch_agent_info(deps, agentbeats_id)?;
                Ok(Participant::Remote {
                    name: agent.name.clone(),
                    url: info.agent_url,
                })
            }
        }
    }
}

#[cfg_attr(test, derive(Debug))]
pub struct ResolvedScenario {
    pub green: Service,
    pub participants: Vec<Participant>,
}

impl ResolvedScenario {
    // Resolve every agent in scenario order: local agents get their service
    // port from their image and remote agents get their endpoint from the
    // agent directory
    pub fn resolve(
        deps: &(impl Environment + Exec + HttpGet),
        scenario: &Scenario,
    ) -> Result<Self> {
        let green = Service::resolve(
            deps,
            GREEN_AGENT_NAME,
            &scenario.green_agent.image,
            scenario.green_agent.platform.as_deref(),
            &scenario.green_agent.env,
        );
        let participants = scenario
            .purple_agents
            .iter()
            .map(|agent| Participant::resolve(deps, agent))
            .collect::<Result<Vec<_>>>()?;
        Ok(ResolvedScenario {
            green,
            participants,
        })
    }

    // Iterate over the locally-run agents, green agent first
    fn services(&self) -> impl Iterator<Item = &Service> {
        std::iter::once(&self.green).chain(self.participants.iter().filter_map(
            |participant| match participant {
                Participant::Local(service) => Some(service),
                Participant::Remote { .. } => None,
            },
        ))
    }
}

fn service_block(service: &Service) -> String {
    let env = service
        .env
        .iter()
        .map(|(key, value)| format!("      - \"{key}={value}\""))
        .collect::<Vec<_>>()
        .join("\n");
    let port = service.port;
    format!(
        r#"  {name}:
    image: {image}
    platform: {platform}
    container_name: {name}
    environment:
{env}
    ports:
      - "{port}:{port}"
    healthcheck:
      test: ["CMD", "curl", "-f", "http://localhost:{port}/health"]
      interval: 5s
      timeout: 3s
      retries: 10
      start_period: 10s
"#,
        name = service.name,
        image = service.image,
        platform = service.platform,
    )
}

// Return the compose file as a string
pub fn generate_compose(scenario_path: &Path, resolved: &ResolvedScenario) -> String {
    let services = resolved
        .services()
        .map(service_block)
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "# Auto-generated from \"{}\"\n\nservices:\n{services}",
        scenario_path.display()
    )
}

#[derive(Serialize)]
struct Endpoint {
    name: String,
    url: String,
}

#[derive(Serialize)]
struct RuntimeScenario {
    green_agent: Endpoint,
    participants: Vec<Endpoint>,
}

// Return the runtime scenario consumed by the battle runner as a TOML string
pub fn generate_runtime_scenario(resolved: &ResolvedScenario) -> Result<String> {
    let runtime = RuntimeScenario {
        green_agent: Endpoint {
            name: resolved.green.name.clone(),
            url: resolved.green.url(),
        },
        participants: resolved
            .participants
            .iter()
            .map(|participant| match participant {
                Participant::Local(service) => Endpoint {
                    name: service.name.clone(),
                    url: service.url(),
                },
                Participant::Remote { name, url } => Endpoint {
                    name: name.clone(),
                    url: url.clone(),
                },
            })
            .collect(),
    };
    toml::to_string(&runtime).map_err(ApplicationError::SerializeScenario)
}

// Return the env example listing every ${VAR} placeholder that the generated
// service environments reference
pub fn generate_env_example(resolved: &ResolvedScenario) -> String {
    lazy_static! {
        static ref PLACEHOLDER_RE: Regex =
            Regex::new(r"\$\{(?P<var>[A-Za-z_][A-Za-z0-9_]*)\}").unwrap();
    }
    let vars = resolved
        .services()
        .flat_map(|service| service.env.values())
        .flat_map(|value| PLACEHOLDER_RE.captures_iter(value))
        .map(|capture| String::from(&capture["var"]))
        .collect::<BTreeSet<_>>();
    let lines = vars
        .iter()
        .map(|var| format!("{var}=\n"))
        .collect::<String>();
    format!(
        "# Environment variables referenced by {COMPOSE_PATH}\n# Copy this file to .env and fill in the values\n{lines}"
    )
}

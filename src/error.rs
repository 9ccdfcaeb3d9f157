use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = ApplicationError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Scenario file \"{}\" doesn't exist", .0.display())]
    MissingScenario(PathBuf),

    #[error("Couldn't deserialize scenario\nError: {0}")]
    DeserializeScenario(#[from] toml::de::Error),

    #[error("Invalid scenario: {0}")]
    ValidateScenario(String),

    #[error("Invalid agent name \"{0}\": {1}")]
    InvalidAgentName(String, &'static str),

    #[error("Failed to fetch agent \"{0}\"\nError: {1}")]
    FetchAgent(String, anyhow::Error),

    #[error("Couldn't serialize runtime scenario\nError: {0}")]
    SerializeScenario(#[from] toml::ser::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

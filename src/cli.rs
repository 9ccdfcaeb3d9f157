use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "composegen",
    version,
    about = "Generate Docker Compose configurations for agent battle scenarios"
)]
pub enum Cli {
    /// Generate docker-compose.yml, a2a-scenario.toml, and .env.example
    Generate {
        /// Path of the scenario definition
        #[arg(long, default_value = "scenario.toml")]
        scenario: PathBuf,
    },

    /// Print the generated compose file without writing any files
    Show {
        /// Path of the scenario definition
        #[arg(long, default_value = "scenario.toml")]
        scenario: PathBuf,
    },

    /// Detect the service port exposed by a container image
    Port {
        /// The image reference to inspect
        image: String,
    },
}

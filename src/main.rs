mod agents;
mod cli;
mod compose;
mod config;
mod dependencies;
mod error;
#[cfg(test)]
mod mocks;
mod ports;

use crate::cli::Cli;
use crate::compose::{
    generate_compose, generate_env_example, generate_runtime_scenario, ResolvedScenario,
    COMPOSE_PATH, ENV_EXAMPLE_PATH, RUNTIME_SCENARIO_PATH,
};
use crate::config::Scenario;
use crate::dependencies::{Args, Environment, Exec, HttpGet, ReadFile, WriteFile};
use crate::error::{ApplicationError, Result};
use crate::ports::resolve_port;
use clap::Parser;
use std::path::Path;
use std::process;

// Load the scenario, failing if the file doesn't exist
fn load_scenario(deps: &impl ReadFile, path: &Path) -> Result<Scenario> {
    Scenario::load(deps, path)?.ok_or_else(|| ApplicationError::MissingScenario(path.to_owned()))
}

fn run(deps: &(impl Args + Environment + Exec + HttpGet + ReadFile + WriteFile)) -> Result<()> {
    let cli = Cli::parse_from(deps.get_args());
    match cli {
        Cli::Generate { scenario } => {
            let resolved = ResolvedScenario::resolve(deps, &load_scenario(deps, &scenario)?)?;
            deps.write_file(
                Path::new(COMPOSE_PATH),
                &generate_compose(&scenario, &resolved),
            )?;
            deps.write_file(
                Path::new(RUNTIME_SCENARIO_PATH),
                &generate_runtime_scenario(&resolved)?,
            )?;
            deps.write_file(Path::new(ENV_EXAMPLE_PATH), &generate_env_example(&resolved))?;
            println!("Generated {COMPOSE_PATH}, {RUNTIME_SCENARIO_PATH}, and {ENV_EXAMPLE_PATH}");
        }

        Cli::Show { scenario } => {
            let resolved = ResolvedScenario::resolve(deps, &load_scenario(deps, &scenario)?)?;
            print!("{}", generate_compose(&scenario, &resolved));
        }

        Cli::Port { image } => {
            println!("{}", resolve_port(deps, &image));
        }
    }

    Ok(())
}

fn main() {
    let deps = entrait::Impl::new(());
    if let Err(err) = run(&deps) {
        eprintln!("{err}");
        process::exit(1);
    }
}

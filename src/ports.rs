use crate::dependencies::{Exec, ExecOutput};
use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use std::process::Command;
use std::time::Duration;

// Port assumed for a service whose image doesn't declare a usable TCP port
pub const DEFAULT_PORT: u16 = 9009;

const INSPECT_TIMEOUT: Duration = Duration::from_secs(30);
const PULL_TIMEOUT: Duration = Duration::from_secs(300);

// Outcome of port detection, collapsed to a plain port at the public boundary
#[cfg_attr(test, derive(Debug))]
enum Resolution {
    Detected(u16),
    Defaulted(String),
}

fn inspect_image(deps: &impl Exec, image: &str) -> Result<ExecOutput> {
    deps.exec(
        Command::new("docker")
            .args(["inspect", "--format={{json .Config.ExposedPorts}}"])
            .arg(image),
        INSPECT_TIMEOUT,
    )
}

fn pull_image(deps: &impl Exec, image: &str) -> Result<ExecOutput> {
    deps.exec(Command::new("docker").arg("pull").arg(image), PULL_TIMEOUT)
}

// Extract the integer prefix of an exposed-port spec like "9008/tcp",
// rejecting ports outside of [1, 65535]
fn parse_port_spec(spec: &str) -> Option<u16> {
    lazy_static! {
        static ref RE: Regex = Regex::new(r"^(?P<port>\d+)/").unwrap();
    }
    let port = RE.captures(spec)?.name("port")?.as_str().parse::<u16>().ok()?;
    (port > 0).then_some(port)
}

// Determine the TCP port that a service built from the image will listen on,
// pulling the image if it isn't available locally
fn detect(deps: &impl Exec, image: &str) -> Resolution {
    let inspected = match inspect_image(deps, image) {
        Ok(output) if output.success => output,
        Ok(_) => {
            // The image isn't available locally, so pull it and inspect again
            println!("Image {image} not found locally, pulling...");
            match pull_image(deps, image) {
                Ok(output) if output.success => (),
                Ok(output) => {
                    return Resolution::Defaulted(format!(
                        "failed to pull image {image} ({})",
                        output.failure_reason()
                    ))
                }
                Err(err) => {
                    return Resolution::Defaulted(format!("failed to pull image {image}: {err}"))
                }
            }
            match inspect_image(deps, image) {
                Ok(output) if output.success => output,
                Ok(output) => {
                    return Resolution::Defaulted(format!(
                        "could not inspect image {image} after pulling ({})",
                        output.failure_reason()
                    ))
                }
                Err(err) => {
                    return Resolution::Defaulted(format!(
                        "could not inspect image {image} after pulling: {err}"
                    ))
                }
            }
        }
        Err(err) => return Resolution::Defaulted(format!("could not inspect image {image}: {err}")),
    };

    // The inspect output is "null" for images without exposed ports, and the
    // decoder preserves key order so that the first TCP entry is well-defined
    let exposed_ports: Option<Map<String, Value>> =
        match serde_json::from_str(inspected.stdout.trim()) {
            Ok(exposed_ports) => exposed_ports,
            Err(_) => {
                return Resolution::Defaulted(format!(
                    "could not parse docker inspect output for {image}"
                ))
            }
        };
    let Some(exposed_ports) = exposed_ports.filter(|mapping| !mapping.is_empty()) else {
        return Resolution::Defaulted(format!("no exposed ports found for {image}"));
    };
    let Some(spec) = exposed_ports.keys().find(|spec| spec.contains("/tcp")) else {
        return Resolution::Defaulted(format!("no TCP port found for {image}"));
    };
    match parse_port_spec(spec) {
        Some(port) => Resolution::Detected(port),
        None => Resolution::Defaulted(format!("invalid port specification \"{spec}\" for {image}")),
    }
}

// Resolve the service port for an image, falling back to the default port
// instead of failing
pub fn resolve_port(deps: &impl Exec, image: &str) -> u16 {
    match detect(deps, image) {
        Resolution::Detected(port) => {
            println!("Detected port {port} for image {image}");
            port
        }
        Resolution::Defaulted(reason) => {
            println!("Warning: {reason}, using default port {DEFAULT_PORT}");
            DEFAULT_PORT
        }
    }
}

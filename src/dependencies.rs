use anyhow::{bail, Context, Result};
use entrait::entrait;
use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

#[entrait(pub Args, mock_api=ArgsMock)]
fn get_args(_deps: &impl std::any::Any) -> Vec<String> {
    std::env::args().collect()
}

#[entrait(pub Environment, mock_api=EnvironmentMock)]
pub fn read_var(_deps: &impl std::any::Any, var: &str) -> Result<String> {
    let var_name = OsString::from(var);
    std::env::var(var_name).with_context(|| format!("Failed to read ${var} environment variable"))
}

// Output of a command that ran to completion, normalized for consumers that
// only care about the exit status and the captured streams
#[derive(Clone, Debug)]
pub struct ExecOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    // Short description of a failed command for diagnostics
    pub fn failure_reason(&self) -> String {
        let code = match self.code {
            Some(code) => code.to_string(),
            None => String::from("unknown"),
        };
        match self.stderr.trim().lines().next() {
            Some(stderr) => format!("exit code {code}: {stderr}"),
            None => format!("exit code {code}"),
        }
    }
}

const EXEC_POLL_INTERVAL: Duration = Duration::from_millis(100);

// Run a command to completion, killing it if it outlives the timeout
#[entrait(pub Exec, mock_api=ExecMock)]
fn exec(_deps: &impl std::any::Any, command: &mut Command, timeout: Duration) -> Result<ExecOutput> {
    let mut child = command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to run command \"{command:?}\""))?;
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(_)) => break,
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    bail!(
                        "Command \"{command:?}\" timed out after {} seconds",
                        timeout.as_secs()
                    );
                }
                std::thread::sleep(EXEC_POLL_INTERVAL);
            }
            Err(io_err) => {
                return Err(io_err)
                    .with_context(|| format!("Failed to wait for command \"{command:?}\""))
            }
        }
    }
    let output = child
        .wait_with_output()
        .with_context(|| format!("Failed to read output of command \"{command:?}\""))?;
    Ok(ExecOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into(),
        stderr: String::from_utf8_lossy(&output.stderr).into(),
    })
}

#[entrait(pub HttpGet, mock_api=HttpGetMock)]
fn http_get(_deps: &impl std::any::Any, url: &str, timeout: Duration) -> Result<String> {
    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")?;
    let response = client
        .get(url)
        .send()
        .with_context(|| format!("Request failed for \"{url}\""))?
        .error_for_status()
        .with_context(|| format!("Request failed for \"{url}\""))?;
    response
        .text()
        .with_context(|| format!("Failed to read response body from \"{url}\""))
}

#[entrait(pub ReadFile, mock_api=ReadFileMock)]
fn read_file(_deps: &impl std::any::Any, path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(io_err) => {
            if matches!(io_err.kind(), std::io::ErrorKind::NotFound) {
                Ok(None)
            } else {
                Err(io_err)
            }
        }
    }
    .with_context(|| format!("Failed to read file at \"{}\"", path.display()))
}

#[entrait(pub WriteFile, mock_api=WriteFileMock)]
fn write_file(_deps: &impl std::any::Any, path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write file at \"{}\"", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_reason() {
        let output = ExecOutput {
            success: false,
            code: Some(125),
            stdout: String::new(),
            stderr: String::from("Error: No such image: ghcr.io/example/agent\nmore details\n"),
        };
        assert_eq!(
            output.failure_reason(),
            "exit code 125: Error: No such image: ghcr.io/example/agent",
        );
    }

    #[test]
    fn test_failure_reason_signaled() {
        let output = ExecOutput {
            success: false,
            code: None,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(output.failure_reason(), "exit code unknown");
    }
}

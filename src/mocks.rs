use crate::dependencies::{
    ArgsMock, EnvironmentMock, ExecMock, ExecOutput, HttpGetMock, ReadFileMock, WriteFileMock,
};
use anyhow::bail;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use unimock::{matching, Clause, MockFn};

pub fn exec_success(stdout: &str) -> ExecOutput {
    ExecOutput {
        success: true,
        code: Some(0),
        stdout: String::from(stdout),
        stderr: String::new(),
    }
}

pub fn exec_failure() -> ExecOutput {
    ExecOutput {
        success: false,
        code: Some(1),
        stdout: String::new(),
        stderr: String::from("No such image"),
    }
}

pub fn args_mock(args: &str) -> impl Clause {
    ArgsMock
        .each_call(matching!())
        .returns(args.split(' ').map(String::from).collect::<Vec<_>>())
        .once()
}

pub fn read_var_mock() -> impl Clause {
    EnvironmentMock.stub(|each| {
        each.call(matching!("AGENTBEATS_API_URL"))
            .answers(|_| bail!("Failed"));
    })
}

pub fn read_scenario_mock(contents: Option<&str>) -> impl Clause {
    let result = contents
        .unwrap_or(include_str!("fixtures/scenario.toml"))
        .to_string();
    ReadFileMock
        .each_call(matching!((path) if path == &PathBuf::from("scenario.toml")))
        .answers(move |_| Ok(Some(result.clone())))
        .once()
}

pub fn docker_inspect_mock(exposed_ports: &str, times: usize) -> impl Clause {
    let stdout = format!("{exposed_ports}\n");
    ExecMock
        .each_call(matching!((command, _) if command.get_program() == "docker" && command.get_args().next() == Some(OsStr::new("inspect"))))
        .answers(move |_| Ok(exec_success(&stdout)))
        .n_times(times)
}

pub fn docker_inspect_failure_mock() -> impl Clause {
    ExecMock
        .each_call(matching!((command, _) if command.get_program() == "docker" && command.get_args().next() == Some(OsStr::new("inspect"))))
        .answers(|_| Ok(exec_failure()))
        .once()
}

pub fn docker_inspect_timeout_mock() -> impl Clause {
    ExecMock
        .each_call(matching!((command, _) if command.get_program() == "docker" && command.get_args().next() == Some(OsStr::new("inspect"))))
        .answers(|_| bail!("Command \"docker inspect\" timed out after 30 seconds"))
        .once()
}

// The first inspection fails as if the image were missing locally and the
// inspection after the pull answers with the retried output
pub fn docker_inspect_retry_mock(retried: Option<&str>) -> impl Clause {
    let retried = retried.map(|stdout| format!("{stdout}\n"));
    let calls = AtomicUsize::new(0);
    ExecMock
        .each_call(matching!((command, _) if command.get_program() == "docker" && command.get_args().next() == Some(OsStr::new("inspect"))))
        .answers(move |_| {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(exec_failure())
            } else {
                match &retried {
                    Some(stdout) => Ok(exec_success(stdout)),
                    None => Ok(exec_failure()),
                }
            }
        })
        .n_times(2)
}

pub fn docker_pull_mock(success: bool) -> impl Clause {
    ExecMock
        .each_call(matching!((command, _) if command.get_program() == "docker" && command.get_args().next() == Some(OsStr::new("pull"))))
        .answers(move |_| {
            Ok(if success {
                exec_success("")
            } else {
                exec_failure()
            })
        })
        .once()
}

pub fn http_agent_mock(agent_id: &str, body: &str) -> impl Clause {
    let url = format!("{}/{agent_id}", crate::agents::DEFAULT_API_URL);
    let body = String::from(body);
    HttpGetMock
        .each_call(matching!((request_url, _) if request_url == &url))
        .answers(move |_| Ok(body.clone()))
        .once()
}

pub fn write_outputs_mock() -> impl Clause {
    WriteFileMock
        .each_call(matching!((path, _) if path == &PathBuf::from(crate::compose::COMPOSE_PATH) || path == &PathBuf::from(crate::compose::RUNTIME_SCENARIO_PATH) || path == &PathBuf::from(crate::compose::ENV_EXAMPLE_PATH)))
        .answers(|_| Ok(()))
        .n_times(3)
}

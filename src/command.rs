//! Child process execution with a hard time bound.

use std::ffi::OsStr;
use std::future::Future;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::error::AttemptError;

/// Runs a command and hands back its text output.
///
/// Any failure (missing executable, non-zero exit, timeout) yields an empty
/// string; callers treat that the same as output that matched nothing.
pub trait CommandRunner: Sync {
    fn run(&self, program: &str, args: &[&str]) -> impl Future<Output = String> + Send;
}

pub struct SystemRunner {
    limit: Duration,
}

impl SystemRunner {
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> impl Future<Output = String> + Send {
        let mut command = Command::new(program);
        command.args(args);
        let limit = self.limit;
        let program = program.to_string();

        async move {
            match capture(command, limit).await {
                Ok(output) if output.status.success() => {
                    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                    text.push_str(&String::from_utf8_lossy(&output.stderr));
                    text
                }
                Ok(output) => {
                    debug!(%program, status = %output.status, "command exited unsuccessfully");
                    String::new()
                }
                Err(e) => {
                    debug!(%program, error = %e, "command did not run");
                    String::new()
                }
            }
        }
    }
}

/// Spawns `command` and collects its output, killing it once `limit` passes.
pub async fn capture(mut command: Command, limit: Duration) -> Result<Output, AttemptError> {
    let program = command.as_std().get_program().to_string_lossy().into_owned();
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command
        .spawn()
        .map_err(|source| AttemptError::Spawn { program: program.clone(), source })?;

    match timeout(limit, child.wait_with_output()).await {
        Ok(result) => result.map_err(|source| AttemptError::Spawn { program, source }),
        Err(_) => Err(AttemptError::Timeout(limit)),
    }
}

/// First of `names` that resolves to an executable on `PATH`.
pub fn find_executable(names: &[String]) -> Option<PathBuf> {
    find_executable_in(names, std::env::var_os("PATH"))
}

pub fn find_executable_in<P: AsRef<OsStr>>(names: &[String], paths: Option<P>) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    names
        .iter()
        .find_map(|name| which::which_in(name, paths.as_ref(), &cwd).ok())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fn runner() -> SystemRunner {
        SystemRunner::new(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn successful_command_returns_stdout_and_stderr() {
        let out = runner().run("sh", &["-c", "echo out; echo err 1>&2"]).await;
        assert_eq!(out, "out\nerr\n");
    }

    #[tokio::test]
    async fn nonzero_exit_is_empty() {
        let out = runner().run("sh", &["-c", "echo 'Bit Rate=54 Mb/s'; exit 3"]).await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn missing_executable_is_empty() {
        let out = runner().run("definitely-not-a-real-binary-xyz", &[]).await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let runner = SystemRunner::new(Duration::from_millis(200));
        let out = runner.run("sh", &["-c", "sleep 5; echo late"]).await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn capture_reports_timeout() {
        let mut command = Command::new("sh");
        command.args(["-c", "sleep 5"]);
        let err = capture(command, Duration::from_millis(100)).await.unwrap_err();
        assert!(matches!(err, AttemptError::Timeout(_)));
    }

    #[test]
    fn finds_first_available_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speedtest");
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

        let names = vec!["speedtest-cli".to_string(), "speedtest".to_string()];
        let found = find_executable_in(&names, Some(dir.path())).unwrap();
        assert_eq!(found.file_name(), path.file_name());
    }

    #[test]
    fn no_candidate_found() {
        let dir = tempfile::tempdir().unwrap();
        let names = vec!["speedtest-cli".to_string()];
        assert!(find_executable_in(&names, Some(dir.path())).is_none());
    }
}

//! Process Runner Adapter
//!
//! Implements the `CommandRunner` port on top of `tokio::process`.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::domain::ports::{CommandOutput, CommandRunner};
use crate::error::{Error, Result};

/// Exit code reported when the process was terminated by a signal.
const SIGNALED_EXIT_CODE: i32 = -1;

/// Spawns one child process per call.
///
/// The child is created with `kill_on_drop`, so when the timeout elapses and
/// the wait future is dropped the process is killed instead of being left
/// running into the next refresh cycle.
#[derive(Debug, Clone, Default)]
pub struct TokioCommandRunner;

impl TokioCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    #[instrument(skip(self), fields(command = %args.join(" ")))]
    async fn run(&self, args: &[String], timeout: Duration) -> Result<CommandOutput> {
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| Error::Internal("empty command line".to_string()))?;

        let child = Command::new(program)
            .args(rest)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => {
                let output = output?;
                let exit_code = output.status.code().unwrap_or(SIGNALED_EXIT_CODE);
                debug!(exit_code, bytes = output.stdout.len(), "Command finished");
                Ok(CommandOutput::new(exit_code, output.stdout))
            }
            Err(_) => Err(Error::CommandTimeout {
                command: args.join(" "),
                timeout,
            }),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn cmd(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_not_an_error() {
        let runner = TokioCommandRunner::new();
        let output = runner
            .run(&cmd(&["sh", "-c", "echo table; exit 4"]), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(output.exit_code, 4);
        assert_eq!(output.stdout_lossy(), "table\n");
    }

    #[tokio::test]
    async fn test_stderr_is_discarded() {
        let runner = TokioCommandRunner::new();
        let output = runner
            .run(&cmd(&["sh", "-c", "echo noise >&2; echo data"]), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(output.stdout_lossy(), "data\n");
    }

    #[tokio::test]
    async fn test_timeout() {
        let runner = TokioCommandRunner::new();
        let result = runner
            .run(&cmd(&["sleep", "5"]), Duration::from_millis(100))
            .await;

        assert_matches!(result, Err(Error::CommandTimeout { .. }));
    }

    #[tokio::test]
    async fn test_timed_out_child_is_killed() {
        let marker = std::env::temp_dir().join(format!("smartprom-kill-{}", std::process::id()));
        let _ = std::fs::remove_file(&marker);
        let script = format!("sleep 0.5; touch {}", marker.display());

        let runner = TokioCommandRunner::new();
        let result = runner
            .run(&cmd(&["sh", "-c", &script]), Duration::from_millis(100))
            .await;
        assert_matches!(result, Err(Error::CommandTimeout { .. }));

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert!(!marker.exists(), "child outlived its timeout");
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let runner = TokioCommandRunner::new();
        let result = runner
            .run(&cmd(&["/nonexistent/smartctl"]), Duration::from_secs(1))
            .await;

        assert_matches!(result, Err(Error::Io(_)));
    }

    #[tokio::test]
    async fn test_empty_command_line() {
        let runner = TokioCommandRunner::new();
        let result = runner.run(&[], Duration::from_secs(1)).await;

        assert_matches!(result, Err(Error::Internal(_)));
    }
}

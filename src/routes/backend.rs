use std::process::Stdio;

use log::trace;
use tokio::process::Command;

use super::SourceError;
use crate::logging::LogContext;

/// Where intercept rules are listed from
#[async_trait::async_trait]
pub trait RuleReader: Send + Sync {
    /// Rules in an iptables chain, one per line (`iptables -t <table> -S <chain>`)
    async fn list_chain(
        &self,
        iptables: &str,
        table: &str,
        chain: &str,
    ) -> Result<Vec<String>, SourceError>;

    /// Rules in a map based filter (`<command> -L`)
    async fn list_map(&self, command: &str) -> Result<Vec<String>, SourceError>;
}

/// Lists rules by running the filter's own CLI
#[derive(Clone, Copy, Debug, Default)]
pub struct CommandReader;

impl CommandReader {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl RuleReader for CommandReader {
    async fn list_chain(
        &self,
        iptables: &str,
        table: &str,
        chain: &str,
    ) -> Result<Vec<String>, SourceError> {
        let output = run(iptables, &["-t", table, "-S", chain]).await?;
        Ok(output.lines().map(str::to_string).collect())
    }

    async fn list_map(&self, command: &str) -> Result<Vec<String>, SourceError> {
        let output = run(command, &["-L"]).await?;
        Ok(output.split('\n').map(str::to_string).collect())
    }
}

async fn run(program: &str, args: &[&str]) -> Result<String, SourceError> {
    let command = format!("{} {}", program, args.join(" "));
    trace!(target: LogContext::ROUTES.target(), "Running '{}'", command);
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|err| SourceError::Spawn {
            command: command.clone(),
            reason: err.to_string(),
        })?;
    if !output.status.success() {
        return Err(SourceError::CommandFailed {
            command,
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_output() {
        let output = run("/bin/echo", &["-A NF-INTERCEPT -d 10.0.0.0/24"]).await.unwrap();
        assert_eq!(output.trim(), "-A NF-INTERCEPT -d 10.0.0.0/24");
    }

    #[tokio::test]
    async fn test_run_failure() {
        match run("/bin/sh", &["-c", "echo denied >&2; exit 3"]).await {
            Err(SourceError::CommandFailed {
                exit_code, stderr, ..
            }) => {
                assert_eq!(exit_code, Some(3));
                assert_eq!(stderr, "denied");
            }
            other => panic!("Expected CommandFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_missing_binary() {
        let result = CommandReader::new().list_map("/nonexistent/zfw").await;
        assert!(matches!(result, Err(SourceError::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_list_chain_uses_iptables_args() {
        // `echo` stands in for iptables to show the arguments it receives
        let lines = CommandReader::new()
            .list_chain("/bin/echo", "mangle", "NF-INTERCEPT")
            .await
            .unwrap();
        assert_eq!(lines, vec!["-t mangle -S NF-INTERCEPT"]);
    }
}

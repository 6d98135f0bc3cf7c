use std::error;
use std::fmt;
use std::process::{Output, Stdio};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, trace, warn};
use nix::unistd::User;
use tokio::process::Command;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};

use crate::config::{Config, HealthConfig};
use crate::logging::LogContext;

/// Exit code of the health check, `-1` when it never produced one
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HealthStatus(pub i32);

impl HealthStatus {
    pub const FAILED: HealthStatus = HealthStatus(-1);

    pub fn is_healthy(&self) -> bool {
        self.0 == 0
    }
}

impl From<&Output> for HealthStatus {
    fn from(output: &Output) -> Self {
        // Killed by a signal: no exit code
        output.status.code().map(HealthStatus).unwrap_or(Self::FAILED)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = if self.is_healthy() { "healthy" } else { "unhealthy" };
        write!(f, "{} (exit code {})", state, self.0)
    }
}

#[derive(Debug)]
pub enum HealthError {
    /// No account exists with this name
    UnknownUser(String),
    /// Account lookup failed. [user, reason]
    Lookup { user: String, reason: String },
    /// Check couldn't be started. [command, reason]
    Spawn { command: String, reason: String },
    /// Check was killed for running too long. [command, limit]
    Timeout { command: String, after: Duration },
}

impl fmt::Display for HealthError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Health Check Error: ")?;
        match self {
            HealthError::UnknownUser(user) => write!(f, "Unknown user '{}'", user),
            HealthError::Lookup { user, reason } => {
                write!(f, "Failed to look up user '{}' [{}]", user, reason)
            }
            HealthError::Spawn { command, reason } => {
                write!(f, "Failed to run '{}' [{}]", command, reason)
            }
            HealthError::Timeout { command, after } => {
                write!(f, "'{}' didn't finish within {:?}", command, after)
            }
        }
    }
}

impl error::Error for HealthError {}

/// Periodically runs the health check under a non-privileged account
pub struct HealthMonitor {
    config: watch::Receiver<Arc<Config>>,
    log: LogContext,
}

impl HealthMonitor {
    pub fn new(config: watch::Receiver<Arc<Config>>, log: LogContext) -> Self {
        Self { config, log }
    }

    fn settings(&self) -> HealthConfig {
        self.config.borrow().health.clone()
    }

    /// Run the check once
    ///
    /// Only an account lookup failure is an error; every way the check
    /// itself can fail reports unhealthy.
    pub async fn check(&self, settings: &HealthConfig) -> Result<HealthStatus, HealthError> {
        let user = lookup_user(&settings.user)?;
        debug!(
            target: self.log.target(),
            "user id {}, user group {}", user.uid, user.gid
        );
        match self.execute(settings, &user).await {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                if !stdout.trim().is_empty() {
                    debug!(target: self.log.target(), "stdout: {}", stdout.trim());
                }
                if !stderr.trim().is_empty() {
                    debug!(target: self.log.target(), "stderr: {}", stderr.trim());
                }
                Ok(HealthStatus::from(&output))
            }
            Err(err) => {
                error!(target: self.log.target(), "{}", err);
                Ok(HealthStatus::FAILED)
            }
        }
    }

    async fn execute(&self, settings: &HealthConfig, user: &User) -> Result<Output, HealthError> {
        trace!(
            target: self.log.target(),
            "Running '{} {}' as {}",
            settings.command,
            settings.args.join(" "),
            user.name
        );
        let mut command = Command::new(&settings.command);
        command
            .args(&settings.args)
            .uid(user.uid.as_raw())
            .gid(user.gid.as_raw())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Dropping the unfinished output future kills the child
        match timeout(settings.timeout, command.output()).await {
            Ok(output) => output.map_err(|err| HealthError::Spawn {
                command: settings.command.clone(),
                reason: err.to_string(),
            }),
            Err(_) => Err(HealthError::Timeout {
                command: settings.command.clone(),
                after: settings.timeout,
            }),
        }
    }

    /// Publish a status every `interval` until the receiver goes away
    pub async fn run(self, tx: watch::Sender<HealthStatus>) {
        loop {
            let settings = self.settings();
            sleep(settings.interval).await;
            match self.check(&settings).await {
                Ok(status) => {
                    if !status.is_healthy() {
                        warn!(target: self.log.target(), "Health check {}", status);
                    } else {
                        debug!(target: self.log.target(), "Health check {}", status);
                    }
                    if tx.send(status).is_err() {
                        debug!(target: self.log.target(), "Health receiver closed, stopping");
                        return;
                    }
                }
                Err(err) => error!(target: self.log.target(), "{}", err),
            }
        }
    }
}

fn lookup_user(name: &str) -> Result<User, HealthError> {
    match User::from_name(name) {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(HealthError::UnknownUser(name.to_string())),
        Err(err) => Err(HealthError::Lookup {
            user: name.to_string(),
            reason: err.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::getuid;
    use std::time::Instant;

    fn current_user() -> String {
        User::from_uid(getuid()).unwrap().unwrap().name
    }

    fn settings(command: &str, args: &[&str], user: &str) -> HealthConfig {
        HealthConfig {
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            user: user.to_string(),
            interval: Duration::from_millis(10),
            timeout: Duration::from_secs(5),
        }
    }

    fn monitor(settings: HealthConfig) -> HealthMonitor {
        let mut config = Config::default();
        config.health = settings;
        let (_tx, rx) = watch::channel(Arc::new(config));
        HealthMonitor::new(rx, LogContext::HEALTH)
    }

    #[test]
    fn test_status() {
        assert!(HealthStatus(0).is_healthy());
        assert!(!HealthStatus(1).is_healthy());
        assert!(!HealthStatus::FAILED.is_healthy());
        assert_eq!(HealthStatus(2).to_string(), "unhealthy (exit code 2)");
    }

    #[tokio::test]
    async fn test_exit_codes() {
        let user = current_user();
        let healthy = settings("/bin/sh", &["-c", "echo ok"], &user);
        let status = monitor(healthy.clone()).check(&healthy).await.unwrap();
        assert_eq!(status, HealthStatus(0));

        let unhealthy = settings("/bin/sh", &["-c", "echo failing >&2; exit 1"], &user);
        let status = monitor(unhealthy.clone()).check(&unhealthy).await.unwrap();
        assert_eq!(status, HealthStatus(1));
    }

    #[tokio::test]
    async fn test_fails_closed() {
        let user = current_user();
        let missing = settings("/nonexistent/erhchecker", &[], &user);
        let status = monitor(missing.clone()).check(&missing).await.unwrap();
        assert_eq!(status, HealthStatus::FAILED);

        let killed = settings("/bin/sh", &["-c", "kill -9 $$"], &user);
        let status = monitor(killed.clone()).check(&killed).await.unwrap();
        assert_eq!(status, HealthStatus::FAILED);
    }

    #[tokio::test]
    async fn test_hung_check_fails() {
        let mut hung = settings("/bin/sh", &["-c", "sleep 5"], &current_user());
        hung.timeout = Duration::from_millis(100);
        let monitor = monitor(hung.clone());

        let user = lookup_user(&hung.user).unwrap();
        assert!(matches!(
            monitor.execute(&hung, &user).await,
            Err(HealthError::Timeout { .. })
        ));

        let started = Instant::now();
        assert_eq!(monitor.check(&hung).await.unwrap(), HealthStatus::FAILED);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_unknown_user_skips_cycle() {
        let unknown = settings("/bin/sh", &["-c", "exit 0"], "zbgp-no-such-user");
        let result = monitor(unknown.clone()).check(&unknown).await;
        assert!(matches!(result, Err(HealthError::UnknownUser(_))));
    }

    #[tokio::test]
    async fn test_run_publishes_status() {
        let user = current_user();
        let monitor = monitor(settings("/bin/sh", &["-c", "exit 3"], &user));
        let (tx, mut rx) = watch::channel(HealthStatus::FAILED);
        let task = tokio::spawn(monitor.run(tx));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), HealthStatus(3));
        drop(rx);
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }
}

//! Discovery of the prefixes the router currently intercepts
//!
//! The router config decides where intercept rules live:
//! - `tproxy`: an iptables chain (`mangle` / `NF-INTERCEPT` by default)
//! - `tproxy:<filter>`: a map based filter, listed with `<map command> -L`
//! - anything else: nothing is intercepted, so nothing is advertised

mod backend;
mod parse;

pub use backend::{CommandReader, RuleReader};
pub use parse::{parse_rule, parse_rules};

use std::error;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, warn};
use tokio::sync::watch;
use tokio::time::sleep;

use crate::config::{Config, ConfigError, RouteConfig, RouterMode};
use crate::logging::LogContext;
use crate::utils::format_cycle_duration;

#[derive(Debug)]
pub enum SourceError {
    /// Couldn't start a listing command. [command, reason]
    Spawn { command: String, reason: String },
    /// Listing command exited unsuccessfully. [command, exit code, stderr]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },
    /// Router config couldn't be read
    RouterConfig(ConfigError),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Route Source Error: ")?;
        use SourceError::*;
        match self {
            Spawn { command, reason } => write!(f, "Failed to run '{}' [{}]", command, reason),
            CommandFailed {
                command,
                exit_code,
                stderr,
            } => match exit_code {
                Some(code) => write!(f, "'{}' exited with {} [{}]", command, code, stderr),
                None => write!(f, "'{}' terminated by signal [{}]", command, stderr),
            },
            RouterConfig(err) => write!(f, "{}", err),
        }
    }
}

impl error::Error for SourceError {}

impl From<ConfigError> for SourceError {
    fn from(error: ConfigError) -> Self {
        SourceError::RouterConfig(error)
    }
}

/// Polls the intercept rules and publishes the prefixes to advertise
pub struct RouteSource<R> {
    reader: R,
    config: watch::Receiver<Arc<Config>>,
    log: LogContext,
}

impl<R> RouteSource<R>
where
    R: RuleReader,
{
    pub fn new(reader: R, config: watch::Receiver<Arc<Config>>, log: LogContext) -> Self {
        Self {
            reader,
            config,
            log,
        }
    }

    fn settings(&self) -> RouteConfig {
        self.config.borrow().routes.clone()
    }

    /// Current set of routable prefixes (canonical CIDR strings, first-seen order)
    ///
    /// Errors mean "no data this cycle" and must not be treated as an empty set.
    pub async fn discover(&self) -> Result<Vec<String>, SourceError> {
        let settings = self.settings();
        let mode = RouterMode::from_file(&settings.router_config)?;
        debug!(target: self.log.target(), "Router mode: {}", mode);
        self.discover_for_mode(&mode, &settings).await
    }

    pub async fn discover_for_mode(
        &self,
        mode: &RouterMode,
        settings: &RouteConfig,
    ) -> Result<Vec<String>, SourceError> {
        let rules = match mode {
            RouterMode::Tproxy => {
                debug!(
                    target: self.log.target(),
                    "Reading iptables '{}' chain '{}'", settings.table, settings.chain
                );
                self.reader
                    .list_chain(&settings.iptables, &settings.table, &settings.chain)
                    .await?
            }
            RouterMode::TproxyMap(_) => {
                debug!(target: self.log.target(), "Reading map rules from '{}'", settings.map_command);
                self.reader.list_map(&settings.map_command).await?
            }
            RouterMode::Other(_) => {
                debug!(target: self.log.target(), "No intercept configured for mode {}", mode);
                return Ok(vec![]);
            }
        };
        Ok(parse_rules(&rules))
    }

    /// Publish discovered prefixes every `scan_interval` until the receiver goes away
    ///
    /// Each scan replaces the published set, so a slow consumer only ever
    /// sees the newest one.
    pub async fn run(self, tx: watch::Sender<Vec<String>>) {
        loop {
            let interval = self.settings().scan_interval;
            let started = Instant::now();
            let discovered = self.discover().await;
            let elapsed = started.elapsed();
            if elapsed > interval {
                warn!(
                    target: self.log.target(),
                    "Route scan took {}, longer than the {} cycle",
                    format_cycle_duration(elapsed),
                    format_cycle_duration(interval)
                );
            } else {
                debug!(target: self.log.target(), "It took {} to get routes", format_cycle_duration(elapsed));
            }

            match discovered {
                Ok(routes) => {
                    debug!(target: self.log.target(), "Routes to advertise {:?}", routes);
                    if tx.send(routes).is_err() {
                        debug!(target: self.log.target(), "Route receiver closed, stopping");
                        return;
                    }
                }
                Err(err) => error!(target: self.log.target(), "{}", err),
            }

            debug!(target: self.log.target(), "Sleeping for {} before looping again", format_cycle_duration(interval));
            sleep(interval).await;
        }
    }
}

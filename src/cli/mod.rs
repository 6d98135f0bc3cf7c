//! # zbgp CLI
//!
//! Advertises the service prefixes an edge router intercepts as BGP routes,
//! and withdraws them all while the router's health check is failing.
//!
//! ## Client mode
//! Drive an already running RIB service (listening on `127.0.0.1:50051` unless configured):
//! ```sh
//! $ zbgp -v client -c /etc/zbgp/zbgp.toml
//! ```
//!
//! ## Server mode
//! Serve the RIB from this process, then drive it:
//! ```sh
//! $ zbgp server -c /etc/zbgp/zbgp.toml --api 127.0.0.1:50051
//! ```
//!
//! Send `SIGHUP` to re-read the config file; route and health settings
//! apply from the next cycle.

use std::net::SocketAddr;

use clap::Parser;
use log::LevelFilter;

use crate::handler::Role;

#[derive(Parser, Debug)]
#[clap(name = "zbgp", rename_all = "kebab-case")]
/// Advertise intercepted service prefixes over BGP
pub struct Args {
    #[clap(subcommand)]
    pub cmd: Command,
    /// Show debug logs (additive for trace logs)
    #[clap(short, parse(from_occurrences), global = true)]
    pub verbose: u8,
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub enum Command {
    /// Reconcile routes into a running RIB service
    Client(RunOptions),
    /// Serve a local RIB and reconcile routes into it
    Server(ServerOptions),
    /// Print the version
    Version,
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub struct RunOptions {
    /// Path to zbgp config.toml (defaults are used if not provided)
    #[clap(short, long)]
    pub config_path: Option<String>,
    /// RIB API address (E.g. 127.0.0.1:50051). If not provided, will fall back to config file value
    #[clap(long)]
    pub api: Option<SocketAddr>,
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub struct ServerOptions {
    /// Path to zbgp config.toml, must include a [rib] section
    #[clap(short, long)]
    pub config_path: String,
    /// Address to serve the RIB API on. If not provided, will fall back to config file value
    #[clap(long)]
    pub api: Option<SocketAddr>,
}

/// Daemon run requested on the command line
#[derive(Debug, PartialEq, Eq)]
pub struct Invocation {
    pub role: Role,
    pub config_path: Option<String>,
    pub api: Option<SocketAddr>,
}

impl Args {
    /// Crate filter level and everything-else filter level for `-v` occurrences
    pub fn log_levels(&self) -> (LevelFilter, LevelFilter) {
        match self.verbose {
            0 => (LevelFilter::Info, LevelFilter::Warn),
            1 => (LevelFilter::Debug, LevelFilter::Warn),
            2 => (LevelFilter::Trace, LevelFilter::Warn),
            _ => (LevelFilter::Trace, LevelFilter::Trace),
        }
    }

    /// Log levels, plus the daemon run (`None` for `version`)
    pub fn into_parts(self) -> ((LevelFilter, LevelFilter), Option<Invocation>) {
        let levels = self.log_levels();
        let invocation = match self.cmd {
            Command::Version => None,
            Command::Client(options) => Some(Invocation {
                role: Role::Client,
                config_path: options.config_path,
                api: options.api,
            }),
            Command::Server(options) => Some(Invocation {
                role: Role::Server,
                config_path: Some(options.config_path),
                api: options.api,
            }),
        };
        (levels, invocation)
    }
}

pub fn version() -> String {
    format!("{} {}", clap::crate_name!(), clap::crate_version!())
}

mod file;
mod router;

pub use router::RouterMode;

use std::error;
use std::fmt;
use std::io::Result;
use std::net::SocketAddr;
use std::time::Duration;

use crate::api::Global;

/// Parse a TOML config file and return a Config
pub fn from_file(path: &str) -> Result<Config> {
    let spec = file::ConfigSpec::from_file(path)?;
    Ok(Config::from_spec(spec))
}

#[derive(Clone, Debug)]
pub struct Config {
    pub api: SocketAddr,
    /// Global settings for the local RIB (server mode)
    pub rib: Option<Global>,
    pub routes: RouteConfig,
    pub health: HealthConfig,
}

#[derive(Clone, Debug)]
pub struct RouteConfig {
    pub router_config: String,
    pub scan_interval: Duration,
    pub iptables: String,
    pub table: String,
    pub chain: String,
    pub map_command: String,
}

#[derive(Clone, Debug)]
pub struct HealthConfig {
    pub command: String,
    pub args: Vec<String>,
    pub user: String,
    pub interval: Duration,
    pub timeout: Duration,
}

impl Config {
    fn from_spec(spec: file::ConfigSpec) -> Self {
        Self {
            api: spec.api,
            rib: spec.rib.map(|r| Global {
                asn: r.asn,
                router_id: r.router_id,
                listen_port: r.listen_port,
            }),
            routes: RouteConfig {
                router_config: spec.routes.router_config,
                scan_interval: Duration::from_secs(spec.routes.scan_interval),
                iptables: spec.routes.iptables,
                table: spec.routes.table,
                chain: spec.routes.chain,
                map_command: spec.routes.map_command,
            },
            health: HealthConfig {
                command: spec.health.command,
                args: spec.health.args,
                user: spec.health.user,
                interval: Duration::from_secs(spec.health.interval),
                timeout: Duration::from_secs(spec.health.timeout),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_spec(file::ConfigSpec::default())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    /// Couldn't read a config file. [path, reason]
    Read { path: String, reason: String },
    /// Config file isn't valid. [path, reason]
    Parse { path: String, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Read { path, reason } => {
                write!(f, "Failed to read config '{}': {}", path, reason)
            }
            ConfigError::Parse { path, reason } => {
                write!(f, "Failed to parse config '{}': {}", path, reason)
            }
        }
    }
}

impl error::Error for ConfigError {}

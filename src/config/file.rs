use std::fs::File;
use std::io::{self, Read};
use std::net::{IpAddr, SocketAddr};

use serde::{self, Deserialize};
use toml;

struct Defaults {}

impl Defaults {
    fn api() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 50051))
    }

    fn listen_port() -> u16 {
        179
    }

    fn router_config() -> String {
        "/opt/netfoundry/ziti/ziti-router/config.yml".to_string()
    }

    fn scan_interval() -> u64 {
        1
    }

    fn iptables() -> String {
        "/sbin/iptables".to_string()
    }

    fn table() -> String {
        "mangle".to_string()
    }

    fn chain() -> String {
        "NF-INTERCEPT".to_string()
    }

    fn map_command() -> String {
        "/opt/openziti/bin/zfw".to_string()
    }

    fn health_command() -> String {
        "/usr/bin/python3".to_string()
    }

    fn health_args() -> Vec<String> {
        vec!["/opt/netfoundry/erhchecker.pyz".to_string()]
    }

    fn health_user() -> String {
        "ziggy".to_string()
    }

    fn health_interval() -> u64 {
        10
    }

    fn health_timeout() -> u64 {
        30
    }
}

/// Local RIB service settings (server mode only)
#[derive(Clone, Debug, Deserialize)]
pub(super) struct RibSpec {
    pub(super) asn: u32,
    pub(super) router_id: IpAddr,
    #[serde(default = "Defaults::listen_port")]
    pub(super) listen_port: u16,
}

#[derive(Clone, Debug, Deserialize)]
pub(super) struct RoutesSpec {
    // Ziti router config holding the tunnel listener mode
    #[serde(default = "Defaults::router_config")]
    pub(super) router_config: String,
    // Seconds between route scans
    #[serde(default = "Defaults::scan_interval")]
    pub(super) scan_interval: u64,
    #[serde(default = "Defaults::iptables")]
    pub(super) iptables: String,
    #[serde(default = "Defaults::table")]
    pub(super) table: String,
    #[serde(default = "Defaults::chain")]
    pub(super) chain: String,
    // Map based filter, listed with `-L`
    #[serde(default = "Defaults::map_command")]
    pub(super) map_command: String,
}

impl Default for RoutesSpec {
    fn default() -> Self {
        Self {
            router_config: Defaults::router_config(),
            scan_interval: Defaults::scan_interval(),
            iptables: Defaults::iptables(),
            table: Defaults::table(),
            chain: Defaults::chain(),
            map_command: Defaults::map_command(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub(super) struct HealthSpec {
    #[serde(default = "Defaults::health_command")]
    pub(super) command: String,
    #[serde(default = "Defaults::health_args")]
    pub(super) args: Vec<String>,
    // Unprivileged user the check runs as
    #[serde(default = "Defaults::health_user")]
    pub(super) user: String,
    // Seconds between health checks
    #[serde(default = "Defaults::health_interval")]
    pub(super) interval: u64,
    // Seconds a check may run before it's killed and counted as failed
    #[serde(default = "Defaults::health_timeout")]
    pub(super) timeout: u64,
}

impl Default for HealthSpec {
    fn default() -> Self {
        Self {
            command: Defaults::health_command(),
            args: Defaults::health_args(),
            user: Defaults::health_user(),
            interval: Defaults::health_interval(),
            timeout: Defaults::health_timeout(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ConfigSpec {
    // Address of the RIB JSON-RPC API (listen address in server mode)
    #[serde(default = "Defaults::api")]
    pub(super) api: SocketAddr,
    pub(super) rib: Option<RibSpec>,
    #[serde(default)]
    pub(super) routes: RoutesSpec,
    #[serde(default)]
    pub(super) health: HealthSpec,
}

impl Default for ConfigSpec {
    fn default() -> Self {
        Self {
            api: Defaults::api(),
            rib: None,
            routes: RoutesSpec::default(),
            health: HealthSpec::default(),
        }
    }
}

impl ConfigSpec {
    pub(super) fn from_file(path: &str) -> io::Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Self::from_str(&contents)
    }

    pub(super) fn from_str(contents: &str) -> io::Result<Self> {
        toml::from_str(contents).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_parse_config() {
        let config = ConfigSpec::from_file("./conf/zbgp.toml").unwrap();
        assert_eq!(config.api, "127.0.0.1:50051".parse().unwrap());
        let rib = config.rib.unwrap();
        assert_eq!(rib.router_id, IpAddr::from(Ipv4Addr::new(1, 1, 1, 1)));
        assert_eq!(rib.asn, 65000);
        assert_eq!(rib.listen_port, 179);
        assert_eq!(config.routes.chain, "NF-INTERCEPT");
        assert_eq!(config.routes.scan_interval, 1);
        assert_eq!(config.health.user, "ziggy");
        assert_eq!(config.health.interval, 10);
    }

    #[test]
    fn test_defaults() {
        let config = ConfigSpec::from_str("").unwrap();
        assert_eq!(config.api, Defaults::api());
        assert!(config.rib.is_none());
        assert_eq!(config.routes.table, "mangle");
        assert_eq!(config.routes.map_command, "/opt/openziti/bin/zfw");
        assert_eq!(config.health.command, "/usr/bin/python3");
        assert_eq!(config.health.args, vec!["/opt/netfoundry/erhchecker.pyz"]);
    }

    #[test]
    fn test_partial_sections() {
        let config = ConfigSpec::from_str(
            r#"
            api = "10.0.0.1:6000"

            [routes]
            scan_interval = 5

            [health]
            user = "nobody"
            args = []
            "#,
        )
        .unwrap();
        assert_eq!(config.api.port(), 6000);
        assert_eq!(config.routes.scan_interval, 5);
        assert_eq!(config.routes.chain, "NF-INTERCEPT");
        assert_eq!(config.health.user, "nobody");
        assert!(config.health.args.is_empty());
        assert_eq!(config.health.interval, 10);
        assert_eq!(config.health.timeout, 30);
    }

    #[test]
    fn test_invalid_config() {
        let err = ConfigSpec::from_str("[rib]\nasn = \"not a number\"").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}

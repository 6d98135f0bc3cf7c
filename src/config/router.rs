use std::fmt;
use std::fs;

use serde_yaml::Value;

use super::ConfigError;

/// How the router intercepts traffic, which decides where routes come from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouterMode {
    /// Rules live in an iptables chain
    Tproxy,
    /// Rules live in a map based filter, E.g. "tproxy:zfw" -> "zfw"
    TproxyMap(String),
    /// Nothing is intercepted, nothing to advertise
    Other(String),
}

impl From<&str> for RouterMode {
    fn from(mode: &str) -> Self {
        if mode == "tproxy" {
            RouterMode::Tproxy
        } else if let Some(filter) = mode.strip_prefix("tproxy:") {
            RouterMode::TproxyMap(filter.to_string())
        } else {
            RouterMode::Other(mode.to_string())
        }
    }
}

impl fmt::Display for RouterMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RouterMode::Tproxy => write!(f, "tproxy"),
            RouterMode::TproxyMap(filter) => write!(f, "tproxy:{}", filter),
            RouterMode::Other(mode) if mode.is_empty() => write!(f, "<none>"),
            RouterMode::Other(mode) => write!(f, "{}", mode),
        }
    }
}

impl RouterMode {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.to_string(),
            reason: err.to_string(),
        })?;
        Self::from_yaml(&contents).map_err(|reason| ConfigError::Parse {
            path: path.to_string(),
            reason,
        })
    }

    /// Mode of the first listener bound to "tunnel" that has options.
    /// A document without one (or with a non-string mode) yields an empty mode.
    pub fn from_yaml(contents: &str) -> Result<Self, String> {
        let document: Value = serde_yaml::from_str(contents).map_err(|err| err.to_string())?;
        let listeners = match document.get("listeners").and_then(Value::as_sequence) {
            Some(listeners) => listeners,
            None => return Ok(RouterMode::from("")),
        };
        let mode = listeners
            .iter()
            .filter(|l| l.get("binding").and_then(Value::as_str) == Some("tunnel"))
            .find_map(|l| l.get("options").filter(|o| o.is_mapping()))
            .map(|options| options.get("mode").and_then(Value::as_str).unwrap_or(""))
            .unwrap_or("");
        Ok(RouterMode::from(mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const ROUTER_CONFIG: &str = r#"
v: 3
identity:
  cert: /opt/netfoundry/ziti/ziti-router/certs/client.cert
listeners:
  - binding: edge
    address: tls:0.0.0.0:443
    options:
      advertise: 10.1.1.1:443
  - binding: tunnel
    options:
      mode: tproxy
      resolver: udp://10.1.1.1:53
"#;

    #[test]
    fn test_mode_from_str() {
        assert_eq!(RouterMode::from("tproxy"), RouterMode::Tproxy);
        assert_eq!(
            RouterMode::from("tproxy:zfw"),
            RouterMode::TproxyMap("zfw".to_string())
        );
        assert_eq!(RouterMode::from("host"), RouterMode::Other("host".into()));
        assert_eq!(RouterMode::from("tproxyx"), RouterMode::Other("tproxyx".into()));
        assert_eq!(RouterMode::from("TPROXY"), RouterMode::Other("TPROXY".into()));
    }

    #[test]
    fn test_mode_from_yaml() {
        assert_eq!(RouterMode::from_yaml(ROUTER_CONFIG).unwrap(), RouterMode::Tproxy);

        let map_mode = ROUTER_CONFIG.replace("mode: tproxy", "mode: tproxy:zfw");
        assert_eq!(
            RouterMode::from_yaml(&map_mode).unwrap(),
            RouterMode::TproxyMap("zfw".to_string())
        );
    }

    #[test]
    fn test_mode_absent() {
        let no_tunnel = ROUTER_CONFIG.replace("binding: tunnel", "binding: transport");
        assert_eq!(
            RouterMode::from_yaml(&no_tunnel).unwrap(),
            RouterMode::Other(String::new())
        );
        assert_eq!(
            RouterMode::from_yaml("v: 3\n").unwrap(),
            RouterMode::Other(String::new())
        );
        let numeric = ROUTER_CONFIG.replace("mode: tproxy", "mode: 7");
        assert_eq!(
            RouterMode::from_yaml(&numeric).unwrap(),
            RouterMode::Other(String::new())
        );
    }

    #[test]
    fn test_tunnel_without_options_is_skipped() {
        let config = r#"
listeners:
  - binding: tunnel
  - binding: tunnel
    options:
      mode: tproxy:zfw
"#;
        assert_eq!(
            RouterMode::from_yaml(config).unwrap(),
            RouterMode::TproxyMap("zfw".to_string())
        );
    }

    #[test]
    fn test_mode_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(ROUTER_CONFIG.as_bytes()).unwrap();
        let path = file.path().to_str().unwrap().to_string();
        assert_eq!(RouterMode::from_file(&path).unwrap(), RouterMode::Tproxy);

        assert!(matches!(
            RouterMode::from_file("/nonexistent/config.yml"),
            Err(ConfigError::Read { .. })
        ));

        let mut broken = tempfile::NamedTempFile::new().unwrap();
        broken.write_all(b"listeners: [ {").unwrap();
        let path = broken.path().to_str().unwrap().to_string();
        assert!(matches!(
            RouterMode::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}

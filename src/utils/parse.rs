use std::error::Error;
use std::fmt;
use std::io;
use std::net::{AddrParseError, IpAddr};
use std::num::ParseIntError;

use ipnetwork::IpNetwork;

#[derive(Debug)]
pub struct ParseError {
    pub reason: String,
}

impl ParseError {
    pub fn new(reason: String) -> Self {
        ParseError { reason }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParseError: {}", self.reason)
    }
}

impl Error for ParseError {
    fn description(&self) -> &str {
        "Error parsing prefixes or path attributes"
    }
}

impl From<io::Error> for ParseError {
    fn from(error: io::Error) -> Self {
        ParseError::new(error.to_string())
    }
}

impl From<ipnetwork::IpNetworkError> for ParseError {
    fn from(error: ipnetwork::IpNetworkError) -> Self {
        ParseError::new(error.to_string())
    }
}

/// Parse a CIDR token and mask off host bits
/// E.g. "10.1.2.3/16" -> 10.1.0.0/16
///
/// Bare addresses (no "/len") are not CIDRs and are rejected.
/// ```
/// use zbgp::utils::parse_cidr;
/// let network = parse_cidr("192.168.10.7/24").unwrap();
/// assert_eq!(network.to_string(), "192.168.10.0/24");
/// assert!(parse_cidr("192.168.10.7").is_none());
/// ```
pub fn parse_cidr(token: &str) -> Option<IpNetwork> {
    if !token.contains('/') {
        return None;
    }
    let network: IpNetwork = token.parse().ok()?;
    IpNetwork::new(network.network(), network.prefix()).ok()
}

/// Is this the IPv4 default route (0.0.0.0/0)
pub fn is_default_route(network: &IpNetwork) -> bool {
    match network {
        IpNetwork::V4(v4) => v4.prefix() == 0 && v4.ip().is_unspecified(),
        IpNetwork::V6(_) => false,
    }
}

/// Split a CIDR prefix (E.g. "192.168.0.0/24") into address & length
/// ```
/// use zbgp::utils::split_prefix;
/// let (addr, length) = split_prefix("192.168.10.0/24").unwrap();
/// assert_eq!(addr.to_string(), "192.168.10.0");
/// assert_eq!(length, 24);
/// ```
pub fn split_prefix(prefix: &str) -> Result<(IpAddr, u8), ParseError> {
    if let Some(i) = prefix.find('/') {
        let (addr, mask) = prefix.split_at(i);
        let mask = &mask[1..]; // Skip remaining '/'
        let addr: IpAddr = addr
            .parse()
            .map_err(|err: AddrParseError| ParseError::new(format!("{} '{}'", err, prefix)))?;
        let length: u8 = mask
            .parse()
            .map_err(|err: ParseIntError| ParseError::new(format!("{} '{}'", err, prefix)))?;
        let max_length = match addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if length > max_length {
            return Err(ParseError::new(format!(
                "Prefix length {} out of range '{}'",
                length, prefix
            )));
        }
        Ok((addr, length))
    } else {
        Err(ParseError {
            reason: format!("Not a valid prefix: '{}'", prefix),
        })
    }
}

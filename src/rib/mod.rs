mod attributes;
pub mod families;

pub use attributes::PathAttributes;
pub use families::Family;

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ipnetwork::IpNetwork;
use log::trace;

use crate::api::{Destination, Global, Path, PathEntry, PathResult};
use crate::logging::LogContext;
use crate::utils::{format_time_as_elapsed, ParseError};

/// A locally originated path held in the RIB
#[derive(Debug)]
pub struct RibEntry {
    // Time inserted
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) family: Family,
    pub(crate) network: IpNetwork,
    pub(crate) attributes: Arc<PathAttributes>,
}

impl RibEntry {
    pub fn new(family: Family, network: IpNetwork, attributes: PathAttributes) -> Self {
        Self {
            timestamp: Utc::now(),
            family,
            network,
            attributes: Arc::new(attributes),
        }
    }

    fn to_destination(&self) -> Destination {
        Destination {
            prefix: self.network.to_string(),
            paths: vec![PathEntry {
                attributes: self.attributes.to_spec(),
                // Only locally originated paths live here
                source_asn: None,
                best: true,
                age: format_time_as_elapsed(self.timestamp),
            }],
        }
    }
}

impl fmt::Display for RibEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<RibEntry {} family={} age={}>",
            self.network,
            self.family,
            format_time_as_elapsed(self.timestamp),
        )
    }
}

/// Local table of a speaker without peers
#[derive(Debug)]
pub struct RIB {
    global: Global,
    // Keyed by (network address, prefix length)
    entries: BTreeMap<(IpAddr, u8), RibEntry>,
}

impl RIB {
    pub fn new(global: Global) -> Self {
        Self {
            global,
            entries: BTreeMap::new(),
        }
    }

    pub fn global(&self) -> &Global {
        &self.global
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get_routes(&self, family: Family) -> Vec<Destination> {
        self.entries
            .values()
            .filter(|e| e.family == family)
            .map(RibEntry::to_destination)
            .collect()
    }

    /// Insert (or replace the attributes of) a locally originated path
    pub fn insert(&mut self, path: &Path) -> Result<PathResult, ParseError> {
        let network = path_network(path)?;
        let attributes = PathAttributes::from_spec(&path.attributes)?;
        let changed = self
            .entries
            .insert(
                (network.ip(), network.prefix()),
                RibEntry::new(path.family, network, attributes),
            )
            .is_none();
        trace!(target: LogContext::RIB.target(), "Inserted {} [new={}]", network, changed);
        Ok(PathResult {
            prefix: network.to_string(),
            changed,
        })
    }

    pub fn remove(&mut self, path: &Path) -> Result<PathResult, ParseError> {
        let network = path_network(path)?;
        let key = (network.ip(), network.prefix());
        let changed = match self.entries.get(&key) {
            Some(entry) if entry.family == path.family => {
                self.entries.remove(&key);
                true
            }
            _ => false,
        };
        trace!(target: LogContext::RIB.target(), "Removed {} [found={}]", network, changed);
        Ok(PathResult {
            prefix: network.to_string(),
            changed,
        })
    }
}

/// Key material for a path, with host bits masked
fn path_network(path: &Path) -> Result<IpNetwork, ParseError> {
    if !path.family.matches_addr(&path.prefix) {
        return Err(ParseError::new(format!(
            "Prefix {} does not belong to family {}",
            path.prefix, path.family
        )));
    }
    let network = IpNetwork::new(path.prefix, path.prefix_len)?;
    Ok(IpNetwork::new(network.network(), network.prefix())?)
}

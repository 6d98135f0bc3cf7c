use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use jsonrpsee::{core::RpcResult, proc_macros::rpc};
use serde::{self, Deserialize, Serialize};

use crate::rib::Family;

/// AS_PATH segment type for an ordered AS_SEQUENCE
pub const AS_SEQUENCE: u8 = 2;
/// AS_PATH segment type for an unordered AS_SET
pub const AS_SET: u8 = 1;

/// Control plane of a RIB: the query/mutate surface the reconciler drives
#[rpc(client, server)]
pub trait RibApi {
    #[method(name = "get_global")]
    async fn get_global(&self) -> RpcResult<Global>;
    #[method(name = "list_path")]
    async fn list_path(&self, family: Family) -> RpcResult<Vec<Destination>>;
    #[method(name = "add_path")]
    async fn add_path(&self, path: Path) -> RpcResult<PathResult>;
    #[method(name = "delete_path")]
    async fn delete_path(&self, path: Path) -> RpcResult<PathResult>;
}

/// Global BGP config of the speaker
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Global {
    pub asn: u32,
    pub router_id: IpAddr,
    pub listen_port: u16,
}

/// Rendered as space separated `key:value` tokens
/// E.g. `asn:65000 router_id:"1.1.1.1" listen_port:179`
impl fmt::Display for Global {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "asn:{} router_id:\"{}\" listen_port:{}",
            self.asn, self.router_id, self.listen_port
        )
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct AsSegment {
    pub segment_type: u8,
    #[serde(default = "Vec::new")]
    pub numbers: Vec<u32>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PathAttrs {
    /// "igp", "egp" or "incomplete"
    pub origin: String,
    pub next_hop: IpAddr,
    #[serde(default = "Vec::new")]
    pub as_path: Vec<AsSegment>,
}

impl PathAttrs {
    /// Attributes for a locally originated route:
    /// Origin IGP, next-hop 0.0.0.0 and a single empty AS_SEQUENCE
    pub fn local() -> Self {
        Self {
            origin: "igp".to_string(),
            next_hop: IpAddr::from(Ipv4Addr::UNSPECIFIED),
            as_path: vec![AsSegment {
                segment_type: AS_SEQUENCE,
                numbers: vec![],
            }],
        }
    }
}

/// A path to add or delete, keyed by family, prefix & prefix_len
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Path {
    pub family: Family,
    pub prefix: IpAddr,
    pub prefix_len: u8,
    #[serde(flatten)]
    pub attributes: PathAttrs,
}

impl Path {
    pub fn new(family: Family, prefix: IpAddr, prefix_len: u8, attributes: PathAttrs) -> Self {
        Self {
            family,
            prefix,
            prefix_len,
            attributes,
        }
    }

    /// Path for a locally originated route
    pub fn local(family: Family, prefix: IpAddr, prefix_len: u8) -> Self {
        Self::new(family, prefix, prefix_len, PathAttrs::local())
    }
}

/// A path as held in a RIB, with its origin tag
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PathEntry {
    #[serde(flatten)]
    pub attributes: PathAttrs,
    /// ASN the path was learned from, absent for locally originated paths
    pub source_asn: Option<u32>,
    pub best: bool,
    pub age: String,
}

/// All paths for a single prefix
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Destination {
    /// Canonical CIDR, E.g. "10.0.0.0/24"
    pub prefix: String,
    pub paths: Vec<PathEntry>,
}

/// Rendered as space separated `key:value` tokens
/// E.g. `prefix:"10.0.0.0/24" paths:{origin:igp next_hop:"0.0.0.0" source_asn:65000 best:true}`
impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "prefix:\"{}\"", self.prefix)?;
        for path in &self.paths {
            write!(
                f,
                " paths:{{origin:{} next_hop:\"{}\"",
                path.attributes.origin, path.attributes.next_hop
            )?;
            if let Some(asn) = path.source_asn {
                write!(f, " source_asn:{}", asn)?;
            }
            write!(f, " best:{}}}", path.best)?;
        }
        Ok(())
    }
}

/// Acknowledgement for an add/delete
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PathResult {
    pub prefix: String,
    /// Whether the RIB was modified (false for re-adds & deletes of unknown paths)
    pub changed: bool,
}

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use log::{debug, info};

use super::rpc::{Destination, Global, Path, PathResult, RibApiClient};
use super::RibError;
use crate::logging::LogContext;
use crate::rib::Family;

/// Upper bound for any single RIB call made through the HTTP transport.
/// Callers with tighter deadlines (list paths) wrap calls themselves.
const REQUEST_TIMEOUT_MS: u64 = 5000;

/// Query/mutate surface of a RIB, as consumed by the reconciler
#[async_trait::async_trait]
pub trait RibControl: Send + Sync {
    /// Global BGP config of the speaker
    async fn global(&self) -> Result<Global, RibError>;
    /// Paths in the local table for a given family
    async fn list_paths(&self, family: Family) -> Result<Vec<Destination>, RibError>;
    async fn add_path(&self, path: Path) -> Result<PathResult, RibError>;
    async fn delete_path(&self, path: Path) -> Result<PathResult, RibError>;
}

/// JSON-RPC client for a RIB service
pub struct RibClient {
    addr: SocketAddr,
    client: HttpClient,
}

impl RibClient {
    pub fn connect(addr: SocketAddr) -> Result<Self, RibError> {
        let client = HttpClientBuilder::default()
            .request_timeout(Duration::from_millis(REQUEST_TIMEOUT_MS))
            .build(format!("http://{}", addr))?;
        debug!(target: LogContext::RIB.target(), "RIB client created for {}", addr);
        Ok(Self { addr, client })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Release the connection pool to the RIB service
    pub fn close(self) {
        info!(target: LogContext::RIB.target(), "Closing RIB connection to {}", self.addr);
        drop(self.client);
    }
}

impl fmt::Display for RibClient {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<RibClient {}>", self.addr)
    }
}

#[async_trait::async_trait]
impl RibControl for RibClient {
    async fn global(&self) -> Result<Global, RibError> {
        Ok(self.client.get_global().await?)
    }

    async fn list_paths(&self, family: Family) -> Result<Vec<Destination>, RibError> {
        Ok(self.client.list_path(family).await?)
    }

    async fn add_path(&self, path: Path) -> Result<PathResult, RibError> {
        Ok(RibApiClient::add_path(&self.client, path).await?)
    }

    async fn delete_path(&self, path: Path) -> Result<PathResult, RibError> {
        Ok(RibApiClient::delete_path(&self.client, path).await?)
    }
}

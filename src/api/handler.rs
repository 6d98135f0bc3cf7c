use std::net::SocketAddr;
use std::sync::Arc;

use jsonrpsee::core::{Error, RpcResult};
use jsonrpsee::http_server::{HttpServerBuilder, HttpServerHandle};
use log::{debug, info, warn};
use tokio::sync::RwLock;

use super::rpc::{Destination, Global, Path, PathResult, RibApiServer};
use super::RibError;
use crate::logging::LogContext;
use crate::rib::{Family, RIB};

/// Serves a local RIB over JSON-RPC
#[derive(Clone)]
pub struct RibService {
    rib: Arc<RwLock<RIB>>,
}

impl RibService {
    pub fn new(rib: RIB) -> Self {
        Self {
            rib: Arc::new(RwLock::new(rib)),
        }
    }

    pub fn rib(&self) -> Arc<RwLock<RIB>> {
        Arc::clone(&self.rib)
    }
}

#[async_trait::async_trait]
impl RibApiServer for RibService {
    async fn get_global(&self) -> RpcResult<Global> {
        Ok(self.rib.read().await.global().clone())
    }

    async fn list_path(&self, family: Family) -> RpcResult<Vec<Destination>> {
        let rib = self.rib.read().await;
        Ok(rib.get_routes(family))
    }

    async fn add_path(&self, path: Path) -> RpcResult<PathResult> {
        let mut rib = self.rib.write().await;
        match rib.insert(&path) {
            Ok(result) => {
                debug!(target: LogContext::RIB.target(), "Added path {} [{} entries]", result.prefix, rib.len());
                Ok(result)
            }
            Err(err) => {
                warn!(target: LogContext::RIB.target(), "Rejected add_path: {}", err);
                Err(Error::Custom(err.to_string()))
            }
        }
    }

    async fn delete_path(&self, path: Path) -> RpcResult<PathResult> {
        let mut rib = self.rib.write().await;
        match rib.remove(&path) {
            Ok(result) => {
                debug!(target: LogContext::RIB.target(), "Deleted path {} [{} entries]", result.prefix, rib.len());
                Ok(result)
            }
            Err(err) => {
                warn!(target: LogContext::RIB.target(), "Rejected delete_path: {}", err);
                Err(Error::Custom(err.to_string()))
            }
        }
    }
}

/// Start the JSON-RPC server for a local RIB
/// Returns the bound address (useful when binding port 0) and the server handle
pub async fn serve_rpc_api(
    service: RibService,
    socket: SocketAddr,
) -> Result<(SocketAddr, HttpServerHandle), RibError> {
    let server = HttpServerBuilder::default().build(socket).await?;
    let local_addr = server.local_addr()?;
    info!(target: LogContext::RIB.target(), "Starting RIB JSON-RPC server on {}...", local_addr);
    let handle = server.start(service.into_rpc())?;
    Ok((local_addr, handle))
}

/// Stop the JSON-RPC server and wait for its task to finish
pub async fn stop_rpc_api(handle: HttpServerHandle) -> Result<(), RibError> {
    let task = handle.stop()?;
    task.await
        .map_err(|err| RibError::Transport(format!("RIB server task failed: {}", err)))?;
    info!(target: LogContext::RIB.target(), "RIB JSON-RPC server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{RibClient, RibControl};
    use std::net::IpAddr;

    fn service() -> RibService {
        RibService::new(RIB::new(Global {
            asn: 65000,
            router_id: IpAddr::from([1, 1, 1, 1]),
            listen_port: 179,
        }))
    }

    #[tokio::test]
    async fn test_serve_and_stop() {
        let (addr, handle) = serve_rpc_api(service(), "127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        assert_ne!(addr.port(), 0);
        let global = RibClient::connect(addr).unwrap().global().await.unwrap();
        assert_eq!(global.asn, 65000);

        stop_rpc_api(handle).await.unwrap();
        // Listener is gone once the server task has finished
        let client = RibClient::connect(addr).unwrap();
        assert!(client.global().await.is_err());
    }
}

use std::io::{Error, ErrorKind, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;

use futures::future::FutureExt;
use futures::{pin_mut, select};
use log::{debug, error, info, warn};
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tokio::sync::{mpsc, watch};

use crate::api::{serve_rpc_api, stop_rpc_api, RibClient, RibService};
use crate::config::{self, Config};
use crate::health::{HealthMonitor, HealthStatus};
use crate::logging::LogContext;
use crate::reconcile::Reconciler;
use crate::rib::RIB;
use crate::routes::{CommandReader, RouteSource};

/// Which RIB the reconciler drives
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// An already running RIB service
    Client,
    /// A RIB served from this process
    Server,
}

/// Run the daemon until SIGINT/SIGTERM
///
/// Only startup failures are returned: an unreachable RIB, or a RIB
/// service that can't bind.
pub async fn serve(role: Role, config_path: Option<String>, config: Config) -> Result<()> {
    let (config_tx, config_rx) = watch::channel(Arc::new(config.clone()));

    let server = match role {
        Role::Server => {
            let global = config.rib.clone().ok_or_else(|| {
                Error::new(ErrorKind::InvalidInput, "Server mode requires a [rib] config section")
            })?;
            let service = RibService::new(RIB::new(global));
            Some(serve_rpc_api(service, config.api).await?)
        }
        Role::Client => None,
    };
    let api: SocketAddr = server.as_ref().map(|(addr, _)| *addr).unwrap_or(config.api);

    let client = RibClient::connect(api)?;
    info!("Connected to RIB at {}", client.addr());
    let reconciler = match Reconciler::new(client, LogContext::RECONCILE).await {
        Ok(reconciler) => reconciler,
        Err(err) => {
            error!("Failed to get global config from {}: {}", api, err);
            return Err(err.into());
        }
    };

    // Latest value only: a new scan or check overwrites one not yet reconciled
    let (routes_tx, mut routes_rx) = watch::channel(Vec::new());
    let (health_tx, mut health_rx) = watch::channel(HealthStatus::FAILED);
    let source = RouteSource::new(CommandReader::new(), config_rx.clone(), LogContext::ROUTES);
    let monitor = HealthMonitor::new(config_rx, LogContext::HEALTH);
    let producers = vec![
        tokio::spawn(source.run(routes_tx)),
        tokio::spawn(monitor.run(health_tx)),
    ];

    let mut signals = listen_for_signals()?;
    {
        let reconcile = reconciler.run(&mut routes_rx, &mut health_rx).fuse();
        pin_mut!(reconcile);
        loop {
            let next_signal = signals.recv().fuse();
            pin_mut!(next_signal);
            select! {
                _ = reconcile => break,
                signal = next_signal => match signal {
                    Some(SIGHUP) => reload_config(config_path.as_deref(), &config_tx),
                    Some(signal) => {
                        info!("Received signal {}, stopping...", signal);
                        break;
                    }
                    None => break,
                },
            }
        }
    }

    for producer in producers {
        producer.abort();
    }
    reconciler.into_rib().close();
    if let Some((addr, handle)) = server {
        info!("Stopping RIB service on {}", addr);
        if let Err(err) = stop_rpc_api(handle).await {
            warn!("RIB service didn't stop cleanly: {}", err);
        }
    }
    Ok(())
}

/// Forward process signals into the runtime
fn listen_for_signals() -> Result<mpsc::UnboundedReceiver<i32>> {
    let mut signals = Signals::new(&[SIGHUP, SIGINT, SIGTERM])?;
    let (tx, rx) = mpsc::unbounded_channel();
    thread::spawn(move || {
        for signal in signals.forever() {
            if tx.send(signal).is_err() {
                break;
            }
        }
    });
    Ok(rx)
}

/// Re-read the config file and hand it to the producers for their next cycle
fn reload_config(path: Option<&str>, config_tx: &watch::Sender<Arc<Config>>) {
    let path = match path {
        Some(path) => path,
        None => {
            warn!("Received SIGHUP, but no config file to reload");
            return;
        }
    };
    match config::from_file(path) {
        Ok(new_config) => {
            debug!("Reloaded config from {}", path);
            if config_tx.send(Arc::new(new_config)).is_err() {
                warn!("No tasks left to receive the new config");
            } else {
                info!("Applied config from {}", path);
            }
        }
        Err(err) => error!("Ignoring config {}: {}", path, err),
    }
}

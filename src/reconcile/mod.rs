//! Keeps the RIB's locally originated routes in line with what the
//! router intercepts, withdrawing everything while the health check fails.

mod asn;
mod plan;

pub use asn::resolve_local_asn;
pub use plan::{effective, plan, Plan};

use std::fmt;
use std::time::{Duration, Instant};

use log::{debug, error, info, trace, warn};
use tokio::sync::watch;
use tokio::time::timeout;

use crate::api::{Path, RibControl, RibError};
use crate::health::HealthStatus;
use crate::logging::LogContext;
use crate::rib::Family;
use crate::utils::{format_cycle_duration, parse_cidr, split_prefix};

/// Deadline for reading the local table each pass
pub const LIST_PATH_DEADLINE: Duration = Duration::from_secs(1);

/// Outcome of a single reconcile pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub added: usize,
    pub deleted: usize,
    pub failed: usize,
}

impl fmt::Display for PassSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} added, {} deleted, {} failed",
            self.added, self.deleted, self.failed
        )
    }
}

pub struct Reconciler<R> {
    rib: R,
    family: Family,
    local_asn: String,
    log: LogContext,
}

impl<R> Reconciler<R>
where
    R: RibControl,
{
    /// Resolve the speaker's own ASN, used to tell local routes from learned ones
    pub async fn new(rib: R, log: LogContext) -> Result<Self, RibError> {
        let global = rib.global().await?;
        debug!(target: log.target(), "Global config: {}", global);
        let local_asn = resolve_local_asn(&global.to_string());
        info!(target: log.target(), "Local ASN: {}", local_asn);
        Ok(Self {
            rib,
            family: Family::ipv4_unicast(),
            local_asn,
            log,
        })
    }

    pub fn local_asn(&self) -> &str {
        &self.local_asn
    }

    /// Hand back the RIB connection, E.g. to close it on shutdown
    pub fn into_rib(self) -> R {
        self.rib
    }

    /// Prefixes in the local table that this speaker originated
    pub async fn current_prefixes(&self) -> Result<Vec<String>, RibError> {
        let destinations = timeout(LIST_PATH_DEADLINE, self.rib.list_paths(self.family))
            .await
            .map_err(|_| RibError::DeadlineExceeded(LIST_PATH_DEADLINE))??;
        let current = destinations
            .into_iter()
            .filter(|destination| {
                let text = destination.to_string();
                trace!(target: self.log.target(), "{}", text);
                let asn = resolve_local_asn(&text);
                asn == self.local_asn || asn.is_empty()
            })
            .map(|destination| destination.prefix)
            .collect();
        Ok(current)
    }

    /// One fetch, diff, apply pass
    ///
    /// A failed RIB read skips the pass entirely; individual add/delete
    /// failures are counted and logged but never stop the rest.
    pub async fn reconcile(
        &self,
        desired: &[String],
        health: HealthStatus,
    ) -> Result<PassSummary, RibError> {
        let desired: Vec<String> = desired
            .iter()
            .filter(|prefix| match parse_cidr(prefix) {
                Some(network) if !self.family.matches_network(&network) => {
                    debug!(target: self.log.target(), "Skipping {}, not {}", prefix, self.family);
                    false
                }
                _ => true,
            })
            .cloned()
            .collect();
        if !health.is_healthy() {
            warn!(target: self.log.target(), "Health check {}, withdrawing all routes", health);
        }

        let current = self.current_prefixes().await?;
        debug!(target: self.log.target(), "current local route list: {:?}", current);
        debug!(target: self.log.target(), "proposed local route list: {:?}", effective(&desired, health));

        let plan = plan(&desired, health, &current);
        Ok(self.apply(&plan).await)
    }

    /// Add then delete, one RIB call per prefix
    pub async fn apply(&self, plan: &Plan) -> PassSummary {
        let started = Instant::now();
        let mut summary = PassSummary::default();

        for prefix in &plan.to_add {
            debug!(target: self.log.target(), "prefix: {} will be added", prefix);
            match self.path_for(prefix) {
                Some(path) => match self.rib.add_path(path).await {
                    Ok(_) => summary.added += 1,
                    Err(err) => {
                        error!(target: self.log.target(), "Failed to add {}: {}", prefix, err);
                        summary.failed += 1;
                    }
                },
                None => summary.failed += 1,
            }
        }

        for prefix in &plan.to_delete {
            debug!(target: self.log.target(), "prefix: {} will be deleted", prefix);
            match self.path_for(prefix) {
                Some(path) => match self.rib.delete_path(path).await {
                    Ok(_) => summary.deleted += 1,
                    Err(err) => {
                        error!(target: self.log.target(), "Failed to delete {}: {}", prefix, err);
                        summary.failed += 1;
                    }
                },
                None => summary.failed += 1,
            }
        }

        info!(
            target: self.log.target(),
            "update global table: duration {}",
            format_cycle_duration(started.elapsed())
        );
        summary
    }

    fn path_for(&self, prefix: &str) -> Option<Path> {
        match split_prefix(prefix) {
            Ok((addr, len)) => Some(Path::local(self.family, addr, len)),
            Err(err) => {
                error!(target: self.log.target(), "Skipping '{}': {}", prefix, err);
                None
            }
        }
    }

    /// Reconcile each time both a new route set and a new health status are
    /// published, until either producer goes away
    ///
    /// Only the latest value of each is read; anything published while a
    /// pass was running is superseded.
    pub async fn run(
        &self,
        routes: &mut watch::Receiver<Vec<String>>,
        health: &mut watch::Receiver<HealthStatus>,
    ) {
        loop {
            if routes.changed().await.is_err() {
                break;
            }
            let desired = routes.borrow_and_update().clone();
            if health.changed().await.is_err() {
                break;
            }
            let status = *health.borrow_and_update();
            debug!(target: self.log.target(), "Health status {}", status.0);
            match self.reconcile(&desired, status).await {
                Ok(summary) if summary.added + summary.deleted + summary.failed > 0 => {
                    info!(target: self.log.target(), "Reconciled: {}", summary)
                }
                Ok(_) => trace!(target: self.log.target(), "RIB already in sync"),
                Err(err) => error!(target: self.log.target(), "Skipping pass, {}", err),
            }
        }
        debug!(target: self.log.target(), "Inputs closed, reconciler stopping");
    }
}

//! Removal of leftover cluster containers
//!
//! kind does not reliably create a cluster while containers from a previous
//! instance with the same name are still around, so every container carrying
//! the cluster's ownership label is force-removed before recreation.

use std::sync::Arc;

use tracing::{debug, info};

use localdev_common::Result;

use crate::runtime::ContainerRuntime;
use crate::topology::ClusterIdentity;

/// Force-removes every container that belongs to a cluster identity
pub struct StaleResourceReaper {
    identity: ClusterIdentity,
    runtime: Arc<dyn ContainerRuntime>,
}

impl StaleResourceReaper {
    /// Create a reaper for the given identity
    pub fn new(identity: ClusterIdentity, runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { identity, runtime }
    }

    /// Remove all labeled containers, running or not.
    ///
    /// Returns the number of containers removed. Stops at the first removal
    /// that fails.
    pub async fn reap(&self) -> Result<usize> {
        let containers = self
            .runtime
            .list_containers(&self.identity.ownership_label())
            .await?;

        if containers.is_empty() {
            debug!(cluster = %self.identity, "no stale containers to remove");
            return Ok(0);
        }

        for container in &containers {
            self.runtime.remove_container(&container.id).await?;
            debug!(
                cluster = %self.identity,
                container = container.name().unwrap_or(&container.id),
                "removed stale container"
            );
        }

        info!(
            cluster = %self.identity,
            count = containers.len(),
            "removed stale cluster containers"
        );
        Ok(containers.len())
    }
}

//! `localdev down` - remove the local cluster
//!
//! Force-removes every container labeled for the cluster and deletes its
//! kubeconfig, leaving nothing for the next `localdev up` to trip over.

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use clap::Args;
use tracing::info;

use localdev_common::Error;

use crate::commands::{ClusterArgs, Result};
use crate::reaper::StaleResourceReaper;
use crate::runtime::DockerRuntime;

/// Remove the local cluster
#[derive(Args, Debug)]
pub struct DownArgs {
    /// Cluster selection
    #[command(flatten)]
    pub cluster: ClusterArgs,
}

/// Run the down command
pub async fn run(args: DownArgs) -> Result<()> {
    let config = args.cluster.resolve()?;
    let identity = config.identity()?;
    let runtime = DockerRuntime::connect().await?;

    let removed = StaleResourceReaper::new(identity.clone(), Arc::new(runtime))
        .reap()
        .await?;
    let kubeconfig_removed = remove_kubeconfig(identity.kubeconfig_path())?;

    info!(cluster = %identity, containers = removed, kubeconfig_removed, "cluster removed");
    println!("Cluster {} removed ({} containers).", identity, removed);
    Ok(())
}

/// Delete the kubeconfig; returns false if there was none
fn remove_kubeconfig(path: &Path) -> localdev_common::Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::kubeconfig(path, format!("failed to remove: {}", e))),
    }
}

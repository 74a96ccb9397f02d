//! `localdev up` - ensure the local cluster exists and is ready
//!
//! Reuses a healthy cluster as is. Anything else (missing kubeconfig,
//! stopped containers, wrong node count, a node not ready) leads to a full
//! recreation: stale containers are removed, kind creates a 4-node cluster,
//! the ingress controller is installed and the command waits for every node.
//!
//! # Usage
//!
//! ```bash
//! localdev up
//! localdev up --name tails --timeout 180
//! LOCALDEV_NODE_IMAGE=kindest/node:v1.32.0 localdev up
//! ```

use clap::Args;
use tracing::info;

use crate::commands::{cancel_on_ctrl_c, connect_collaborators, ClusterArgs, Result};
use crate::config::LocalDevConfig;
use crate::ingress::INGRESS_HTTP_PORT;
use crate::preflight;
use crate::provisioner::{ClusterProvisioner, Provisioned};
use crate::topology::TopologySpec;

/// Create or reuse the local cluster
#[derive(Args, Debug)]
pub struct UpArgs {
    /// Cluster selection
    #[command(flatten)]
    pub cluster: ClusterArgs,

    /// Seconds to wait for every node to become ready
    #[arg(long, env = "LOCALDEV_READY_TIMEOUT")]
    pub timeout: Option<u64>,

    /// kind node image
    #[arg(long, env = "LOCALDEV_NODE_IMAGE")]
    pub node_image: Option<String>,
}

impl UpArgs {
    fn resolve(&self) -> localdev_common::Result<LocalDevConfig> {
        let mut config = self.cluster.resolve()?;
        if let Some(secs) = self.timeout {
            config.ready_timeout_secs = secs;
        }
        if let Some(image) = &self.node_image {
            config.node_image = Some(image.clone());
        }
        Ok(config)
    }
}

/// Run the up command
pub async fn run(args: UpArgs) -> Result<()> {
    let config = args.resolve()?;
    let identity = config.identity()?;
    let settings = config.provision_settings()?;

    preflight::check_prerequisites(&preflight::required_tools(
        &config.kind_binary,
        &config.kubectl_binary,
    ))?;

    let provisioner = ClusterProvisioner::new(
        identity.clone(),
        TopologySpec::local_dev(),
        settings,
        connect_collaborators(&config).await?,
    )
    .with_cancellation(cancel_on_ctrl_c());

    match provisioner.ensure_cluster().await? {
        Provisioned::Reused => info!(cluster = %identity, "cluster already up"),
        Provisioned::Created { previous, reaped } => info!(
            cluster = %identity,
            %previous,
            reaped,
            "cluster created"
        ),
    }

    println!("Cluster {} is ready.", identity);
    println!(
        "  export KUBECONFIG={}",
        identity.kubeconfig_path().display()
    );
    println!(
        "  Ingress listens on port {} of every node (host network)",
        INGRESS_HTTP_PORT
    );
    Ok(())
}

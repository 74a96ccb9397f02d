//! `localdev kubeconfig` - print the cluster's kubeconfig path
//!
//! ```bash
//! export KUBECONFIG=$(localdev kubeconfig)
//! ```

use clap::Args;

use crate::commands::{ClusterArgs, Result};

/// Print where the cluster's kubeconfig lives
#[derive(Args, Debug)]
pub struct KubeconfigArgs {
    /// Cluster selection
    #[command(flatten)]
    pub cluster: ClusterArgs,
}

/// Run the kubeconfig command
pub async fn run(args: KubeconfigArgs) -> Result<()> {
    let identity = args.cluster.resolve()?.identity()?;
    println!("{}", identity.kubeconfig_path().display());
    Ok(())
}

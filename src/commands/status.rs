//! `localdev status` - report whether the local cluster can be used
//!
//! Only inspects; nothing is created or removed. Exits non-zero unless the
//! cluster is healthy so scripts can gate on it.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;

use crate::cluster_api::KubeConnector;
use crate::commands::{ClusterArgs, Result};
use crate::inspector::{ClusterHealthVerdict, ClusterInspector};
use crate::runtime::DockerRuntime;
use crate::topology::TopologySpec;

/// Inspect the local cluster
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Cluster selection
    #[command(flatten)]
    pub cluster: ClusterArgs,
}

/// Run the status command
pub async fn run(args: StatusArgs) -> Result<ExitCode> {
    let config = args.cluster.resolve()?;
    let identity = config.identity()?;
    let runtime = DockerRuntime::connect().await?;

    let inspector = ClusterInspector::new(
        identity.clone(),
        TopologySpec::local_dev(),
        Arc::new(runtime),
        Arc::new(KubeConnector),
    );
    let verdict = inspector.inspect().await;

    println!("{}: {}", identity, verdict);
    Ok(ExitCode::from(exit_status(&verdict)))
}

/// 0 healthy, 1 degraded, 2 absent
fn exit_status(verdict: &ClusterHealthVerdict) -> u8 {
    match verdict {
        ClusterHealthVerdict::Healthy => 0,
        ClusterHealthVerdict::Degraded { .. } => 1,
        ClusterHealthVerdict::Absent { .. } => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_healthy_exits_zero() {
        assert_eq!(exit_status(&ClusterHealthVerdict::Healthy), 0);
        assert_eq!(
            exit_status(&ClusterHealthVerdict::degraded("a node was not ready")),
            1
        );
        assert_eq!(
            exit_status(&ClusterHealthVerdict::absent("cluster not initialized")),
            2
        );
    }
}

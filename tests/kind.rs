//! End-to-end tests against a real Docker daemon and kind
//!
//! These tests create and destroy an actual 4-node cluster, so they are
//! ignored by default and can be run with:
//!
//! ```bash
//! cargo test --test kind -- --ignored --nocapture
//! ```
//!
//! `docker`, `kind` and `kubectl` must be on PATH. The cluster is named
//! "localdev-e2e" so it never touches a developer's own cluster, and its
//! kubeconfig lives in a temporary directory.

use std::sync::Arc;
use std::time::Duration;

use localdev::cluster_api::KubeConnector;
use localdev::ingress::KubectlApply;
use localdev::kind::KindCli;
use localdev::preflight;
use localdev::provisioner::{Collaborators, ProvisionSettings};
use localdev::runtime::DockerRuntime;
use localdev::{
    ClusterHealthVerdict, ClusterIdentity, ClusterProvisioner, Provisioned, StaleResourceReaper,
    TopologySpec,
};

const E2E_CLUSTER: &str = "localdev-e2e";

async fn provisioner(identity: &ClusterIdentity) -> ClusterProvisioner {
    let runtime = DockerRuntime::connect()
        .await
        .expect("docker daemon should be reachable");
    ClusterProvisioner::new(
        identity.clone(),
        TopologySpec::local_dev(),
        ProvisionSettings {
            ready_timeout: Duration::from_secs(300),
            ..ProvisionSettings::default()
        },
        Collaborators {
            runtime: Arc::new(runtime),
            connector: Arc::new(KubeConnector),
            creator: Arc::new(KindCli::default()),
            bootstrapper: Arc::new(KubectlApply::default()),
        },
    )
}

async fn reap(identity: &ClusterIdentity) -> usize {
    let runtime = DockerRuntime::connect()
        .await
        .expect("docker daemon should be reachable");
    StaleResourceReaper::new(identity.clone(), Arc::new(runtime))
        .reap()
        .await
        .expect("reaping should succeed")
}

// ==========================================================================
// Story: A developer brings the cluster up, reuses it, then tears it down
// ==========================================================================

#[tokio::test]
#[ignore]
async fn cluster_is_created_reused_and_reaped() {
    preflight::check_prerequisites(&preflight::required_tools(
        std::path::Path::new("kind"),
        std::path::Path::new("kubectl"),
    ))
    .expect("docker, kind and kubectl should be installed");

    let dir = tempfile::tempdir().expect("tempdir should be created");
    let identity =
        ClusterIdentity::with_kubeconfig(E2E_CLUSTER, dir.path().join("kind-config-e2e"))
            .expect("valid identity");

    // Leftovers from an aborted earlier run
    reap(&identity).await;

    let first = provisioner(&identity)
        .await
        .ensure_cluster()
        .await
        .expect("first run should create the cluster");
    assert!(matches!(first, Provisioned::Created { .. }));

    let provisioner = provisioner(&identity).await;
    assert_eq!(provisioner.inspect().await, ClusterHealthVerdict::Healthy);
    assert_eq!(
        provisioner
            .ensure_cluster()
            .await
            .expect("second run should reuse the cluster"),
        Provisioned::Reused
    );

    assert_eq!(reap(&identity).await, 4);
    assert!(matches!(
        provisioner.inspect().await,
        ClusterHealthVerdict::Degraded { .. }
    ));
}

//! Cluster provisioning state machine
//!
//! ```text
//! Inspecting ──healthy──────────────────────────────────────────────► Done
//!     │
//!     └─► Reaping ─► Creating ─► BootstrappingNetwork ─► Converging ─► Done
//!            │          │                 │                   │
//!            └──────────┴─────────────────┴───────────────────┴─────► Failed
//! ```
//!
//! The machine only moves forward. Any phase failure ends the attempt; the
//! caller retries by calling [`ClusterProvisioner::ensure_cluster`] again,
//! which starts over from inspection.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use localdev_common::kube_utils::{self, ReadinessPolicy};
use localdev_common::Error;

use crate::cluster_api::ApiConnector;
use crate::ingress::{NetworkBootstrapper, INGRESS_CONTROLLER_MANIFEST};
use crate::inspector::{ClusterHealthVerdict, ClusterInspector};
use crate::kind::{ClusterCreator, CreateOptions};
use crate::reaper::StaleResourceReaper;
use crate::runtime::ContainerRuntime;
use crate::topology::{ClusterIdentity, KindClusterConfig, TopologySpec};
use crate::waiter::{ClusterConvergenceWaiter, DEFAULT_POLL_INTERVAL};

/// How long a new cluster gets to report every node ready
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(90);

/// States of one provisioning attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProvisionState {
    /// Checking whether the existing cluster can be reused
    Inspecting,
    /// Removing containers of a previous cluster
    Reaping,
    /// Creating the cluster
    Creating,
    /// Installing the ingress controller
    BootstrappingNetwork,
    /// Waiting for every node to become ready
    Converging,
    /// Cluster is usable
    Done,
    /// The attempt was aborted
    Failed,
}

impl fmt::Display for ProvisionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProvisionState::Inspecting => "Inspecting",
            ProvisionState::Reaping => "Reaping",
            ProvisionState::Creating => "Creating",
            ProvisionState::BootstrappingNetwork => "BootstrappingNetwork",
            ProvisionState::Converging => "Converging",
            ProvisionState::Done => "Done",
            ProvisionState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// Phases that can fail a provisioning attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProvisionPhase {
    /// Stale container removal
    Reaping,
    /// Cluster creation
    Creating,
    /// Ingress controller installation
    BootstrappingNetwork,
    /// Waiting for node readiness
    Converging,
}

impl ProvisionPhase {
    /// The state this phase runs in
    pub fn state(self) -> ProvisionState {
        match self {
            ProvisionPhase::Reaping => ProvisionState::Reaping,
            ProvisionPhase::Creating => ProvisionState::Creating,
            ProvisionPhase::BootstrappingNetwork => ProvisionState::BootstrappingNetwork,
            ProvisionPhase::Converging => ProvisionState::Converging,
        }
    }
}

impl fmt::Display for ProvisionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.state().fmt(f)
    }
}

/// A provisioning attempt failed in `phase`
#[derive(Debug, Error)]
#[error("{phase}: {source}")]
pub struct ProvisionError {
    /// Where the attempt stopped
    pub phase: ProvisionPhase,
    /// What went wrong
    #[source]
    pub source: Error,
}

impl ProvisionError {
    fn new(phase: ProvisionPhase, source: Error) -> Self {
        Self { phase, source }
    }
}

/// Successful outcome of [`ClusterProvisioner::ensure_cluster`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provisioned {
    /// The existing cluster was healthy and left untouched
    Reused,
    /// A new cluster was created
    Created {
        /// Why the previous cluster could not be reused
        previous: ClusterHealthVerdict,
        /// Number of stale containers removed first
        reaped: usize,
    },
}

/// Tunables of a provisioning attempt
#[derive(Clone, Debug)]
pub struct ProvisionSettings {
    /// Budget for the convergence wait
    pub ready_timeout: Duration,
    /// Interval between node polls while converging
    pub poll_interval: Duration,
    /// Node image override handed to kind
    pub node_image: Option<String>,
    /// Node readiness policy used by inspection and convergence
    pub readiness: ReadinessPolicy,
}

impl Default for ProvisionSettings {
    fn default() -> Self {
        Self {
            ready_timeout: DEFAULT_READY_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            node_image: None,
            readiness: kube_utils::last_ready_condition_wins,
        }
    }
}

/// External systems the provisioner drives
#[derive(Clone)]
pub struct Collaborators {
    /// Container runtime (inspection and reaping)
    pub runtime: Arc<dyn ContainerRuntime>,
    /// Cluster API client factory
    pub connector: Arc<dyn ApiConnector>,
    /// Cluster creation tool
    pub creator: Arc<dyn ClusterCreator>,
    /// Network bootstrap tool
    pub bootstrapper: Arc<dyn NetworkBootstrapper>,
}

/// Ensures a healthy local cluster exists, recreating it when necessary
pub struct ClusterProvisioner {
    identity: ClusterIdentity,
    topology: TopologySpec,
    settings: ProvisionSettings,
    inspector: ClusterInspector,
    reaper: StaleResourceReaper,
    connector: Arc<dyn ApiConnector>,
    creator: Arc<dyn ClusterCreator>,
    bootstrapper: Arc<dyn NetworkBootstrapper>,
    cancel: CancellationToken,
}

impl ClusterProvisioner {
    /// Wire a provisioner for one cluster identity
    pub fn new(
        identity: ClusterIdentity,
        topology: TopologySpec,
        settings: ProvisionSettings,
        collaborators: Collaborators,
    ) -> Self {
        let inspector = ClusterInspector::new(
            identity.clone(),
            topology.clone(),
            collaborators.runtime.clone(),
            collaborators.connector.clone(),
        )
        .with_readiness_policy(settings.readiness);
        let reaper = StaleResourceReaper::new(identity.clone(), collaborators.runtime);

        Self {
            identity,
            topology,
            settings,
            inspector,
            reaper,
            connector: collaborators.connector,
            creator: collaborators.creator,
            bootstrapper: collaborators.bootstrapper,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort the convergence wait when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Inspect without changing anything
    pub async fn inspect(&self) -> ClusterHealthVerdict {
        self.inspector.inspect().await
    }

    /// Reuse the cluster if healthy, otherwise recreate it and wait for it
    pub async fn ensure_cluster(&self) -> Result<Provisioned, ProvisionError> {
        self.enter(ProvisionState::Inspecting);
        let verdict = self.inspector.inspect().await;
        match &verdict {
            ClusterHealthVerdict::Healthy => {
                info!(cluster = %self.identity, "existing cluster is healthy, reusing it");
                self.enter(ProvisionState::Done);
                return Ok(Provisioned::Reused);
            }
            ClusterHealthVerdict::Degraded { reason } => {
                warn!(cluster = %self.identity, %reason, "existing cluster cannot be used, recreating it");
            }
            ClusterHealthVerdict::Absent { reason } => {
                info!(cluster = %self.identity, %reason, "no usable cluster, creating one");
            }
        }

        match self.recreate().await {
            Ok(reaped) => {
                self.enter(ProvisionState::Done);
                Ok(Provisioned::Created {
                    previous: verdict,
                    reaped,
                })
            }
            Err(e) => {
                warn!(cluster = %self.identity, phase = %e.phase, error = %e.source, "provisioning failed");
                self.enter(ProvisionState::Failed);
                Err(e)
            }
        }
    }

    /// Reaping through Converging; returns the number of containers reaped
    async fn recreate(&self) -> Result<usize, ProvisionError> {
        self.enter(ProvisionState::Reaping);
        let reaped = self
            .reaper
            .reap()
            .await
            .map_err(|e| ProvisionError::new(ProvisionPhase::Reaping, e))?;

        self.enter(ProvisionState::Creating);
        info!("this takes between 1 and 10 minutes, depending on image download speed");
        let config = KindClusterConfig::default()
            .with_topology(&self.topology, self.settings.node_image.as_deref());
        self.creator
            .create(&self.identity, &config, &CreateOptions::default())
            .await
            .map_err(|e| ProvisionError::new(ProvisionPhase::Creating, e))?;

        self.enter(ProvisionState::BootstrappingNetwork);
        self.bootstrapper
            .apply(self.identity.kubeconfig_path(), INGRESS_CONTROLLER_MANIFEST)
            .await
            .map_err(|e| ProvisionError::new(ProvisionPhase::BootstrappingNetwork, e))?;

        self.enter(ProvisionState::Converging);
        let nodes = self
            .connector
            .connect(self.identity.kubeconfig_path())
            .await
            .map_err(|e| {
                ProvisionError::new(
                    ProvisionPhase::Converging,
                    Error::kubeconfig(
                        self.identity.kubeconfig_path(),
                        format!("new cluster is not reachable: {}", e),
                    ),
                )
            })?;

        info!(
            timeout_secs = self.settings.ready_timeout.as_secs(),
            "nodes provisioned, waiting for them to become ready"
        );
        ClusterConvergenceWaiter::new(nodes)
            .with_poll_interval(self.settings.poll_interval)
            .with_readiness_policy(self.settings.readiness)
            .with_cancellation(self.cancel.clone())
            .wait_until_ready(self.settings.ready_timeout)
            .await
            .map_err(|e| ProvisionError::new(ProvisionPhase::Converging, e))?;

        Ok(reaped)
    }

    fn enter(&self, state: ProvisionState) {
        info!(cluster = %self.identity, %state, "provisioning state");
    }
}

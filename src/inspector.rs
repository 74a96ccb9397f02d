//! Cluster health inspection
//!
//! Classifies an existing (or missing) cluster as Healthy, Degraded or Absent.
//! Inspection is read-only and computed fresh on every call.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use localdev_common::kube_utils::{self, ReadinessPolicy};

use crate::cluster_api::{ApiConnector, ConnectError};
use crate::runtime::ContainerRuntime;
use crate::topology::{ClusterIdentity, TopologySpec};

/// Result of inspecting the cluster
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClusterHealthVerdict {
    /// All containers running, node count matches, every node ready
    Healthy,
    /// A cluster exists but fails a health check
    Degraded {
        /// What failed
        reason: String,
    },
    /// No usable cluster (first run, or API out of reach)
    Absent {
        /// Why the cluster is considered absent
        reason: String,
    },
}

impl ClusterHealthVerdict {
    /// Degraded verdict with the given reason
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self::Degraded {
            reason: reason.into(),
        }
    }

    /// Absent verdict with the given reason
    pub fn absent(reason: impl Into<String>) -> Self {
        Self::Absent {
            reason: reason.into(),
        }
    }

    /// Whether the cluster can be reused as-is
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// Reason for a non-healthy verdict
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Healthy => None,
            Self::Degraded { reason } | Self::Absent { reason } => Some(reason),
        }
    }
}

impl fmt::Display for ClusterHealthVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded { reason } => write!(f, "degraded: {}", reason),
            Self::Absent { reason } => write!(f, "absent: {}", reason),
        }
    }
}

/// Inspects the container runtime and the cluster API
pub struct ClusterInspector {
    identity: ClusterIdentity,
    topology: TopologySpec,
    runtime: Arc<dyn ContainerRuntime>,
    connector: Arc<dyn ApiConnector>,
    readiness: ReadinessPolicy,
}

impl ClusterInspector {
    /// Create an inspector using the default readiness policy
    pub fn new(
        identity: ClusterIdentity,
        topology: TopologySpec,
        runtime: Arc<dyn ContainerRuntime>,
        connector: Arc<dyn ApiConnector>,
    ) -> Self {
        Self {
            identity,
            topology,
            runtime,
            connector,
            readiness: kube_utils::last_ready_condition_wins,
        }
    }

    /// Replace the node readiness policy
    pub fn with_readiness_policy(mut self, policy: ReadinessPolicy) -> Self {
        self.readiness = policy;
        self
    }

    /// Classify the current cluster state.
    ///
    /// The kubeconfig is checked first: without one there is no prior cluster
    /// to judge, which is the normal first-run case.
    pub async fn inspect(&self) -> ClusterHealthVerdict {
        let nodes_api = match self
            .connector
            .connect(self.identity.kubeconfig_path())
            .await
        {
            Ok(api) => api,
            Err(ConnectError::NotInitialized(detail)) => {
                debug!(cluster = %self.identity, %detail, "no kubeconfig for cluster");
                return ClusterHealthVerdict::absent("cluster not initialized");
            }
            Err(ConnectError::Unreachable(detail)) => {
                return ClusterHealthVerdict::absent(format!("API unreachable: {}", detail));
            }
        };

        if let Some(verdict) = self.check_containers().await {
            return verdict;
        }

        let nodes = match nodes_api.list_nodes().await {
            Ok(nodes) => nodes,
            Err(e) => return ClusterHealthVerdict::absent(format!("API unreachable: {}", e)),
        };

        let want = self.topology.node_count();
        if nodes.len() != want {
            return ClusterHealthVerdict::degraded(format!(
                "node count mismatch: got {} want {}",
                nodes.len(),
                want
            ));
        }

        if let Some(node) = nodes.iter().find(|n| !(self.readiness)(*n)) {
            info!(
                cluster = %self.identity,
                node = kube_utils::node_name(node),
                "node not ready; a freshly created cluster needs about 30s before it settles"
            );
            return ClusterHealthVerdict::degraded("a node was not ready");
        }

        ClusterHealthVerdict::Healthy
    }

    /// Check that every required container exists and is running
    async fn check_containers(&self) -> Option<ClusterHealthVerdict> {
        let containers = match self
            .runtime
            .list_containers(&self.identity.ownership_label())
            .await
        {
            Ok(containers) => containers,
            Err(e) => {
                return Some(ClusterHealthVerdict::degraded(format!(
                    "could not list cluster containers: {}",
                    e
                )))
            }
        };

        for required in self.topology.required_containers(&self.identity) {
            let running = containers
                .iter()
                .any(|c| c.name() == Some(required.as_str()) && c.is_running());
            if !running {
                return Some(ClusterHealthVerdict::degraded(format!(
                    "container /{} not running",
                    required
                )));
            }
        }
        None
    }
}

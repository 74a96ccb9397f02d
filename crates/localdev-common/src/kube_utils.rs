//! Shared Kubernetes utilities using kube-rs
//!
//! Node readiness evaluation, kubeconfig loading and node listing for the
//! local development cluster.

use std::path::Path;
use std::time::Duration;

use k8s_openapi::api::core::v1::{Node, NodeCondition};
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::trace;

use crate::Error;

// Kubernetes condition constants
/// The "Ready" condition type for nodes
pub const CONDITION_READY: &str = "Ready";
/// The "True" status value for conditions
pub const STATUS_TRUE: &str = "True";
/// The "False" status value for conditions
pub const STATUS_FALSE: &str = "False";

/// Default connection timeout for kube clients (5s is plenty for a local API server)
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for kube clients
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for types that have condition-like fields (type and status)
pub trait HasConditionFields {
    /// Get the condition type field value
    fn type_field(&self) -> &str;
    /// Get the condition status field value
    fn status_field(&self) -> &str;
}

impl HasConditionFields for NodeCondition {
    fn type_field(&self) -> &str {
        &self.type_
    }
    fn status_field(&self) -> &str {
        &self.status
    }
}

impl HasConditionFields for (&str, &str) {
    fn type_field(&self) -> &str {
        self.0
    }
    fn status_field(&self) -> &str {
        self.1
    }
}

/// Readiness of a single node, derived from its "Ready" condition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeReadiness {
    /// Last Ready condition is "True"
    Ready,
    /// Last Ready condition is "False"
    NotReady,
    /// No Ready condition, or a status other than True/False
    Unknown,
}

impl NodeReadiness {
    /// Whether the node can take part in a converged cluster
    pub fn is_ready(self) -> bool {
        self == NodeReadiness::Ready
    }
}

/// Derive a node's readiness from its ordered condition list.
///
/// When several "Ready" conditions are present the **last** one wins. The
/// kubelet normally reports a single Ready condition; callers that need a
/// different rule pass their own [`ReadinessPolicy`].
pub fn node_readiness<T: HasConditionFields>(conditions: &[T]) -> NodeReadiness {
    conditions
        .iter()
        .rfind(|c| c.type_field() == CONDITION_READY)
        .map(|c| match c.status_field() {
            STATUS_TRUE => NodeReadiness::Ready,
            STATUS_FALSE => NodeReadiness::NotReady,
            _ => NodeReadiness::Unknown,
        })
        .unwrap_or(NodeReadiness::Unknown)
}

/// Check whether an ordered condition list marks the node as ready
pub fn is_ready<T: HasConditionFields>(conditions: &[T]) -> bool {
    node_readiness(conditions).is_ready()
}

/// Policy deciding whether a node counts as ready.
pub type ReadinessPolicy = fn(&Node) -> bool;

/// Default readiness policy: last "Ready" condition wins
pub fn last_ready_condition_wins(node: &Node) -> bool {
    let conditions = node
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_deref())
        .unwrap_or_default();
    is_ready(conditions)
}

/// Name of a node, or `<unnamed>` for objects without metadata.name
pub fn node_name(node: &Node) -> &str {
    node.metadata.name.as_deref().unwrap_or("<unnamed>")
}

/// Read a kubeconfig file from disk
pub fn read_kubeconfig(path: &Path) -> Result<Kubeconfig, Error> {
    Kubeconfig::read_from(path)
        .map_err(|e| Error::kubeconfig(path, format!("failed to read kubeconfig: {}", e)))
}

/// Build a kube client from an already-loaded kubeconfig with default timeouts
pub async fn client_from_kubeconfig(kubeconfig: Kubeconfig, path: &Path) -> Result<Client, Error> {
    let mut config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| Error::kubeconfig(path, format!("failed to load kubeconfig: {}", e)))?;
    config.connect_timeout = Some(DEFAULT_CONNECT_TIMEOUT);
    config.read_timeout = Some(DEFAULT_READ_TIMEOUT);
    Client::try_from(config)
        .map_err(|e| Error::kubeconfig(path, format!("failed to create client: {}", e)))
}

/// Create a kube client from a kubeconfig path
pub async fn create_client(path: &Path) -> Result<Client, Error> {
    let kubeconfig = read_kubeconfig(path)?;
    client_from_kubeconfig(kubeconfig, path).await
}

/// List every node in the cluster
pub async fn list_nodes(client: &Client) -> Result<Vec<Node>, Error> {
    let nodes: Api<Node> = Api::all(client.clone());
    let list = nodes.list(&ListParams::default()).await?;
    trace!(count = list.items.len(), "listed nodes");
    Ok(list.items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::NodeStatus;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use rstest::rstest;

    fn node_with(conditions: &[(&str, &str)]) -> Node {
        Node {
            metadata: ObjectMeta {
                name: Some("sanic-worker".to_string()),
                ..Default::default()
            },
            status: Some(NodeStatus {
                conditions: Some(
                    conditions
                        .iter()
                        .map(|(t, s)| NodeCondition {
                            type_: t.to_string(),
                            status: s.to_string(),
                            ..Default::default()
                        })
                        .collect(),
                ),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    // ==========================================================================
    // Story: Node readiness is read from the Ready condition
    // ==========================================================================

    #[test]
    fn empty_condition_list_is_not_ready() {
        let conditions: [(&str, &str); 0] = [];
        assert!(!is_ready(&conditions));
        assert_eq!(node_readiness(&conditions), NodeReadiness::Unknown);
    }

    #[rstest]
    #[case::single_true(&[("Ready", "True")], NodeReadiness::Ready)]
    #[case::single_false(&[("Ready", "False")], NodeReadiness::NotReady)]
    #[case::unknown_status(&[("Ready", "Unknown")], NodeReadiness::Unknown)]
    #[case::only_pressure(&[("MemoryPressure", "False")], NodeReadiness::Unknown)]
    #[case::ready_among_others(
        &[("MemoryPressure", "False"), ("Ready", "True"), ("DiskPressure", "False")],
        NodeReadiness::Ready
    )]
    fn readiness_follows_the_ready_condition(
        #[case] conditions: &[(&str, &str)],
        #[case] expected: NodeReadiness,
    ) {
        assert_eq!(node_readiness(conditions), expected);
    }

    #[test]
    fn last_ready_condition_wins_when_duplicated() {
        assert!(!is_ready(&[("Ready", "True"), ("Ready", "False")]));
        assert!(is_ready(&[("Ready", "False"), ("Ready", "True")]));
    }

    #[test]
    fn default_policy_reads_node_status() {
        assert!(last_ready_condition_wins(&node_with(&[("Ready", "True")])));
        assert!(!last_ready_condition_wins(&node_with(&[
            ("Ready", "True"),
            ("Ready", "False")
        ])));
        assert!(!last_ready_condition_wins(&Node::default()));
    }

    #[test]
    fn node_name_falls_back_for_unnamed_nodes() {
        assert_eq!(node_name(&node_with(&[])), "sanic-worker");
        assert_eq!(node_name(&Node::default()), "<unnamed>");
    }

    // ==========================================================================
    // Story: A missing kubeconfig is reported with its path
    // ==========================================================================

    #[test]
    fn reading_missing_kubeconfig_fails_with_path() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("kind-config-sanic");
        let err = read_kubeconfig(&path).expect_err("missing file should not parse");
        match err {
            Error::Kubeconfig { path: p, .. } => assert_eq!(p, path),
            other => panic!("expected Kubeconfig error, got {other:?}"),
        }
    }
}

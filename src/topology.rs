//! Cluster identity and node topology
//!
//! The kind config handed to the creation tool and the container names
//! checked during inspection are both derived from [`TopologySpec`].

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use localdev_common::{Error, Result, KIND_CLUSTER_LABEL};

/// kind config `kind` field
pub const KIND_CONFIG_KIND: &str = "Cluster";
/// kind config `apiVersion` field
pub const KIND_CONFIG_API_VERSION: &str = "kind.x-k8s.io/v1alpha4";

/// Identity of one local cluster: its name and kubeconfig location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterIdentity {
    name: String,
    kubeconfig_path: PathBuf,
}

impl ClusterIdentity {
    /// Identity with the default kubeconfig location `~/.kube/kind-config-<name>`
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let home = dirs::home_dir()
            .ok_or_else(|| Error::config("could not determine home directory"))?;
        let kubeconfig_path = default_kubeconfig_path(&home, &name);
        Self::with_kubeconfig(name, kubeconfig_path)
    }

    /// Identity with an explicit kubeconfig location
    pub fn with_kubeconfig(
        name: impl Into<String>,
        kubeconfig_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let name = name.into();
        validate_cluster_name(&name)?;
        Ok(Self {
            name,
            kubeconfig_path: kubeconfig_path.into(),
        })
    }

    /// Cluster name, also the prefix of every node container
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the cluster's kubeconfig lives
    pub fn kubeconfig_path(&self) -> &Path {
        &self.kubeconfig_path
    }

    /// `label=value` filter matching every container of this cluster
    pub fn ownership_label(&self) -> String {
        format!("{}={}", KIND_CLUSTER_LABEL, self.name)
    }
}

impl fmt::Display for ClusterIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// `<home>/.kube/kind-config-<name>`
pub fn default_kubeconfig_path(home: &Path, name: &str) -> PathBuf {
    home.join(".kube").join(format!("kind-config-{}", name))
}

/// Cluster names become container and DNS names: DNS-1123 labels only
fn validate_cluster_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= 50
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !name.starts_with('-')
        && !name.ends_with('-');
    if valid {
        Ok(())
    } else {
        Err(Error::config(format!(
            "invalid cluster name '{}': use lowercase letters, digits and '-'",
            name
        )))
    }
}

/// Role of a node in the cluster
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeRole {
    /// Runs the API server and scheduler
    ControlPlane,
    /// Runs workloads only
    Worker,
}

impl NodeRole {
    /// Suffix kind uses in container names for this role
    fn container_suffix(self) -> &'static str {
        match self {
            NodeRole::ControlPlane => "control-plane",
            NodeRole::Worker => "worker",
        }
    }
}

/// Ordered list of node roles, validated to contain exactly one control plane
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopologySpec {
    nodes: Vec<NodeRole>,
}

impl TopologySpec {
    /// Number of workers in the local development profile
    pub const LOCAL_DEV_WORKERS: usize = 3;

    /// Build a topology, rejecting anything other than one control plane
    pub fn new(nodes: Vec<NodeRole>) -> Result<Self> {
        let control_planes = nodes
            .iter()
            .filter(|r| **r == NodeRole::ControlPlane)
            .count();
        if control_planes != 1 {
            return Err(Error::config(format!(
                "topology must have exactly one control-plane node, got {}",
                control_planes
            )));
        }
        Ok(Self { nodes })
    }

    /// The local development profile: 1 control plane + 3 workers
    pub fn local_dev() -> Self {
        let mut nodes = vec![NodeRole::ControlPlane];
        nodes.extend(std::iter::repeat(NodeRole::Worker).take(Self::LOCAL_DEV_WORKERS));
        Self { nodes }
    }

    /// Node roles in order
    pub fn nodes(&self) -> &[NodeRole] {
        &self.nodes
    }

    /// Number of nodes the cluster API should report
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Names of the containers kind creates for this topology.
    ///
    /// kind numbers nodes per role: the first is unsuffixed, later ones get
    /// `2`, `3`, ... (`sanic-worker`, `sanic-worker2`, `sanic-worker3`).
    pub fn required_containers(&self, identity: &ClusterIdentity) -> Vec<String> {
        let mut control_planes = 0;
        let mut workers = 0;
        self.nodes
            .iter()
            .map(|role| {
                let counter = match role {
                    NodeRole::ControlPlane => &mut control_planes,
                    NodeRole::Worker => &mut workers,
                };
                *counter += 1;
                let ordinal = if *counter == 1 {
                    String::new()
                } else {
                    counter.to_string()
                };
                format!("{}-{}{}", identity.name(), role.container_suffix(), ordinal)
            })
            .collect()
    }
}

impl Default for TopologySpec {
    fn default() -> Self {
        Self::local_dev()
    }
}

/// One node entry of a kind cluster config
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KindNode {
    /// Node role
    pub role: NodeRole,
    /// Node image override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// kind cluster config document fed to `kind create cluster --config -`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindClusterConfig {
    /// Always `Cluster`
    pub kind: String,
    /// Config schema version
    pub api_version: String,
    /// Nodes to create
    pub nodes: Vec<KindNode>,
}

impl Default for KindClusterConfig {
    /// kind's scheme defaults: a single control-plane node
    fn default() -> Self {
        Self {
            kind: KIND_CONFIG_KIND.to_string(),
            api_version: KIND_CONFIG_API_VERSION.to_string(),
            nodes: vec![KindNode {
                role: NodeRole::ControlPlane,
                image: None,
            }],
        }
    }
}

impl KindClusterConfig {
    /// Replace the node list with the given topology
    pub fn with_topology(mut self, topology: &TopologySpec, image: Option<&str>) -> Self {
        self.nodes = topology
            .nodes()
            .iter()
            .map(|role| KindNode {
                role: *role,
                image: image.map(str::to_string),
            })
            .collect();
        self
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| Error::serialization(format!("failed to render kind config: {}", e)))
    }
}

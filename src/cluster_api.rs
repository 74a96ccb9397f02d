//! Cluster API access
//!
//! [`ApiConnector`] turns a kubeconfig path into a [`NodeLister`]. Its error
//! separates a cluster that was never set up (no kubeconfig) from one whose
//! kubeconfig exists but cannot be used.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use kube::Client;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use localdev_common::kube_utils;
use localdev_common::Result;

/// Why a client for the cluster API could not be built
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConnectError {
    /// No usable kubeconfig: the cluster has not been created yet
    #[error("cluster not initialized: {0}")]
    NotInitialized(String),
    /// A kubeconfig exists but no client could be built from it
    #[error("API unreachable: {0}")]
    Unreachable(String),
}

/// Lists the nodes of one cluster
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NodeLister: Send + Sync {
    /// List every node with its status conditions
    async fn list_nodes(&self) -> Result<Vec<Node>>;
}

/// Builds node listers from a kubeconfig
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ApiConnector: Send + Sync {
    /// Load the kubeconfig at `kubeconfig` and construct a client from it
    async fn connect(
        &self,
        kubeconfig: &Path,
    ) -> std::result::Result<Arc<dyn NodeLister>, ConnectError>;
}

/// Node lister backed by a kube-rs client
pub struct KubeNodeLister {
    client: Client,
}

impl KubeNodeLister {
    /// Wrap an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NodeLister for KubeNodeLister {
    async fn list_nodes(&self) -> Result<Vec<Node>> {
        kube_utils::list_nodes(&self.client).await
    }
}

/// Connector that reads kubeconfig files from disk
#[derive(Clone, Copy, Debug, Default)]
pub struct KubeConnector;

#[async_trait]
impl ApiConnector for KubeConnector {
    async fn connect(
        &self,
        kubeconfig: &Path,
    ) -> std::result::Result<Arc<dyn NodeLister>, ConnectError> {
        let config = kube_utils::read_kubeconfig(kubeconfig)
            .map_err(|e| ConnectError::NotInitialized(e.to_string()))?;
        let client = kube_utils::client_from_kubeconfig(config, kubeconfig)
            .await
            .map_err(|e| ConnectError::Unreachable(e.to_string()))?;
        Ok(Arc::new(KubeNodeLister::new(client)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_kubeconfig_means_not_initialized() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let result = KubeConnector
            .connect(&dir.path().join("kind-config-sanic"))
            .await;
        match result {
            Err(ConnectError::NotInitialized(msg)) => assert!(msg.contains("kind-config-sanic")),
            Err(other) => panic!("expected NotInitialized, got {other:?}"),
            Ok(_) => panic!("expected NotInitialized, got a client"),
        }
    }

    #[tokio::test]
    async fn garbage_kubeconfig_means_not_initialized() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("kind-config-sanic");
        std::fs::write(&path, "{{ not yaml").expect("file should be written");
        assert!(matches!(
            KubeConnector.connect(&path).await,
            Err(ConnectError::NotInitialized(_))
        ));
    }

    #[test]
    fn connect_errors_read_as_verdict_reasons() {
        assert_eq!(
            ConnectError::NotInitialized("no file".to_string()).to_string(),
            "cluster not initialized: no file"
        );
        assert_eq!(
            ConnectError::Unreachable("bad cert".to_string()).to_string(),
            "API unreachable: bad cert"
        );
    }
}

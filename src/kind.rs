//! Cluster creation through the kind CLI

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use localdev_common::{Error, Result};

use crate::topology::{ClusterIdentity, KindClusterConfig};

/// Options passed to the creation tool
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateOptions {
    /// Keep node containers around when creation fails
    pub retain: bool,
    /// How long the tool itself waits for the control plane (zero: don't wait)
    pub wait_for_ready: Duration,
}

impl Default for CreateOptions {
    /// Don't retain, don't wait: readiness is waited on by the provisioner
    fn default() -> Self {
        Self {
            retain: false,
            wait_for_ready: Duration::ZERO,
        }
    }
}

/// Creates clusters from a declarative node list
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterCreator: Send + Sync {
    /// Create the cluster and write its kubeconfig to the identity's path
    async fn create(
        &self,
        identity: &ClusterIdentity,
        config: &KindClusterConfig,
        options: &CreateOptions,
    ) -> Result<()>;
}

/// `kind` command-line tool
#[derive(Clone, Debug)]
pub struct KindCli {
    binary: PathBuf,
}

impl KindCli {
    /// Use the given kind binary (a bare name is looked up on PATH)
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for KindCli {
    fn default() -> Self {
        Self::new("kind")
    }
}

/// Arguments for `kind create cluster`, reading the config from stdin
pub fn create_args(identity: &ClusterIdentity, options: &CreateOptions) -> Vec<String> {
    let mut args = vec![
        "create".to_string(),
        "cluster".to_string(),
        "--name".to_string(),
        identity.name().to_string(),
        "--kubeconfig".to_string(),
        identity.kubeconfig_path().display().to_string(),
        "--config".to_string(),
        "-".to_string(),
        "--wait".to_string(),
        format!("{}s", options.wait_for_ready.as_secs()),
    ];
    if options.retain {
        args.push("--retain".to_string());
    }
    args
}

#[async_trait]
impl ClusterCreator for KindCli {
    async fn create(
        &self,
        identity: &ClusterIdentity,
        config: &KindClusterConfig,
        options: &CreateOptions,
    ) -> Result<()> {
        let yaml = config.to_yaml()?;
        if let Some(dir) = identity.kubeconfig_path().parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        let args = create_args(identity, options);
        info!(cluster = %identity, nodes = config.nodes.len(), "creating kind cluster");
        debug!(binary = %self.binary.display(), ?args, "running kind");

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Error::command_failed(
                    "kind create cluster",
                    format!("failed to start {}: {}", self.binary.display(), e),
                )
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(yaml.as_bytes()).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(Error::command_failed(
                "kind create cluster",
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        info!(
            cluster = %identity,
            kubeconfig = %identity.kubeconfig_path().display(),
            "kind cluster created"
        );
        Ok(())
    }
}

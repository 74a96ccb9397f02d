//! CLI commands

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cluster_api::KubeConnector;
use crate::config::{self, LocalDevConfig};
use crate::ingress::KubectlApply;
use crate::kind::KindCli;
use crate::provisioner::{Collaborators, ProvisionError};
use crate::runtime::DockerRuntime;

pub mod down;
pub mod kubeconfig;
pub mod status;
pub mod up;

/// Errors surfaced by the `localdev` binary
#[derive(Debug, Error)]
pub enum CliError {
    /// Setup, runtime or config failure outside a provisioning phase
    #[error(transparent)]
    Common(#[from] localdev_common::Error),
    /// A provisioning phase failed
    #[error(transparent)]
    Provision(#[from] ProvisionError),
}

/// CLI Result type
pub type Result<T> = std::result::Result<T, CliError>;

/// Cluster selection flags shared by every command
#[derive(Args, Clone, Debug, Default)]
pub struct ClusterArgs {
    /// Cluster name (defaults to the config file value, then `sanic`)
    #[arg(long, env = "LOCALDEV_CLUSTER_NAME")]
    pub name: Option<String>,

    /// Kubeconfig path (defaults to ~/.kube/kind-config-<name>)
    #[arg(long, env = "LOCALDEV_KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Config file (defaults to ~/.localdev/config.yaml)
    #[arg(long = "config", env = "LOCALDEV_CONFIG")]
    pub config_file: Option<PathBuf>,
}

impl ClusterArgs {
    /// Load the config file and apply flag overrides on top
    pub fn resolve(&self) -> localdev_common::Result<LocalDevConfig> {
        let mut config = match &self.config_file {
            Some(path) => config::load_config_from(path)?,
            None => config::load_config()?,
        };
        self.apply(&mut config);
        debug!(cluster = %config.cluster_name, "resolved configuration");
        Ok(config)
    }

    fn apply(&self, config: &mut LocalDevConfig) {
        if let Some(name) = &self.name {
            config.cluster_name = name.clone();
        }
        if let Some(path) = &self.kubeconfig {
            config.kubeconfig = Some(path.clone());
        }
    }
}

/// Production collaborators: Docker, kube-rs, kind and kubectl
pub async fn connect_collaborators(
    config: &LocalDevConfig,
) -> localdev_common::Result<Collaborators> {
    let runtime = DockerRuntime::connect().await?;
    Ok(Collaborators {
        runtime: Arc::new(runtime),
        connector: Arc::new(KubeConnector),
        creator: Arc::new(KindCli::new(&config.kind_binary)),
        bootstrapper: Arc::new(KubectlApply::new(&config.kubectl_binary)),
    })
}

/// Token cancelled on the first Ctrl-C
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("interrupted, stopping");
                child.cancel();
            }
            Err(e) => debug!(error = %e, "could not listen for Ctrl-C"),
        }
    });
    token
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn flags_override_the_config_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file should be created");
        file.write_all(b"clusterName: tails\nreadyTimeoutSecs: 30\n")
            .expect("config should be written");

        let args = ClusterArgs {
            name: Some("knuckles".to_string()),
            kubeconfig: Some(PathBuf::from("/tmp/kc")),
            config_file: Some(file.path().to_path_buf()),
        };
        let config = args.resolve().expect("config should resolve");

        assert_eq!(config.cluster_name, "knuckles");
        assert_eq!(config.kubeconfig, Some(PathBuf::from("/tmp/kc")));
        assert_eq!(config.ready_timeout_secs, 30);
    }

    #[test]
    fn file_values_survive_without_flags() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file should be created");
        file.write_all(b"clusterName: tails\n")
            .expect("config should be written");

        let args = ClusterArgs {
            config_file: Some(file.path().to_path_buf()),
            ..ClusterArgs::default()
        };
        assert_eq!(args.resolve().expect("config").cluster_name, "tails");
    }

    #[test]
    fn provision_errors_keep_their_phase_prefix() {
        let err: CliError = ProvisionError {
            phase: crate::provisioner::ProvisionPhase::Creating,
            source: localdev_common::Error::command_failed("kind create cluster", "boom"),
        }
        .into();
        assert!(err.to_string().starts_with("Creating: "));
    }
}

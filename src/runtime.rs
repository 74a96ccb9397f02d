//! Container runtime access
//!
//! Trait-based so inspection and reaping can be tested without a Docker
//! daemon; production code talks to Docker through bollard.

use std::collections::HashMap;

use async_trait::async_trait;
use bollard::container::{ListContainersOptions, RemoveContainerOptions};
use bollard::Docker;
#[cfg(test)]
use mockall::automock;
use tracing::debug;

use localdev_common::{Error, Result};

/// Docker state string for a running container
pub const STATE_RUNNING: &str = "running";

/// The parts of a container listing the provisioner cares about
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Container ID
    pub id: String,
    /// Names as reported by Docker (with a leading `/`)
    pub names: Vec<String>,
    /// State string (`running`, `exited`, `created`, ...)
    pub state: String,
}

impl ContainerInfo {
    /// Primary name without Docker's leading slash
    pub fn name(&self) -> Option<&str> {
        self.names.first().map(|n| n.trim_start_matches('/'))
    }

    /// Whether the container is currently running
    pub fn is_running(&self) -> bool {
        self.state == STATE_RUNNING
    }
}

/// Operations on the container runtime
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// List all containers, running or not, that carry the given `key=value` label
    async fn list_containers(&self, label: &str) -> Result<Vec<ContainerInfo>>;

    /// Force-remove a container regardless of its state
    async fn remove_container(&self, id: &str) -> Result<()>;
}

/// Docker daemon accessed through bollard
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect using `DOCKER_HOST` or the platform's default socket
    pub async fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults().map_err(|e| {
            Error::container_runtime(format!("could not connect to docker: {}", e))
        })?;
        docker
            .ping()
            .await
            .map_err(|e| Error::container_runtime(format!("docker is not responding: {}", e)))?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_containers(&self, label: &str) -> Result<Vec<ContainerInfo>> {
        let filters: HashMap<String, Vec<String>> =
            [("label".to_string(), vec![label.to_string()])]
                .into_iter()
                .collect();
        let options = ListContainersOptions {
            all: true,
            filters,
            ..Default::default()
        };

        let summaries = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| Error::container_runtime(format!("failed to list containers: {}", e)))?;

        debug!(label = %label, count = summaries.len(), "listed containers");

        Ok(summaries
            .into_iter()
            .map(|s| ContainerInfo {
                id: s.id.unwrap_or_default(),
                names: s.names.unwrap_or_default(),
                state: s.state.unwrap_or_default(),
            })
            .collect())
    }

    async fn remove_container(&self, id: &str) -> Result<()> {
        let options = RemoveContainerOptions {
            force: true,
            v: true,
            ..Default::default()
        };
        self.docker
            .remove_container(id, Some(options))
            .await
            .map_err(|e| {
                Error::container_runtime(format!("failed to remove container {}: {}", id, e))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(name: &str, state: &str) -> ContainerInfo {
        ContainerInfo {
            id: format!("id-{}", name),
            names: vec![format!("/{}", name)],
            state: state.to_string(),
        }
    }

    #[test]
    fn name_strips_docker_leading_slash() {
        assert_eq!(container("sanic-worker2", "running").name(), Some("sanic-worker2"));
    }

    #[test]
    fn name_is_none_without_names() {
        let info = ContainerInfo {
            id: "abc".to_string(),
            names: vec![],
            state: "running".to_string(),
        };
        assert_eq!(info.name(), None);
    }

    #[test]
    fn only_running_state_counts_as_running() {
        assert!(container("sanic-worker", "running").is_running());
        assert!(!container("sanic-worker", "exited").is_running());
        assert!(!container("sanic-worker", "created").is_running());
        assert!(!container("sanic-worker", "").is_running());
    }
}

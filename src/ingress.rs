//! Ingress controller bootstrap
//!
//! A freshly created cluster gets a single-replica Traefik ingress controller
//! on the host network, applied with `kubectl apply -f -` against the new
//! cluster's kubeconfig.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use localdev_common::{Error, Result};

/// Port the ingress controller serves HTTP on
pub const INGRESS_HTTP_PORT: u16 = 80;
/// Port of the Traefik admin dashboard
pub const INGRESS_ADMIN_PORT: u16 = 8080;

/// Traefik ingress controller: RBAC, service account and deployment
pub const INGRESS_CONTROLLER_MANIFEST: &str = r#"---
kind: ClusterRole
apiVersion: rbac.authorization.k8s.io/v1
metadata:
  name: traefik-ingress-controller
rules:
  - apiGroups:
      - ""
    resources:
      - services
      - endpoints
      - secrets
    verbs:
      - get
      - list
      - watch
  - apiGroups:
      - extensions
      - networking.k8s.io
    resources:
      - ingresses
    verbs:
      - get
      - list
      - watch
---
kind: ClusterRoleBinding
apiVersion: rbac.authorization.k8s.io/v1
metadata:
  name: traefik-ingress-controller
roleRef:
  apiGroup: rbac.authorization.k8s.io
  kind: ClusterRole
  name: traefik-ingress-controller
subjects:
- kind: ServiceAccount
  name: traefik-ingress-controller
  namespace: kube-system
---
apiVersion: v1
kind: ServiceAccount
metadata:
  name: traefik-ingress-controller
  namespace: kube-system
---
kind: Deployment
apiVersion: apps/v1
metadata:
  name: traefik-ingress-controller
  namespace: kube-system
  labels:
    k8s-app: traefik-ingress-lb
spec:
  replicas: 1
  selector:
    matchLabels:
      k8s-app: traefik-ingress-lb
  template:
    metadata:
      labels:
        k8s-app: traefik-ingress-lb
        name: traefik-ingress-lb
    spec:
      serviceAccountName: traefik-ingress-controller
      terminationGracePeriodSeconds: 60
      hostNetwork: true
      containers:
      - image: traefik:v1.7
        name: traefik-ingress-lb
        ports:
        - name: http
          containerPort: 80
        - name: admin
          containerPort: 8080
        args:
        - --api
        - --kubernetes
        - --logLevel=INFO
"#;

/// Applies networking manifests to a cluster
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NetworkBootstrapper: Send + Sync {
    /// Apply `manifest` against the cluster behind `kubeconfig`
    async fn apply(&self, kubeconfig: &Path, manifest: &str) -> Result<()>;
}

/// `kubectl apply -f -`
#[derive(Clone, Debug)]
pub struct KubectlApply {
    binary: PathBuf,
}

impl KubectlApply {
    /// Use the given kubectl binary (a bare name is looked up on PATH)
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for KubectlApply {
    fn default() -> Self {
        Self::new("kubectl")
    }
}

#[async_trait]
impl NetworkBootstrapper for KubectlApply {
    async fn apply(&self, kubeconfig: &Path, manifest: &str) -> Result<()> {
        debug!(
            binary = %self.binary.display(),
            kubeconfig = %kubeconfig.display(),
            "running kubectl apply"
        );

        let mut child = Command::new(&self.binary)
            .args(["apply", "-f", "-"])
            .env("KUBECONFIG", kubeconfig)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Error::command_failed(
                    "kubectl apply",
                    format!("failed to start {}: {}", self.binary.display(), e),
                )
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(manifest.as_bytes()).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(Error::command_failed(
                "kubectl apply",
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        info!("ingress controller manifest applied");
        Ok(())
    }
}

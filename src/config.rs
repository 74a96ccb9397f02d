//! localdev configuration stored at `~/.localdev/config.yaml`.
//!
//! Every field is optional in the file. Command-line flags (and their
//! `LOCALDEV_*` environment variables) override what the file says.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use localdev_common::{Error, Result, DEFAULT_CLUSTER_NAME};

use crate::provisioner::{ProvisionSettings, DEFAULT_READY_TIMEOUT};
use crate::topology::ClusterIdentity;
use crate::waiter::DEFAULT_POLL_INTERVAL;

const CONFIG_DIR_NAME: &str = ".localdev";
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Longest accepted convergence budget (one day)
pub const MAX_READY_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Persistent localdev configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LocalDevConfig {
    /// Name of the kind cluster
    pub cluster_name: String,
    /// Kubeconfig location; `~/.kube/kind-config-<name>` when unset
    pub kubeconfig: Option<PathBuf>,
    /// Budget for all nodes to become ready after creation
    pub ready_timeout_secs: u64,
    /// Interval between node readiness polls
    pub poll_interval_ms: u64,
    /// kind node image override
    pub node_image: Option<String>,
    /// kind binary
    pub kind_binary: PathBuf,
    /// kubectl binary
    pub kubectl_binary: PathBuf,
}

impl Default for LocalDevConfig {
    fn default() -> Self {
        Self {
            cluster_name: DEFAULT_CLUSTER_NAME.to_string(),
            kubeconfig: None,
            ready_timeout_secs: DEFAULT_READY_TIMEOUT.as_secs(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            node_image: None,
            kind_binary: PathBuf::from("kind"),
            kubectl_binary: PathBuf::from("kubectl"),
        }
    }
}

impl LocalDevConfig {
    /// Cluster identity described by this config
    pub fn identity(&self) -> Result<ClusterIdentity> {
        match &self.kubeconfig {
            Some(path) => ClusterIdentity::with_kubeconfig(&self.cluster_name, path),
            None => ClusterIdentity::new(&self.cluster_name),
        }
    }

    /// Reject timings the convergence wait cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.ready_timeout_secs == 0 || self.ready_timeout_secs > MAX_READY_TIMEOUT_SECS {
            return Err(Error::config(format!(
                "readyTimeoutSecs must be between 1 and {}, got {}",
                MAX_READY_TIMEOUT_SECS, self.ready_timeout_secs
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::config("pollIntervalMs must be greater than 0"));
        }
        if self.poll_interval_ms > self.ready_timeout_secs.saturating_mul(1000) {
            return Err(Error::config(format!(
                "pollIntervalMs ({}) is longer than readyTimeoutSecs ({})",
                self.poll_interval_ms, self.ready_timeout_secs
            )));
        }
        Ok(())
    }

    /// Provisioning tunables described by this config
    pub fn provision_settings(&self) -> Result<ProvisionSettings> {
        self.validate()?;
        Ok(ProvisionSettings {
            ready_timeout: Duration::from_secs(self.ready_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            node_image: self.node_image.clone(),
            ..ProvisionSettings::default()
        })
    }
}

/// Path to `~/.localdev/config.yaml`
pub fn config_path() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| Error::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load `~/.localdev/config.yaml`, returning defaults if it is missing
pub fn load_config() -> Result<LocalDevConfig> {
    load_config_from(&config_path()?)
}

/// Load config from `path`, returning defaults if it is missing
pub fn load_config_from(path: &Path) -> Result<LocalDevConfig> {
    if !path.exists() {
        return Ok(LocalDevConfig::default());
    }
    let data = std::fs::read_to_string(path)
        .map_err(|e| Error::config(format!("failed to read {}: {}", path.display(), e)))?;
    if data.trim().is_empty() {
        return Ok(LocalDevConfig::default());
    }
    serde_yaml::from_str(&data)
        .map_err(|e| Error::config(format!("failed to parse {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file should be created");
        file.write_all(contents.as_bytes())
            .expect("config should be written");
        file
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let config = load_config_from(&dir.path().join("config.yaml")).expect("defaults");
        assert_eq!(config, LocalDevConfig::default());
        assert_eq!(config.cluster_name, "sanic");
        assert_eq!(config.ready_timeout_secs, 90);
        assert_eq!(config.poll_interval_ms, 300);
    }

    #[test]
    fn empty_file_yields_defaults() {
        let file = write_config("\n");
        assert_eq!(
            load_config_from(file.path()).expect("empty config is fine"),
            LocalDevConfig::default()
        );
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let file = write_config("clusterName: tails\nnodeImage: kindest/node:v1.32.0\n");
        let config = load_config_from(file.path()).expect("partial config should parse");

        assert_eq!(config.cluster_name, "tails");
        assert_eq!(config.node_image.as_deref(), Some("kindest/node:v1.32.0"));
        assert_eq!(config.ready_timeout_secs, 90);
        assert_eq!(config.kind_binary, PathBuf::from("kind"));
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let file = write_config("readyTimeoutSecs: [not, a, number]\n");
        let err = load_config_from(file.path()).expect_err("malformed config should fail");
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn settings_follow_the_config() {
        let config = LocalDevConfig {
            ready_timeout_secs: 30,
            poll_interval_ms: 50,
            ..LocalDevConfig::default()
        };
        let settings = config.provision_settings().expect("settings are in range");
        assert_eq!(settings.ready_timeout, Duration::from_secs(30));
        assert_eq!(settings.poll_interval, Duration::from_millis(50));
        assert!(settings.node_image.is_none());
    }

    #[rstest]
    #[case::zero_timeout(0, 300)]
    #[case::overflowing_timeout(u64::MAX, 300)]
    #[case::timeout_over_a_day(MAX_READY_TIMEOUT_SECS + 1, 300)]
    #[case::zero_interval(90, 0)]
    #[case::interval_longer_than_timeout(1, 5_000)]
    fn out_of_range_timings_are_rejected(
        #[case] ready_timeout_secs: u64,
        #[case] poll_interval_ms: u64,
    ) {
        let config = LocalDevConfig {
            ready_timeout_secs,
            poll_interval_ms,
            ..LocalDevConfig::default()
        };
        let err = config
            .provision_settings()
            .expect_err("timings should be rejected");
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn defaults_are_valid() {
        assert!(LocalDevConfig::default().validate().is_ok());
    }

    #[test]
    fn explicit_kubeconfig_is_used_for_identity() {
        let config = LocalDevConfig {
            kubeconfig: Some(PathBuf::from("/tmp/kc")),
            ..LocalDevConfig::default()
        };
        let identity = config.identity().expect("valid identity");
        assert_eq!(identity.name(), "sanic");
        assert_eq!(identity.kubeconfig_path(), Path::new("/tmp/kc"));
    }

    #[test]
    fn invalid_cluster_name_is_rejected() {
        let config = LocalDevConfig {
            cluster_name: "Not_Valid".to_string(),
            kubeconfig: Some(PathBuf::from("/tmp/kc")),
            ..LocalDevConfig::default()
        };
        assert!(config.identity().is_err());
    }
}

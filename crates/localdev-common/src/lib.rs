//! Common types for localdev: errors, Kubernetes helpers and tracing setup

#![deny(missing_docs)]

pub mod error;
pub mod kube_utils;
pub mod telemetry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Label kind puts on every node container, valued with the cluster name
pub const KIND_CLUSTER_LABEL: &str = "io.x-k8s.kind.cluster";

/// Cluster name used when none is configured
pub const DEFAULT_CLUSTER_NAME: &str = "sanic";

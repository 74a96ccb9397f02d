//! Error types for localdev
//!
//! Errors are structured with fields so that a failed provisioning attempt
//! tells the operator which command, file or node was involved.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Main error type for localdev operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// The kubeconfig for the cluster could not be read or turned into a client
    #[error("kubeconfig error [{}]: {message}", .path.display())]
    Kubeconfig {
        /// Path of the kubeconfig that failed
        path: PathBuf,
        /// Description of what failed
        message: String,
    },

    /// Container runtime (Docker daemon) error
    #[error("container runtime error: {message}")]
    ContainerRuntime {
        /// Description of what failed
        message: String,
    },

    /// An external command exited unsuccessfully
    #[error("command failed: {command} - {message}")]
    CommandFailed {
        /// The command that failed (e.g. "kind create cluster")
        command: String,
        /// Captured diagnostic output
        message: String,
    },

    /// A required tool is not installed
    #[error("prerequisite not found: {tool} - {hint}")]
    PrerequisiteNotFound {
        /// The tool that was not found
        tool: String,
        /// Hint for how to install it
        hint: String,
    },

    /// Not every node reported Ready on the last observation
    #[error("some nodes were not ready ({} of {total}): {}", .not_ready.len(), .not_ready.join(", "))]
    NotConverged {
        /// Names of the nodes that were not ready
        not_ready: Vec<String>,
        /// Number of nodes observed
        total: usize,
    },

    /// A wait was interrupted before its deadline
    #[error("cancelled: {message}")]
    Cancelled {
        /// What was still outstanding when the wait was cancelled
        message: String,
    },

    /// Invalid configuration
    #[error("config error: {message}")]
    Config {
        /// Description of what's invalid
        message: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
    },

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Where the error occurred
        context: String,
    },
}

impl Error {
    /// Create a kubeconfig error for the given path
    pub fn kubeconfig(path: &Path, msg: impl Into<String>) -> Self {
        Self::Kubeconfig {
            path: path.to_path_buf(),
            message: msg.into(),
        }
    }

    /// Create a container runtime error
    pub fn container_runtime(msg: impl Into<String>) -> Self {
        Self::ContainerRuntime {
            message: msg.into(),
        }
    }

    /// Create a command failure carrying the command's diagnostic output
    pub fn command_failed(command: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            message: msg.into(),
        }
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Create a cancellation error
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled {
            message: msg.into(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }
}

//! localdev - a 4-node kind cluster for local development
//!
//! `localdev up` makes sure a cluster named `sanic` (one control plane, three
//! workers) exists and every node is ready. A healthy cluster is reused; any
//! other state is torn down and recreated from scratch.
//!
//! # Modules
//!
//! - [`inspector`] - classifies the current cluster as Healthy, Degraded or Absent
//! - [`reaper`] - force-removes containers left by a previous cluster
//! - [`waiter`] - bounded wait for every node to report ready
//! - [`provisioner`] - the state machine tying the above together
//! - [`topology`] - cluster identity, node roles and the kind config they produce
//! - [`runtime`], [`cluster_api`], [`kind`], [`ingress`] - external collaborators
//! - [`commands`] - the `localdev` CLI

#![deny(missing_docs)]

pub mod cluster_api;
pub mod commands;
pub mod config;
pub mod ingress;
pub mod inspector;
pub mod kind;
pub mod preflight;
pub mod provisioner;
pub mod reaper;
pub mod runtime;
pub mod topology;
pub mod waiter;

pub use inspector::{ClusterHealthVerdict, ClusterInspector};
pub use localdev_common::{Error, Result};
pub use provisioner::{ClusterProvisioner, ProvisionError, ProvisionPhase, Provisioned};
pub use reaper::StaleResourceReaper;
pub use topology::{ClusterIdentity, TopologySpec};
pub use waiter::ClusterConvergenceWaiter;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

/// localdev - local Kubernetes cluster for development
#[derive(Parser, Debug)]
#[command(name = "localdev")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log as JSON lines
    #[arg(long, global = true, env = "LOCALDEV_LOG_JSON")]
    pub json: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// localdev subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the cluster, or reuse it if it is healthy
    Up(commands::up::UpArgs),
    /// Report whether the cluster is usable
    Status(commands::status::StatusArgs),
    /// Remove the cluster's containers and kubeconfig
    Down(commands::down::DownArgs),
    /// Print the cluster's kubeconfig path
    Kubeconfig(commands::kubeconfig::KubeconfigArgs),
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> commands::Result<ExitCode> {
        match self.command {
            Commands::Up(args) => commands::up::run(args).await.map(|()| ExitCode::SUCCESS),
            Commands::Status(args) => commands::status::run(args).await,
            Commands::Down(args) => commands::down::run(args).await.map(|()| ExitCode::SUCCESS),
            Commands::Kubeconfig(args) => commands::kubeconfig::run(args)
                .await
                .map(|()| ExitCode::SUCCESS),
        }
    }
}

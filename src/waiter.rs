//! Bounded wait for node convergence
//!
//! Polls the node list until every node is ready or the deadline passes.
//! Failed polls are remembered, not returned: only the deadline (or
//! cancellation) ends the wait, and the error handed back is whatever was
//! still wrong on the last poll.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep_until, timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use localdev_common::kube_utils::{self, ReadinessPolicy};
use localdev_common::{Error, Result};

use crate::cluster_api::NodeLister;

/// Interval between node polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(300);

/// Shortest interval [`ClusterConvergenceWaiter::with_poll_interval`] accepts
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Waits until every node of a cluster reports ready
pub struct ClusterConvergenceWaiter {
    nodes: Arc<dyn NodeLister>,
    poll_interval: Duration,
    readiness: ReadinessPolicy,
    cancel: CancellationToken,
}

impl ClusterConvergenceWaiter {
    /// Create a waiter with the default interval and readiness policy
    pub fn new(nodes: Arc<dyn NodeLister>) -> Self {
        Self {
            nodes,
            poll_interval: DEFAULT_POLL_INTERVAL,
            readiness: kube_utils::last_ready_condition_wins,
            cancel: CancellationToken::new(),
        }
    }

    /// Override the poll interval (raised to [`MIN_POLL_INTERVAL`] if shorter)
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    /// Replace the node readiness policy
    pub fn with_readiness_policy(mut self, policy: ReadinessPolicy) -> Self {
        self.readiness = policy;
        self
    }

    /// Stop waiting early when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Block until all nodes are ready or `timeout` elapses.
    ///
    /// The first poll happens immediately. Between polls the waiter sleeps
    /// for the poll interval, clipped so it never sleeps past the deadline.
    /// On expiry the error from the most recent poll is returned. A single
    /// poll is cut off at the deadline, or one interval after it started if
    /// that is later, so the wait never runs past `timeout` plus one interval.
    pub async fn wait_until_ready(&self, timeout: Duration) -> Result<()> {
        let start = Instant::now();
        let deadline = start.checked_add(timeout).ok_or_else(|| {
            Error::internal_with_context(
                "wait_until_ready",
                format!("timeout of {}s is out of range", timeout.as_secs()),
            )
        })?;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let cutoff = poll_cutoff(Instant::now(), deadline, self.poll_interval);
            let polled = match timeout_at(cutoff, self.poll()).await {
                Ok(result) => result,
                Err(_) => Err(Error::internal_with_context(
                    "list_nodes",
                    "node list did not answer before the poll was cut off",
                )),
            };
            let last_error = match polled {
                Ok(()) => {
                    info!(
                        attempts,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "all nodes ready"
                    );
                    return Ok(());
                }
                Err(e) => e,
            };
            trace!(attempt = attempts, error = %last_error, "nodes not converged yet");

            let now = Instant::now();
            if now >= deadline {
                debug!(attempts, error = %last_error, "convergence deadline reached");
                return Err(last_error);
            }

            let wake = next_wake(now, deadline, self.poll_interval);
            tokio::select! {
                _ = sleep_until(wake) => {}
                _ = self.cancel.cancelled() => {
                    return Err(Error::cancelled(format!(
                        "stopped waiting for nodes: {}",
                        last_error
                    )));
                }
            }
        }
    }

    /// One observation: Ok when every node is ready. An empty node list is
    /// not converged: a cluster without nodes cannot run anything.
    async fn poll(&self) -> Result<()> {
        let nodes = self.nodes.list_nodes().await?;
        let not_ready: Vec<String> = nodes
            .iter()
            .filter(|n| !(self.readiness)(*n))
            .map(|n| kube_utils::node_name(n).to_string())
            .collect();

        if nodes.is_empty() || !not_ready.is_empty() {
            return Err(Error::NotConverged {
                not_ready,
                total: nodes.len(),
            });
        }
        Ok(())
    }
}

/// When to poll next: one interval from `now`, but never past `deadline`
pub fn next_wake(now: Instant, deadline: Instant, interval: Duration) -> Instant {
    now.checked_add(interval)
        .map_or(deadline, |wake| std::cmp::min(wake, deadline))
}

/// Latest instant a poll started at `now` may run until
pub fn poll_cutoff(now: Instant, deadline: Instant, interval: Duration) -> Instant {
    now.checked_add(interval)
        .map_or(deadline, |cutoff| std::cmp::max(cutoff, deadline))
}

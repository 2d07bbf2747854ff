// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Monitors: units of polling work
//!
//! Each monitor translates one category of operational snapshot into
//! metric observations. [`MonitorLoop`] drives a monitor on a fixed
//! interval with a [`FailureTracker`]: transient errors are logged and
//! retried on the next tick; sustained failure trips the tracker and ends
//! the loop, which reports the monitor's name on a shared completion
//! channel so the process can exit.

pub mod active_tasks;
pub mod replication;
pub mod replication_status;
pub mod throughput;

pub use active_tasks::ActiveTasksMonitor;
pub use replication::ReplicationProgressMonitor;
pub use replication_status::ReplicationStatusMonitor;
pub use throughput::ThroughputMonitor;

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::error::ExporterError;
use crate::failbox::FailureTracker;

/// A unit of polling work. Stateless between calls apart from the metric
/// families it owns.
#[async_trait]
pub trait Monitor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetches one snapshot and updates this monitor's metrics. Any
    /// transport or decode failure aborts the call; metrics already
    /// mutated before the failure keep their last value.
    async fn retrieve(&self) -> Result<(), ExporterError>;
}

/// Drives one [`Monitor`] on a fixed interval until its failure tracker
/// trips.
pub struct MonitorLoop {
    monitor: Box<dyn Monitor>,
    interval: Duration,
    failure_threshold: Duration,
}

impl MonitorLoop {
    pub fn new(monitor: Box<dyn Monitor>, interval: Duration, failure_threshold: Duration) -> Self {
        Self {
            monitor,
            interval,
            failure_threshold,
        }
    }

    pub fn name(&self) -> &'static str {
        self.monitor.name()
    }

    /// Runs the tick loop. The first poll happens immediately; subsequent
    /// polls follow the configured interval. On trip, sends the monitor's
    /// name once on `exited` and returns.
    pub async fn run(self, exited: mpsc::Sender<&'static str>) {
        let name = self.monitor.name();
        let mut tracker = FailureTracker::new(self.failure_threshold);
        let mut ticker = tokio::time::interval(self.interval);

        loop {
            ticker.tick().await;
            debug!(monitor = name, "tick");

            match self.monitor.retrieve().await {
                Ok(()) => tracker.success(),
                Err(e) => {
                    warn!(
                        monitor = name,
                        error = %e,
                        since_last_success = ?tracker.last_success().elapsed(),
                        "poll failed"
                    );
                    tracker.failure();
                }
            }

            if tracker.should_exit() {
                error!(
                    monitor = name,
                    threshold = ?self.failure_threshold,
                    "no successful poll within failure threshold; stopping"
                );
                break;
            }
        }

        // The receiver only cares about the first exit; a closed channel
        // just means another loop beat us to it.
        let _ = exited.send(name).await;
    }
}

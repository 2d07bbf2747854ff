// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Monitor scheduling
//!
//! Fans the configured monitor loops out as independent tokio tasks and
//! waits for the first one to terminate. There is no partial-degradation
//! mode: total unavailability is preferred over silently serving stale
//! metrics for one category indefinitely, so the caller exits the process
//! when this returns. The process is externally supervised and restarted.

use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

use crate::monitors::{Monitor, MonitorLoop};

pub struct MonitorSet {
    loops: Vec<MonitorLoop>,
    failure_threshold: Duration,
}

impl MonitorSet {
    pub fn new(failure_threshold: Duration) -> Self {
        Self {
            loops: Vec::new(),
            failure_threshold,
        }
    }

    pub fn add(&mut self, monitor: Box<dyn Monitor>, interval: Duration) {
        self.loops
            .push(MonitorLoop::new(monitor, interval, self.failure_threshold));
    }

    /// Spawns one task per monitor loop and blocks until the first loop
    /// terminates, returning that monitor's name. Remaining loops keep
    /// running; the caller is expected to exit the process.
    pub async fn run_until_first_exit(self) -> &'static str {
        let (tx, mut rx) = mpsc::channel(self.loops.len().max(1));

        for monitor_loop in self.loops {
            info!(monitor = monitor_loop.name(), "starting monitor");
            let tx = tx.clone();
            tokio::spawn(monitor_loop.run(tx));
        }
        drop(tx);

        // None only if no loops were configured.
        rx.recv().await.unwrap_or("none")
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Throughput monitor
//!
//! Fetches current request-rate diagnostics and republishes the latest
//! sample of each history as requests-per-second gauges, one series per
//! operation class, split by whether the traffic was rate limited.

use async_trait::async_trait;
use prometheus::{GaugeVec, Opts, Registry};
use std::sync::Arc;

use super::Monitor;
use crate::client::{CloudantAdmin, ThroughputSample};
use crate::error::ExporterError;

pub struct ThroughputMonitor {
    client: Arc<dyn CloudantAdmin>,
    current_req_per_second: GaugeVec,
}

impl ThroughputMonitor {
    pub fn new(client: Arc<dyn CloudantAdmin>, registry: &Registry) -> Result<Self, ExporterError> {
        let current_req_per_second = GaugeVec::new(
            Opts::new(
                "cloudant_throughput_current_req_per_second",
                "Current requests per second per class",
            ),
            &["class", "ratelimited"],
        )?;
        registry.register(Box::new(current_req_per_second.clone()))?;

        Ok(Self {
            client,
            current_req_per_second,
        })
    }

    fn publish_latest(&self, history: &[ThroughputSample], ratelimited: &str) {
        // An empty history means "no data this interval", not a failure.
        let Some(latest) = history.last() else {
            return;
        };
        for (class, value) in [
            ("lookup", latest.lookup),
            ("write", latest.write),
            ("query", latest.query),
        ] {
            if let Some(v) = value {
                self.current_req_per_second
                    .with_label_values(&[class, ratelimited])
                    .set(v as f64);
            }
        }
    }
}

#[async_trait]
impl Monitor for ThroughputMonitor {
    fn name(&self) -> &'static str {
        "throughput"
    }

    async fn retrieve(&self) -> Result<(), ExporterError> {
        let diagnostics = self.client.throughput().await?;

        self.publish_latest(&diagnostics.operation_history, "false");
        self.publish_latest(&diagnostics.deny_429_history, "true");

        Ok(())
    }
}

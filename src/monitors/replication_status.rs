// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Replication status aggregator
//!
//! Summarizes the unbounded scheduler-docs collection into counts per
//! status without loading the whole collection or issuing one oversized
//! request. Pages through the collection with a short delay between
//! pages, stopping at a short page or after a fixed number of pages to
//! bound worst-case latency. Counts become externally visible only after
//! a pass completes, so a scrape never observes a half-counted pass.
//!
//! The iteration cap silently truncates counts for collections larger
//! than `MAX_ITERATIONS * PAGE_SIZE` docs; known limitation.

use async_trait::async_trait;
use prometheus::{GaugeVec, Opts, Registry};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::Monitor;
use crate::client::CloudantAdmin;
use crate::error::ExporterError;

const PAGE_SIZE: u64 = 100;
const MAX_ITERATIONS: u32 = 10;

/// Every status the scheduler reports for a replication. Buckets are
/// pre-seeded from this list so absent statuses publish 0 rather than
/// going missing.
const KNOWN_STATUSES: [&str; 7] = [
    "initializing",
    "error",
    "pending",
    "running",
    "crashing",
    "completed",
    "failed",
];

pub struct ReplicationStatusMonitor {
    client: Arc<dyn CloudantAdmin>,
    status_count: GaugeVec,
    page_delay: Duration,
}

impl ReplicationStatusMonitor {
    pub fn new(client: Arc<dyn CloudantAdmin>, registry: &Registry) -> Result<Self, ExporterError> {
        Self::with_page_delay(client, registry, Duration::from_secs(5))
    }

    /// As [`new`](Self::new) but with an explicit delay between page
    /// requests. Tests pass `Duration::ZERO`.
    pub fn with_page_delay(
        client: Arc<dyn CloudantAdmin>,
        registry: &Registry,
        page_delay: Duration,
    ) -> Result<Self, ExporterError> {
        let status_count = GaugeVec::new(
            Opts::new(
                "cloudant_replication_status_count",
                "Current replication count by status",
            ),
            &["status"],
        )?;
        registry.register(Box::new(status_count.clone()))?;

        Ok(Self {
            client,
            status_count,
            page_delay,
        })
    }
}

#[async_trait]
impl Monitor for ReplicationStatusMonitor {
    fn name(&self) -> &'static str {
        "replication_status"
    }

    async fn retrieve(&self) -> Result<(), ExporterError> {
        let mut counts: BTreeMap<&'static str, u64> =
            KNOWN_STATUSES.iter().map(|s| (*s, 0)).collect();
        let mut skip: u64 = 0;
        let mut iterations: u32 = 0;

        // Repeat until we get a smaller page than we asked for.
        loop {
            let page = self.client.scheduler_docs(PAGE_SIZE, skip).await?;
            let fetched = page.docs.len() as u64;

            for doc in &page.docs {
                match doc.state.as_deref() {
                    Some(state) => {
                        if let Some(bucket) = KNOWN_STATUSES
                            .iter()
                            .find(|s| **s == state)
                            .and_then(|known| counts.get_mut(known))
                        {
                            *bucket += 1;
                        } else {
                            // Keep the published set fixed to the known enum.
                            debug!(state, "ignoring unknown replication state");
                        }
                    }
                    None => debug!("scheduler doc without a state"),
                }
            }

            skip += fetched;
            iterations += 1;
            if fetched < PAGE_SIZE || iterations >= MAX_ITERATIONS {
                break;
            }
            tokio::time::sleep(self.page_delay).await;
        }

        debug!(docs = skip, iterations, "replication status pass complete");

        // Publish only once the pass has fully terminated.
        for (status, count) in &counts {
            self.status_count
                .with_label_values(&[status])
                .set(*count as f64);
        }

        Ok(())
    }
}

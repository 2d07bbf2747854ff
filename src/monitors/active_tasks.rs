// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Active tasks monitor
//!
//! Lists running background operations and classifies them on the `type`
//! discriminator. Indexing and compaction kinds produce progress metrics;
//! replication tasks are only logged here because the replication monitor
//! covers them; unrecognized kinds are ignored.

use async_trait::async_trait;
use prometheus::{GaugeVec, Opts, Registry};
use std::sync::Arc;
use tracing::debug;

use super::Monitor;
use crate::client::CloudantAdmin;
use crate::error::ExporterError;
use crate::metrics::SettableCounterVec;

pub struct ActiveTasksMonitor {
    client: Arc<dyn CloudantAdmin>,
    indexer_changes_total: GaugeVec,
    indexer_changes_done: SettableCounterVec,
    compaction_changes_total: GaugeVec,
    compaction_changes_done: SettableCounterVec,
}

impl ActiveTasksMonitor {
    pub fn new(client: Arc<dyn CloudantAdmin>, registry: &Registry) -> Result<Self, ExporterError> {
        let indexer_changes_total = GaugeVec::new(
            Opts::new(
                "cloudant_indexing_changes_total",
                "The total number of changes to index",
            ),
            &["node", "pid", "database", "design_document"],
        )?;
        registry.register(Box::new(indexer_changes_total.clone()))?;

        let indexer_changes_done = SettableCounterVec::new(
            "cloudant_indexing_changes_done",
            "The number of changes indexed",
            &["node", "pid", "database", "design_document"],
        )?;
        registry.register(Box::new(indexer_changes_done.clone()))?;

        let compaction_changes_total = GaugeVec::new(
            Opts::new(
                "cloudant_compaction_changes_total",
                "The number of documents to compact",
            ),
            &["node", "pid", "database"],
        )?;
        registry.register(Box::new(compaction_changes_total.clone()))?;

        let compaction_changes_done = SettableCounterVec::new(
            "cloudant_compaction_changes_done",
            "The number of documents compacted",
            &["node", "pid", "database"],
        )?;
        registry.register(Box::new(compaction_changes_done.clone()))?;

        Ok(Self {
            client,
            indexer_changes_total,
            indexer_changes_done,
            compaction_changes_total,
            compaction_changes_done,
        })
    }
}

#[async_trait]
impl Monitor for ActiveTasksMonitor {
    fn name(&self) -> &'static str {
        "active_tasks"
    }

    async fn retrieve(&self) -> Result<(), ExporterError> {
        let tasks = self.client.active_tasks().await?;

        for task in &tasks {
            let node = task.node.as_deref().unwrap_or("");
            let pid = task.pid.as_deref().unwrap_or("");
            let database = task.database.as_deref().unwrap_or("");

            match task.kind.as_deref() {
                Some("indexer") => {
                    let design_document = task.design_document.as_deref().unwrap_or("");
                    debug!(
                        database,
                        design_document,
                        total_changes = ?task.total_changes,
                        "indexing"
                    );
                    if let Some(v) = task.total_changes {
                        self.indexer_changes_total
                            .with_label_values(&[node, pid, database, design_document])
                            .set(v as f64);
                    }
                    if let Some(v) = task.changes_done {
                        self.indexer_changes_done
                            .with_label_values(&[node, pid, database, design_document])
                            .set(v as f64);
                    }
                }
                Some("database_compaction") => {
                    debug!(database, total_changes = ?task.total_changes, "compacting");
                    if let Some(v) = task.total_changes {
                        self.compaction_changes_total
                            .with_label_values(&[node, pid, database])
                            .set(v as f64);
                    }
                    if let Some(v) = task.changes_done {
                        self.compaction_changes_done
                            .with_label_values(&[node, pid, database])
                            .set(v as f64);
                    }
                }
                Some("replication") => {
                    // Covered by the replication progress monitor.
                    debug!(doc_id = ?task.doc_id, "replication task seen in active tasks");
                }
                _ => {}
            }
        }

        Ok(())
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Replication progress monitor
//!
//! Lists in-flight replications (one bounded page, filtered to running)
//! and emits per-job progress metrics keyed by replication doc id.

use async_trait::async_trait;
use prometheus::{GaugeVec, Opts, Registry};
use std::sync::Arc;
use tracing::debug;

use super::Monitor;
use crate::client::CloudantAdmin;
use crate::error::ExporterError;
use crate::metrics::SettableCounterVec;

const RUNNING_PAGE_LIMIT: u64 = 50;

pub struct ReplicationProgressMonitor {
    client: Arc<dyn CloudantAdmin>,
    // Changes pending mostly goes down, but can go up if the replication
    // begins to fall behind. It's definitely a gauge.
    changes_pending: GaugeVec,
    // Everything else is a counter type, carried as reported.
    doc_write_failures: SettableCounterVec,
    docs_read: SettableCounterVec,
    docs_written: SettableCounterVec,
    missing_revs_found: SettableCounterVec,
    revs_checked: SettableCounterVec,
}

impl ReplicationProgressMonitor {
    pub fn new(client: Arc<dyn CloudantAdmin>, registry: &Registry) -> Result<Self, ExporterError> {
        let changes_pending = GaugeVec::new(
            Opts::new(
                "cloudant_replication_changes_pending_total",
                "The number of changes remaining to process (approximately)",
            ),
            &["docid"],
        )?;
        registry.register(Box::new(changes_pending.clone()))?;

        let doc_write_failures = SettableCounterVec::new(
            "cloudant_replication_doc_write_failures_total",
            "The number of failures writing documents to the target",
            &["docid"],
        )?;
        registry.register(Box::new(doc_write_failures.clone()))?;

        let docs_read = SettableCounterVec::new(
            "cloudant_replication_docs_read_total",
            "Total number of documents read from the source database",
            &["docid"],
        )?;
        registry.register(Box::new(docs_read.clone()))?;

        let docs_written = SettableCounterVec::new(
            "cloudant_replication_docs_written_total",
            "Total number of documents written to the target database",
            &["docid"],
        )?;
        registry.register(Box::new(docs_written.clone()))?;

        let missing_revs_found = SettableCounterVec::new(
            "cloudant_replication_missing_revs_found_total",
            "Total number of revs found so far on the source that are not at the target",
            &["docid"],
        )?;
        registry.register(Box::new(missing_revs_found.clone()))?;

        let revs_checked = SettableCounterVec::new(
            "cloudant_replication_revs_checked_total",
            "Total number of revs processed on the source",
            &["docid"],
        )?;
        registry.register(Box::new(revs_checked.clone()))?;

        Ok(Self {
            client,
            changes_pending,
            doc_write_failures,
            docs_read,
            docs_written,
            missing_revs_found,
            revs_checked,
        })
    }
}

#[async_trait]
impl Monitor for ReplicationProgressMonitor {
    fn name(&self) -> &'static str {
        "replication_progress"
    }

    async fn retrieve(&self) -> Result<(), ExporterError> {
        let page = self.client.running_replications(RUNNING_PAGE_LIMIT, 0).await?;

        for doc in &page.docs {
            let Some(doc_id) = doc.doc_id.as_deref() else {
                continue;
            };
            let Some(info) = &doc.info else {
                continue;
            };

            debug!(docid = doc_id, docs_written = ?info.docs_written, "replication progress");

            // A missing field skips that one metric; the rest of the
            // job's metrics are still emitted.
            if let Some(v) = info.changes_pending {
                self.changes_pending.with_label_values(&[doc_id]).set(v as f64);
            }
            if let Some(v) = info.doc_write_failures {
                self.doc_write_failures.with_label_values(&[doc_id]).set(v as f64);
            }
            if let Some(v) = info.docs_read {
                self.docs_read.with_label_values(&[doc_id]).set(v as f64);
            }
            if let Some(v) = info.docs_written {
                self.docs_written.with_label_values(&[doc_id]).set(v as f64);
            }
            if let Some(v) = info.missing_revisions_found {
                self.missing_revs_found.with_label_values(&[doc_id]).set(v as f64);
            }
            if let Some(v) = info.revisions_checked {
                self.revs_checked.with_label_values(&[doc_id]).set(v as f64);
            }
        }

        Ok(())
    }
}

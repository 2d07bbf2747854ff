// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// tests/monitor_tests.rs - Monitors driven against stub admin-API clients

use async_trait::async_trait;
use cloudant_exporter::client::{
    ActiveTask, CloudantAdmin, ReplicationInfo, SchedulerDoc, SchedulerDocsPage,
    ThroughputDiagnostics, ThroughputSample,
};
use cloudant_exporter::error::ExporterError;
use cloudant_exporter::monitors::{
    ActiveTasksMonitor, Monitor, ReplicationProgressMonitor, ReplicationStatusMonitor,
    ThroughputMonitor,
};
use cloudant_exporter::runtime::MonitorSet;
use prometheus::proto::MetricType;
use prometheus::Registry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Canned responses for the admin-API capability. `scheduler_docs` slices
/// `all_docs` by limit/skip, or serves endless full pages of running docs
/// when `unbounded` is set.
#[derive(Default)]
struct StubAdmin {
    running: SchedulerDocsPage,
    tasks: Vec<ActiveTask>,
    diagnostics: ThroughputDiagnostics,
    all_docs: Vec<SchedulerDoc>,
    unbounded: bool,
    scheduler_calls: AtomicU64,
}

#[async_trait]
impl CloudantAdmin for StubAdmin {
    async fn running_replications(
        &self,
        _limit: u64,
        _skip: u64,
    ) -> Result<SchedulerDocsPage, ExporterError> {
        Ok(self.running.clone())
    }

    async fn scheduler_docs(
        &self,
        limit: u64,
        skip: u64,
    ) -> Result<SchedulerDocsPage, ExporterError> {
        self.scheduler_calls.fetch_add(1, Ordering::SeqCst);
        if self.unbounded {
            return Ok(SchedulerDocsPage {
                docs: (0..limit).map(|_| doc_with_state("running")).collect(),
            });
        }
        let start = (skip as usize).min(self.all_docs.len());
        let end = (start + limit as usize).min(self.all_docs.len());
        Ok(SchedulerDocsPage {
            docs: self.all_docs[start..end].to_vec(),
        })
    }

    async fn active_tasks(&self) -> Result<Vec<ActiveTask>, ExporterError> {
        Ok(self.tasks.clone())
    }

    async fn throughput(&self) -> Result<ThroughputDiagnostics, ExporterError> {
        Ok(self.diagnostics.clone())
    }
}

fn doc_with_state(state: &str) -> SchedulerDoc {
    SchedulerDoc {
        doc_id: Some("rep".to_string()),
        state: Some(state.to_string()),
        info: None,
    }
}

/// All samples of a family as (sorted label pairs, value). Empty when the
/// family was never written to.
fn samples(registry: &Registry, name: &str) -> Vec<(Vec<(String, String)>, f64)> {
    let Some(family) = registry.gather().into_iter().find(|mf| mf.get_name() == name) else {
        return Vec::new();
    };
    family
        .get_metric()
        .iter()
        .map(|m| {
            let labels = m
                .get_label()
                .iter()
                .map(|lp| (lp.get_name().to_string(), lp.get_value().to_string()))
                .collect();
            let value = if m.has_counter() {
                m.get_counter().get_value()
            } else {
                m.get_gauge().get_value()
            };
            (labels, value)
        })
        .collect()
}

fn family_type(registry: &Registry, name: &str) -> MetricType {
    registry
        .gather()
        .into_iter()
        .find(|mf| mf.get_name() == name)
        .map(|mf| mf.get_field_type())
        .expect("metric family not gathered")
}

#[tokio::test]
async fn indexer_task_produces_one_gauge_and_one_counter_sample() {
    let stub = Arc::new(StubAdmin {
        tasks: vec![ActiveTask {
            kind: Some("indexer".to_string()),
            node: Some("couchdb@node1".to_string()),
            pid: Some("<0.1475.0>".to_string()),
            database: Some("orders".to_string()),
            design_document: Some("_design/search".to_string()),
            total_changes: Some(100),
            changes_done: Some(42),
            ..Default::default()
        }],
        ..Default::default()
    });
    let registry = Registry::new();
    let monitor = ActiveTasksMonitor::new(stub, &registry).unwrap();

    monitor.retrieve().await.unwrap();

    let totals = samples(&registry, "cloudant_indexing_changes_total");
    assert_eq!(totals.len(), 1);
    assert_eq!(totals[0].1, 100.0);

    let done = samples(&registry, "cloudant_indexing_changes_done");
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].1, 42.0);
    assert_eq!(
        family_type(&registry, "cloudant_indexing_changes_done"),
        MetricType::COUNTER
    );

    // Label pairs are name-sorted in the exposition.
    let expected = vec![
        ("database".to_string(), "orders".to_string()),
        ("design_document".to_string(), "_design/search".to_string()),
        ("node".to_string(), "couchdb@node1".to_string()),
        ("pid".to_string(), "<0.1475.0>".to_string()),
    ];
    assert_eq!(done[0].0, expected);
}

#[tokio::test]
async fn unrecognized_task_kinds_are_ignored() {
    let stub = Arc::new(StubAdmin {
        tasks: vec![
            ActiveTask {
                kind: Some("view_compaction".to_string()),
                database: Some("orders".to_string()),
                total_changes: Some(5),
                changes_done: Some(1),
                ..Default::default()
            },
            ActiveTask::default(),
        ],
        ..Default::default()
    });
    let registry = Registry::new();
    let monitor = ActiveTasksMonitor::new(stub, &registry).unwrap();

    monitor.retrieve().await.unwrap();

    assert!(samples(&registry, "cloudant_indexing_changes_total").is_empty());
    assert!(samples(&registry, "cloudant_compaction_changes_total").is_empty());
}

#[tokio::test]
async fn empty_rate_limited_series_is_not_a_failure() {
    let stub = Arc::new(StubAdmin {
        diagnostics: ThroughputDiagnostics {
            operation_history: vec![ThroughputSample {
                ts: Some(1),
                lookup: Some(5),
                write: Some(3),
                query: Some(2),
            }],
            deny_429_history: Vec::new(),
        },
        ..Default::default()
    });
    let registry = Registry::new();
    let monitor = ThroughputMonitor::new(stub, &registry).unwrap();

    monitor.retrieve().await.unwrap();

    let rates = samples(&registry, "cloudant_throughput_current_req_per_second");
    assert_eq!(rates.len(), 3);
    for (labels, _) in &rates {
        assert!(labels.contains(&("ratelimited".to_string(), "false".to_string())));
    }
}

#[tokio::test]
async fn throughput_uses_latest_sample_of_each_series() {
    let stub = Arc::new(StubAdmin {
        diagnostics: ThroughputDiagnostics {
            operation_history: vec![
                ThroughputSample {
                    lookup: Some(1),
                    ..Default::default()
                },
                ThroughputSample {
                    lookup: Some(9),
                    ..Default::default()
                },
            ],
            deny_429_history: vec![ThroughputSample {
                write: Some(4),
                ..Default::default()
            }],
        },
        ..Default::default()
    });
    let registry = Registry::new();
    let monitor = ThroughputMonitor::new(stub, &registry).unwrap();

    monitor.retrieve().await.unwrap();

    let rates = samples(&registry, "cloudant_throughput_current_req_per_second");
    let lookup_unlimited = rates
        .iter()
        .find(|(labels, _)| {
            labels.contains(&("class".to_string(), "lookup".to_string()))
                && labels.contains(&("ratelimited".to_string(), "false".to_string()))
        })
        .expect("lookup sample missing");
    assert_eq!(lookup_unlimited.1, 9.0);

    let write_limited = rates
        .iter()
        .find(|(labels, _)| {
            labels.contains(&("class".to_string(), "write".to_string()))
                && labels.contains(&("ratelimited".to_string(), "true".to_string()))
        })
        .expect("rate-limited write sample missing");
    assert_eq!(write_limited.1, 4.0);
}

#[tokio::test]
async fn missing_optional_field_skips_only_that_metric() {
    let stub = Arc::new(StubAdmin {
        running: SchedulerDocsPage {
            docs: vec![SchedulerDoc {
                doc_id: Some("rep-orders".to_string()),
                state: Some("running".to_string()),
                info: Some(ReplicationInfo {
                    changes_pending: None,
                    doc_write_failures: Some(0),
                    docs_read: Some(120),
                    docs_written: Some(118),
                    missing_revisions_found: Some(120),
                    revisions_checked: Some(140),
                }),
            }],
        },
        ..Default::default()
    });
    let registry = Registry::new();
    let monitor = ReplicationProgressMonitor::new(stub, &registry).unwrap();

    monitor.retrieve().await.unwrap();

    // The absent field produced no sample, and did not fail the rest.
    assert!(samples(&registry, "cloudant_replication_changes_pending_total").is_empty());

    let written = samples(&registry, "cloudant_replication_docs_written_total");
    assert_eq!(written.len(), 1);
    assert_eq!(
        written[0].0,
        vec![("docid".to_string(), "rep-orders".to_string())]
    );
    assert_eq!(written[0].1, 118.0);
    assert_eq!(
        samples(&registry, "cloudant_replication_revs_checked_total")[0].1,
        140.0
    );
}

#[tokio::test]
async fn status_aggregation_counts_every_page_and_seeds_all_buckets() {
    let mut docs = Vec::new();
    docs.extend((0..60).map(|_| doc_with_state("running")));
    docs.extend((0..40).map(|_| doc_with_state("completed")));
    docs.extend((0..20).map(|_| doc_with_state("error")));
    docs.extend((0..10).map(|_| doc_with_state("pending")));

    let stub = Arc::new(StubAdmin {
        all_docs: docs,
        ..Default::default()
    });
    let registry = Registry::new();
    let monitor =
        ReplicationStatusMonitor::with_page_delay(stub.clone(), &registry, Duration::ZERO).unwrap();

    monitor.retrieve().await.unwrap();

    let counts = samples(&registry, "cloudant_replication_status_count");
    // All seven statuses appear, including the ones at zero.
    assert_eq!(counts.len(), 7);
    let total: f64 = counts.iter().map(|(_, v)| v).sum();
    assert_eq!(total, 130.0);

    let count_of = |status: &str| {
        counts
            .iter()
            .find(|(labels, _)| labels.contains(&("status".to_string(), status.to_string())))
            .map(|(_, v)| *v)
            .expect("status bucket missing")
    };
    assert_eq!(count_of("running"), 60.0);
    assert_eq!(count_of("completed"), 40.0);
    assert_eq!(count_of("error"), 20.0);
    assert_eq!(count_of("pending"), 10.0);
    assert_eq!(count_of("initializing"), 0.0);
    assert_eq!(count_of("crashing"), 0.0);
    assert_eq!(count_of("failed"), 0.0);

    // 130 docs at page size 100: one full page and one short page.
    assert_eq!(stub.scheduler_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn status_aggregation_stops_at_the_iteration_cap() {
    let stub = Arc::new(StubAdmin {
        unbounded: true,
        ..Default::default()
    });
    let registry = Registry::new();
    let monitor =
        ReplicationStatusMonitor::with_page_delay(stub.clone(), &registry, Duration::ZERO).unwrap();

    monitor.retrieve().await.unwrap();

    assert_eq!(stub.scheduler_calls.load(Ordering::SeqCst), 10);
    let counts = samples(&registry, "cloudant_replication_status_count");
    let total: f64 = counts.iter().map(|(_, v)| v).sum();
    assert_eq!(total, 1000.0);
}

struct AlwaysFailing;

#[async_trait]
impl Monitor for AlwaysFailing {
    fn name(&self) -> &'static str {
        "always_failing"
    }

    async fn retrieve(&self) -> Result<(), ExporterError> {
        Err(ExporterError::Api {
            status: 500,
            body: "boom".to_string(),
        })
    }
}

#[tokio::test]
async fn continuously_failing_monitor_terminates_the_set() {
    let mut monitors = MonitorSet::new(Duration::ZERO);
    monitors.add(Box::new(AlwaysFailing), Duration::from_millis(5));

    let exited = tokio::time::timeout(Duration::from_secs(5), monitors.run_until_first_exit())
        .await
        .expect("monitor set did not terminate");
    assert_eq!(exited, "always_failing");
}

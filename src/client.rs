// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Typed client for the service's administrative HTTP endpoints
//!
//! The monitors depend on the [`CloudantAdmin`] capability trait, not on
//! the concrete client, so tests drive them with stub implementations and
//! never touch the network.
//!
//! The upstream optionality contract for response fields is undocumented,
//! so every numeric field deserializes as `Option`; a missing field skips
//! one sample rather than failing a whole poll.

use async_trait::async_trait;
use prometheus::{IntCounterVec, Opts, Registry};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::config::Config;
use crate::error::ExporterError;
use crate::version;

/// One page of `/_scheduler/docs` results.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchedulerDocsPage {
    #[serde(default)]
    pub docs: Vec<SchedulerDoc>,
}

/// A replication document tracked by the scheduler.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchedulerDoc {
    pub doc_id: Option<String>,
    pub state: Option<String>,
    pub info: Option<ReplicationInfo>,
}

/// Progress counters reported for one replication.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplicationInfo {
    pub changes_pending: Option<i64>,
    pub doc_write_failures: Option<i64>,
    pub docs_read: Option<i64>,
    pub docs_written: Option<i64>,
    pub missing_revisions_found: Option<i64>,
    pub revisions_checked: Option<i64>,
}

/// An entry from `/_active_tasks`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActiveTask {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub node: Option<String>,
    pub pid: Option<String>,
    pub database: Option<String>,
    pub design_document: Option<String>,
    pub doc_id: Option<String>,
    pub total_changes: Option<i64>,
    pub changes_done: Option<i64>,
}

/// Request-rate diagnostics: two parallel histories, one for all traffic
/// and one for traffic denied with 429.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThroughputDiagnostics {
    #[serde(default, alias = "operationHistory", alias = "OperationHistory")]
    pub operation_history: Vec<ThroughputSample>,
    #[serde(default, alias = "deny429History", alias = "Deny429History")]
    pub deny_429_history: Vec<ThroughputSample>,
}

/// One sample of requests per second per operation class.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThroughputSample {
    #[serde(alias = "Ts")]
    pub ts: Option<i64>,
    #[serde(alias = "Lookup")]
    pub lookup: Option<i64>,
    #[serde(alias = "Write")]
    pub write: Option<i64>,
    #[serde(alias = "Query")]
    pub query: Option<i64>,
}

/// Capability to fetch the operational snapshots the monitors translate
/// into metrics. Every operation may fail with a transport error.
#[async_trait]
pub trait CloudantAdmin: Send + Sync {
    /// Scheduler docs filtered to currently running replications.
    async fn running_replications(
        &self,
        limit: u64,
        skip: u64,
    ) -> Result<SchedulerDocsPage, ExporterError>;

    /// One unfiltered page of scheduler docs, for full enumeration.
    async fn scheduler_docs(&self, limit: u64, skip: u64)
        -> Result<SchedulerDocsPage, ExporterError>;

    /// Currently running background operations.
    async fn active_tasks(&self) -> Result<Vec<ActiveTask>, ExporterError>;

    /// Current request-rate diagnostics.
    async fn throughput(&self) -> Result<ThroughputDiagnostics, ExporterError>;
}

/// reqwest-backed implementation of [`CloudantAdmin`].
///
/// Instruments itself: every outbound request bumps
/// `cloudant_exporter_http_request_total{endpoint}`, and failures
/// (transport or non-2xx) bump the matching `_error_total`.
pub struct CloudantClient {
    http: Client,
    base: Url,
    auth: Option<(String, String)>,
    requests_total: IntCounterVec,
    request_errors_total: IntCounterVec,
}

impl CloudantClient {
    pub fn new(config: &Config, registry: &Registry) -> Result<Self, ExporterError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .user_agent(version::USER_AGENT)
            .build()?;

        // Joining relative paths needs a trailing slash on the base.
        let mut base = config.url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let auth = match (&config.username, config.password()) {
            (Some(user), Some(pass)) => Some((user.clone(), pass)),
            (None, None) => None,
            _ => {
                return Err(ExporterError::Config(
                    "username and password must be supplied together".to_string(),
                ))
            }
        };

        let requests_total = IntCounterVec::new(
            Opts::new(
                "cloudant_exporter_http_request_total",
                "Total HTTP requests made to the Cloudant service",
            ),
            &["endpoint"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let request_errors_total = IntCounterVec::new(
            Opts::new(
                "cloudant_exporter_http_request_error_total",
                "Total errors for HTTP requests to the Cloudant service",
            ),
            &["endpoint"],
        )?;
        registry.register(Box::new(request_errors_total.clone()))?;

        Ok(Self {
            http,
            base,
            auth,
            requests_total,
            request_errors_total,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ExporterError> {
        self.requests_total.with_label_values(&[endpoint]).inc();

        let result = self.get_json_inner(path, query).await;
        if result.is_err() {
            self.request_errors_total
                .with_label_values(&[endpoint])
                .inc();
        }
        result
    }

    async fn get_json_inner<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ExporterError> {
        let url = self.base.join(path)?;

        let mut request = self.http.get(url).query(query);
        if let Some((user, pass)) = &self.auth {
            request = request.basic_auth(user, Some(pass));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExporterError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl CloudantAdmin for CloudantClient {
    async fn running_replications(
        &self,
        limit: u64,
        skip: u64,
    ) -> Result<SchedulerDocsPage, ExporterError> {
        self.get_json(
            "scheduler_docs_running",
            "_scheduler/docs",
            &[
                ("limit", limit.to_string()),
                ("skip", skip.to_string()),
                ("states", "running".to_string()),
            ],
        )
        .await
    }

    async fn scheduler_docs(
        &self,
        limit: u64,
        skip: u64,
    ) -> Result<SchedulerDocsPage, ExporterError> {
        self.get_json(
            "scheduler_docs",
            "_scheduler/docs",
            &[("limit", limit.to_string()), ("skip", skip.to_string())],
        )
        .await
    }

    async fn active_tasks(&self) -> Result<Vec<ActiveTask>, ExporterError> {
        self.get_json("active_tasks", "_active_tasks", &[]).await
    }

    async fn throughput(&self) -> Result<ThroughputDiagnostics, ExporterError> {
        self.get_json("ccm_diagnostics", "_api/v2/user/ccm_diagnostics", &[])
            .await
    }
}

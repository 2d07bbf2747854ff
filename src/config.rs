// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Exporter configuration
//!
//! Everything is supplied externally: flags first, environment variables as
//! fallback (so the exporter runs unchanged in a container with only env
//! configuration). Intervals are given in seconds.

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

/// Cloudant/CouchDB Prometheus exporter
#[derive(Parser, Debug, Clone)]
#[command(name = "cloudant-exporter")]
#[command(version, about = "Exports Cloudant operational state as Prometheus metrics", long_about = None)]
pub struct Config {
    /// The address to listen on for HTTP scrape requests
    #[arg(long, env = "LISTEN_ADDRESS", default_value = "127.0.0.1:8080")]
    pub listen_address: SocketAddr,

    /// Base URL of the Cloudant/CouchDB service
    #[arg(long, env = "CLOUDANT_URL")]
    pub url: Url,

    /// Username for basic auth against the admin API
    #[arg(long, env = "CLOUDANT_USERNAME")]
    pub username: Option<String>,

    /// Seconds between replication-progress polls
    #[arg(long, env = "REPLICATION_INTERVAL", default_value_t = 5)]
    pub replication_interval_secs: u64,

    /// Seconds between active-tasks polls
    #[arg(long, env = "ACTIVE_TASKS_INTERVAL", default_value_t = 30)]
    pub active_tasks_interval_secs: u64,

    /// Seconds between throughput polls
    #[arg(long, env = "THROUGHPUT_INTERVAL", default_value_t = 60)]
    pub throughput_interval_secs: u64,

    /// Seconds between full replication-status enumeration passes
    #[arg(long, env = "STATUS_INTERVAL", default_value_t = 600)]
    pub status_interval_secs: u64,

    /// Seconds of continuous failure a monitor tolerates before the
    /// process exits
    #[arg(long, env = "FAILURE_THRESHOLD", default_value_t = 1200)]
    pub failure_threshold_secs: u64,
}

impl Config {
    /// Password for basic auth against the admin API. Deliberately not a
    /// flag: command lines leak through process listings, so the secret
    /// is accepted through the environment only.
    pub fn password(&self) -> Option<String> {
        std::env::var("CLOUDANT_PASSWORD").ok()
    }

    pub fn replication_interval(&self) -> Duration {
        Duration::from_secs(self.replication_interval_secs)
    }

    pub fn active_tasks_interval(&self) -> Duration {
        Duration::from_secs(self.active_tasks_interval_secs)
    }

    pub fn throughput_interval(&self) -> Duration {
        Duration::from_secs(self.throughput_interval_secs)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs)
    }

    pub fn failure_threshold(&self) -> Duration {
        Duration::from_secs(self.failure_threshold_secs)
    }
}

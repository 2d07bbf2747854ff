// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use cloudant_exporter::{
    client::CloudantClient,
    config::Config,
    monitors::{
        ActiveTasksMonitor, ReplicationProgressMonitor, ReplicationStatusMonitor,
        ThroughputMonitor,
    },
    runtime::MonitorSet,
    server, version,
};
use prometheus::Registry;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = Config::parse();

    info!("cloudant-exporter {}", version::VERSION);
    info!("using service at {}", config.url);

    let registry = Registry::new();
    let client = Arc::new(CloudantClient::new(&config, &registry)?);

    let mut monitors = MonitorSet::new(config.failure_threshold());
    monitors.add(
        Box::new(ReplicationProgressMonitor::new(client.clone(), &registry)?),
        config.replication_interval(),
    );
    monitors.add(
        Box::new(ActiveTasksMonitor::new(client.clone(), &registry)?),
        config.active_tasks_interval(),
    );
    monitors.add(
        Box::new(ThroughputMonitor::new(client.clone(), &registry)?),
        config.throughput_interval(),
    );
    monitors.add(
        Box::new(ReplicationStatusMonitor::new(client.clone(), &registry)?),
        config.status_interval(),
    );

    let listen_address = config.listen_address;
    let scrape_registry = registry.clone();
    tokio::spawn(async move {
        if let Err(e) = server::serve(listen_address, scrape_registry).await {
            error!(error = %e, "scrape server failed");
            std::process::exit(1);
        }
    });

    // Any monitor loop terminating takes the whole process down; a
    // supervisor restarts us rather than letting one stale metric
    // category linger.
    let exited = monitors.run_until_first_exit().await;
    error!(monitor = exited, "monitor terminated; shutting down");
    std::process::exit(1);
}

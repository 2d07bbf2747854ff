// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod client;
pub mod config;
pub mod error;
pub mod failbox;
pub mod metrics;
pub mod monitors;
pub mod runtime;
pub mod server;
pub mod version;

// Re-export main types
pub use client::{
    ActiveTask, CloudantAdmin, CloudantClient, ReplicationInfo, SchedulerDoc, SchedulerDocsPage,
    ThroughputDiagnostics, ThroughputSample,
};
pub use config::Config;
pub use error::ExporterError;
pub use failbox::FailureTracker;
pub use metrics::{SettableCounter, SettableCounterVec};
pub use monitors::{Monitor, MonitorLoop};
pub use runtime::MonitorSet;

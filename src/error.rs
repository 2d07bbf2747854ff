// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for the exporter
//!
//! One taxonomy covers both failure classes the monitors care about:
//! - transport/deserialization failures talking to the service
//! - metric construction/registration failures at startup

use thiserror::Error;

/// Errors that can occur while polling the service or registering metrics
#[derive(Error, Debug)]
pub enum ExporterError {
    /// Transport-level failure, including JSON decode errors from reqwest
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("service returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// An endpoint URL could not be built from the configured base
    #[error("invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),

    /// Metric construction or registration failed
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Configuration was structurally invalid
    #[error("invalid configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_parse_errors_map_to_their_own_variant() {
        let parse_error = url::Url::parse("http://[").unwrap_err();
        let error: ExporterError = parse_error.into();
        assert!(matches!(error, ExporterError::Url(_)));
        assert!(error.to_string().starts_with("invalid endpoint URL"));
    }
}

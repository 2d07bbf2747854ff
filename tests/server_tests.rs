// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// tests/server_tests.rs - Scrape endpoint exercised without a socket

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use cloudant_exporter::metrics::SettableCounterVec;
use cloudant_exporter::server;
use http_body_util::BodyExt;
use prometheus::Registry;
use tower::ServiceExt;

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn metrics_endpoint_renders_registered_metrics() {
    let registry = Registry::new();
    let vec = SettableCounterVec::new(
        "cloudant_replication_docs_written_total",
        "Total number of documents written to the target database",
        &["docid"],
    )
    .unwrap();
    registry.register(Box::new(vec.clone())).unwrap();
    vec.with_label_values(&["rep-1"]).set(118.0);

    let app = server::router(registry);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("# TYPE cloudant_replication_docs_written_total counter"));
    assert!(body.contains("cloudant_replication_docs_written_total{docid=\"rep-1\"} 118"));
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let app = server::router(Registry::new());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("\"status\":\"ok\""));
}

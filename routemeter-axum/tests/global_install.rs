//! Process-wide histogram installation through the adapter
//!
//! Kept in its own binary: the histogram can only be installed once per process.
//!
//! Run with: cargo test -p routemeter-axum --test global_install

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    routing::get,
    Router,
};
use tower::ServiceExt;

use routemeter_axum::{RequestTiming, RouteTimingExt};
use routemeter_core::{registry, Error, MetricsConfig, PathDepth, PathLabelPolicy};

#[tokio::test]
async fn test_from_config_installs_process_histogram_once() {
    let config = MetricsConfig {
        path_components: 2,
        ..MetricsConfig::default()
    };

    let timing = RequestTiming::from_config(&config).expect("first install");
    assert_eq!(
        timing.policy(),
        PathLabelPolicy::DepthTruncated(PathDepth::from_components(2))
    );

    let global = registry::global().expect("histogram installed");
    assert_eq!(global.name(), "http_metrics");
    assert_eq!(timing.histogram().name(), global.name());

    let app = Router::new()
        .route("/users/{id}/orders", get(|| async { "orders" }))
        .with_request_timing(timing);
    let request = Request::builder()
        .method(Method::GET)
        .uri("/users/42/orders")
        .body(Body::empty())
        .expect("build request");
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Observed through the adapter, visible through the global accessor
    assert_eq!(global.sample_count("/users/42", "GET"), 1);
    assert_eq!(global.sample_count("/users/42/orders", "GET"), 0);

    let err = RequestTiming::from_config(&config).unwrap_err();
    assert!(
        matches!(err, Error::DuplicateMetric { ref name } if name == "http_metrics"),
        "unexpected error: {err}"
    );
}

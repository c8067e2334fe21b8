// tests/metrics.rs
mod common;

use shuttle_axum::axum::body::{self, Body};
use shuttle_axum::axum::http::{Request, StatusCode};
use tower::ServiceExt;

use common::{harness, FakeFetcher, FakePublisher, RecordingNotifier};
use link_saver::metrics::Metrics;
use link_saver::AppState;

#[tokio::test]
async fn metrics_endpoint_contains_pipeline_series() {
    let metrics = Metrics::init().expect("recorder");
    // a second init reuses the installed recorder
    Metrics::init().expect("recorder reused");

    let ok = harness(
        FakeFetcher::article("Body."),
        FakePublisher::failing(),
        RecordingNotifier::default(),
    );
    ok.pipeline.run(1, "https://a.test").await;
    let failing = harness(
        FakeFetcher::failing("boom"),
        FakePublisher::default(),
        RecordingNotifier::default(),
    );
    failing.pipeline.run(1, "https://b.test").await;

    let app = link_saver::app(
        AppState {
            pipeline: ok.pipeline.clone(),
            secret_token: None,
        },
        &metrics,
    );
    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    // axum::body::to_bytes requires an explicit limit
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in [
        "pipeline_runs_total",
        "pipeline_failures_total{stage=\"extracted\"}",
        "archive_soft_failures_total",
        "pipeline_duration_ms",
    ] {
        assert!(
            text.contains(needle),
            "metrics exposition missing '{needle}'\n{text}"
        );
    }
}

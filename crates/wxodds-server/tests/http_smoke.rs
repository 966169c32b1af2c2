use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use tower::ServiceExt;
use wxodds_core::{
    FetchError, GeoPoint, Granularity, PredictionService, QueryDay, RawMeasurement,
    SeriesFetcher, YearWindow,
};

struct Unreachable;

#[async_trait::async_trait]
impl SeriesFetcher for Unreachable {
    async fn fetch(
        &self,
        _window: &YearWindow,
        _day: QueryDay,
        _point: GeoPoint,
    ) -> Result<Vec<RawMeasurement>, FetchError> {
        Err(FetchError::Network("connection refused".to_string()))
    }
}

fn app() -> axum::Router {
    let service = PredictionService::new(
        Arc::new(Unreachable),
        YearWindow::new(2001, 2024).unwrap(),
        Granularity::HourOfDay,
    );
    wxodds_server::build_app(service).unwrap()
}

#[tokio::test]
async fn home_page_and_script_are_served() {
    let app = app();

    let res = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let ct = res.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(ct.starts_with("text/html"));
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("/static/main.js"));

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/static/main.js")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let ct = res.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(ct.starts_with("text/javascript"));

    // The script reads both "12" and "183:12" bucket keys
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let script = String::from_utf8(body.to_vec()).unwrap();
    assert!(script.contains("function bucketFor"));
    assert!(script.contains("padStart(3, '0')"));
}

#[tokio::test]
async fn health_and_metrics_endpoints() {
    let app = app();

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // One failed prediction feeds both counters
    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/data?unix-time=0&latitude=0&longitude=0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let ct = res.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(ct.starts_with("text/plain"));
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("wxodds_requests_total"));
    assert!(text.contains("wxodds_fetch_failures_total"));
}

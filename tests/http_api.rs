//! In-process tests for the HTTP API, driven through `tower::ServiceExt::oneshot`
//! without binding a socket.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use tower::ServiceExt; // oneshot

const SAMPLE: &str = include_str!("../scenarios/sample.json");

async fn call(req: Request<Body>) -> (StatusCode, Option<String>, serde_json::Value) {
    let resp = pfme::api::router().oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let cache_control = resp
        .headers()
        .get(header::CACHE_CONTROL)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body collect failed");
    let json = serde_json::from_slice(&bytes).expect("body is not valid JSON");
    (status, cache_control, json)
}

fn simulate_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/simulate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test]
async fn simulate_returns_every_metric_series() {
    let (status, cache_control, json) = call(simulate_request(SAMPLE)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache_control.as_deref(), Some("no-store"));
    assert!(json["start_time"].is_string());
    assert!(json.get("args").is_none());

    for name in ["TotalAssets", "HoldingsByAsset", "FIReached", "CashflowStatement"] {
        let series = json["metrics"][name].as_array().expect("series per metric");
        assert_eq!(series.len(), 40, "{name}");
        assert_eq!(series[0]["year"], 2025.0);
    }
    assert!(json["metrics"]["FIReached"][0]["value"].is_boolean());
    assert!(json["metrics"]["TotalAssets"][39]["value"].as_f64().expect("number") > 0.0);
}

#[tokio::test]
async fn simulate_rejects_malformed_scenario() {
    let (status, _, json) = call(simulate_request(r#"{"start_year": "soon"}"#)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        json["error"]
            .as_str()
            .expect("error message")
            .contains("invalid scenario JSON")
    );
}

#[tokio::test]
async fn simulate_reports_missing_provider() {
    let body = r#"{
        "start_year": 2024,
        "end_year": 2025,
        "asset_providers": {},
        "metrics": [],
        "strategies": [{"kind": "earn_post_tax_income"}]
    }"#;
    let (status, _, json) = call(simulate_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No asset provider registered for CASH");
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let req = Request::builder()
        .method("GET")
        .uri("/nope")
        .body(Body::empty())
        .expect("request");
    let (status, _, json) = call(req).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Not found");
}

#[tokio::test]
async fn simulate_rejects_a_step_count_beyond_the_limit() {
    let body = r#"{
        "start_year": 2024,
        "end_year": 2025,
        "increment": 1e-300,
        "asset_providers": {},
        "metrics": [{"kind": "total_assets"}]
    }"#;
    let (status, _, json) = call(simulate_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().expect("error message").contains("steps"));
}

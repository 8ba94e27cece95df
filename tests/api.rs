mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use review_labeler::{
    api::{
        self,
        types::{HealthResponse, PredictResponse},
    },
    model::InferenceService,
};
use tower::ServiceExt;

fn trained_router(dir: &std::path::Path) -> Router {
    common::train_into(dir);
    api::router(Arc::new(common::ready_service(dir)))
}

fn post_json(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_fitted_labels() {
    let dir = tempfile::tempdir().unwrap();
    let response = trained_router(dir.path())
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let health: HealthResponse = read_json(response).await;
    insta::assert_json_snapshot!(health, @r###"
    {
      "status": "ok",
      "labels": [
        "efficacy",
        "side_effect",
        "sleep_quality",
        "taste"
      ]
    }
    "###);
}

#[tokio::test]
async fn predict_returns_one_entry_per_text() {
    let dir = tempfile::tempdir().unwrap();
    let response = trained_router(dir.path())
        .oneshot(post_json(
            r#"{"texts": ["Terrible taste and gave me nightmares every night.", "So chalky"]}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: PredictResponse = read_json(response).await;
    assert_eq!(body.predictions.len(), 2);
    let known = ["efficacy", "side_effect", "sleep_quality", "taste"];
    assert!(body
        .predictions
        .iter()
        .flatten()
        .all(|label| known.contains(&label.as_str())));
}

#[tokio::test]
async fn empty_texts_are_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let response = trained_router(dir.path())
        .oneshot(post_json(r#"{"texts": []}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: PredictResponse = read_json(response).await;
    assert_eq!(
        body,
        PredictResponse {
            predictions: vec![],
            latency_ms: 0.0
        }
    );
}

#[tokio::test]
async fn non_string_entries_fail_the_whole_request() {
    let dir = tempfile::tempdir().unwrap();
    let router = trained_router(dir.path());
    let response = router
        .clone()
        .oneshot(post_json(r#"{"texts": ["works great", 42]}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = router
        .oneshot(post_json(r#"{"text": "works great"}"#))
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn unloaded_service_is_unavailable() {
    let router = api::router(Arc::new(InferenceService::new(8)));
    let response = router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

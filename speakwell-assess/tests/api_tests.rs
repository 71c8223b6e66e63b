//! Integration tests for speakwell-assess HTTP endpoints

mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use helpers::{assessment, network_error, test_app, ScriptedAssessment, ScriptedTranscription};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;

const SENTENCE: &str = "I usually take the bus to work in the morning.";

fn assess_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/assess")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn audio() -> String {
    BASE64.encode([1u8; 128])
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _state) = test_app(ScriptedAssessment::new(vec![]), ScriptedTranscription::new(vec![]));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "speakwell-assess");
    assert!(json.get("last_error").is_none());
}

#[tokio::test]
async fn test_level_endpoint() {
    let (app, _state) = test_app(ScriptedAssessment::new(vec![]), ScriptedTranscription::new(vec![]));

    let response = app
        .oneshot(Request::builder().uri("/api/level/1960").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["level"], 7);
    assert_eq!(json["total_xp"], 1960);
}

#[tokio::test]
async fn test_level_endpoint_rejects_non_numeric() {
    let (app, _state) = test_app(ScriptedAssessment::new(vec![]), ScriptedTranscription::new(vec![]));

    let response = app
        .oneshot(Request::builder().uri("/api/level/lots").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_assess_accepted() {
    let primary = ScriptedAssessment::new(vec![Ok(assessment(SENTENCE, 88.0, 86.0))]);
    let (app, _state) = test_app(primary.clone(), ScriptedTranscription::new(vec![]));

    let response = app
        .oneshot(assess_request(json!({
            "audio_base64": audio(),
            "mime_type": "audio/webm",
            "duration_seconds": 6.5,
            "reference_text": SENTENCE,
            "level": "intermediate",
            "total_xp": 120,
            "streak_days": 3
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["outcome"], "accepted");
    assert_eq!(json["assessment"]["source"], "primary");
    let gained = json["reward"]["total_xp"].as_u64().unwrap();
    assert!(gained > 0);
    assert_eq!(json["progress"]["xp_gained"], gained);
    assert_eq!(json["progress"]["new_total_xp"], 120 + gained);
    assert!(json["submission_id"].as_str().is_some());
    assert_eq!(primary.references(), vec![Some(SENTENCE.to_string())]);
}

#[tokio::test]
async fn test_assess_retry_returns_guidance() {
    let primary = ScriptedAssessment::new(vec![Ok(assessment(SENTENCE, 88.0, 86.0))]);
    let (app, _state) = test_app(primary, ScriptedTranscription::new(vec![]));

    let response = app
        .oneshot(assess_request(json!({
            "audio_base64": audio(),
            "duration_seconds": 1.2,
            "level": "advanced"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["outcome"], "retry");
    assert_eq!(json["retry"]["reason"], "too-short");
    assert_eq!(json["reward"]["total_xp"], 0);
    assert_eq!(json["reward"]["should_retry"], true);
    assert!(json["assessment"].is_null());
}

#[tokio::test]
async fn test_assess_degraded() {
    let primary = ScriptedAssessment::new(vec![Err(network_error())]);
    let secondary = ScriptedTranscription::new(vec![Err(network_error())]);
    let (app, _state) = test_app(primary, secondary);

    let response = app
        .oneshot(assess_request(json!({
            "audio_base64": audio(),
            "duration_seconds": 4.0
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["outcome"], "degraded");
    assert_eq!(json["assessment"]["source"], "degraded-fallback");
}

#[tokio::test]
async fn test_assess_rejects_bad_base64() {
    let (app, _state) = test_app(ScriptedAssessment::new(vec![]), ScriptedTranscription::new(vec![]));

    let response = app
        .oneshot(assess_request(json!({
            "audio_base64": "not base64 !!!",
            "duration_seconds": 4.0
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_assess_rejects_negative_duration() {
    let primary = ScriptedAssessment::new(vec![]);
    let (app, _state) = test_app(primary.clone(), ScriptedTranscription::new(vec![]));

    let response = app
        .oneshot(assess_request(json!({
            "audio_base64": audio(),
            "duration_seconds": -2.0
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(primary.calls(), 0);
}

#[tokio::test]
async fn test_malformed_result_reported_in_health() {
    let primary = ScriptedAssessment::new(vec![Ok(assessment(SENTENCE, 250.0, 86.0))]);
    let (app, _state) = test_app(primary, ScriptedTranscription::new(vec![]));

    let response = app
        .clone()
        .oneshot(assess_request(json!({
            "audio_base64": audio(),
            "duration_seconds": 4.0
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "MALFORMED_RESULT");

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = body_json(response).await;
    assert!(json["last_error"].as_str().unwrap().contains("accuracy"));
}

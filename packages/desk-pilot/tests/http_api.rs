//! Router tests: health, request validation, and the fail-fast configuration
//! paths that must answer with problem details instead of opening a stream.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use desk_pilot::config::Config;
use desk_pilot::router::{build_router, AppState};

fn app_with(config: Config) -> Router {
    build_router(AppState::new(config))
}

fn configured() -> Config {
    Config {
        desktop_api_url: "http://127.0.0.1:9".to_string(),
        desktop_api_key: Some("dk_test".to_string()),
        openai_api_key: Some("sk_test".to_string()),
        gemini_api_key: Some("gk_test".to_string()),
        openai_model: "gpt-4o".to_string(),
        gemini_model: "gemini-2.0-flash".to_string(),
    }
}

async fn send_json(app: &Router, method: Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    let body = if let Some(body) = body {
        builder = builder.header("content-type", "application/json");
        Body::from(body.to_string())
    } else {
        Body::empty()
    };
    let request = builder.body(body).expect("request");
    let response = app.clone().oneshot(request).await.expect("request handled");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or(Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };
    (status, value)
}

fn chat_body(model: Option<&str>) -> Value {
    let mut body = json!({
        "messages": [{ "role": "user", "content": "open the calculator" }],
    });
    if let Some(model) = model {
        body["model"] = json!(model);
    }
    body
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn health_is_up() {
    let app = app_with(Config::default());
    let (status, body) = send_json(&app, Method::GET, "/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_default_provider_key_fails_fast() {
    // Provider defaults to gemini when the request does not name one.
    let app = app_with(Config::default());
    let (status, body) = send_json(&app, Method::POST, "/v1/chat", Some(chat_body(None))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["type"], json!("config"));
    assert_eq!(body["detail"], json!("GEMINI_API_KEY is not set"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_openai_key_fails_fast() {
    let app = app_with(Config::default());
    let (status, body) =
        send_json(&app, Method::POST, "/v1/chat", Some(chat_body(Some("openai")))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], json!("OPENAI_API_KEY is not set"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_desktop_key_fails_before_provisioning() {
    let config = Config {
        desktop_api_key: None,
        ..configured()
    };
    let app = app_with(config);
    let (status, body) = send_json(&app, Method::POST, "/v1/chat", Some(chat_body(None))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["type"], json!("config"));
    assert_eq!(body["detail"], json!("DESKTOP_API_KEY is not set"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn zero_resolution_is_rejected_before_any_sandbox_call() {
    let app = app_with(configured());
    let mut body = chat_body(None);
    body["resolution"] = json!([0, 0]);
    let (status, body) = send_json(&app, Method::POST, "/v1/chat", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["type"], json!("invalid_request"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_model_is_rejected_by_deserialization() {
    let app = app_with(configured());
    let (status, _) =
        send_json(&app, Method::POST, "/v1/chat", Some(chat_body(Some("claude")))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn chat_without_messages_is_rejected() {
    let app = app_with(configured());
    let (status, _) = send_json(&app, Method::POST, "/v1/chat", Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

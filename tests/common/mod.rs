#![allow(dead_code)]

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::Value;

pub use bastion_api::testing::{TestApp, TestResponse, ADMIN_EMAIL, ADMIN_PASSWORD, DEFAULT_PASSWORD};

pub async fn app() -> Result<TestApp> {
    init_tracing();
    TestApp::new().await
}

/// Quiet by default; `RUST_LOG=debug cargo test` shows middleware output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Asserts the three-key error envelope and its consistency with the status.
pub fn assert_envelope(res: &TestResponse, status: StatusCode, tag: &str) {
    assert_eq!(res.status, status, "unexpected status, body: {}", res.text);
    let object = res
        .body
        .as_object()
        .unwrap_or_else(|| panic!("error body is not a JSON object: {}", res.text));
    let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, ["error", "message", "statusCode"], "body: {}", res.text);
    assert_eq!(res.body["statusCode"], Value::from(status.as_u16()));
    assert_eq!(res.body["error"], tag);
    assert!(res.body["message"].as_str().is_some_and(|m| !m.is_empty()));
}

pub fn new_user_body(name: &str, email: &str, role: &str) -> Value {
    serde_json::json!({
        "name": name,
        "email": email,
        "password": DEFAULT_PASSWORD,
        "role": role,
    })
}

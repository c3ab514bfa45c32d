mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};

#[tokio::test]
async fn health_reports_database_state() -> Result<()> {
    let app = common::app().await?;

    let res = app.get("/health", None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "ok");
    assert_eq!(res.body["database"], "ok");
    assert!(res.body["timestamp"].is_string());
    Ok(())
}

#[tokio::test]
async fn root_lists_versioned_groups() -> Result<()> {
    let app = common::app().await?;

    let res = app.get("/", None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["name"], "bastion-api");
    assert!(res.body["endpoints"]["users"]
        .as_str()
        .is_some_and(|s| s.starts_with("/api/v1/users")));
    Ok(())
}

#[tokio::test]
async fn unknown_route_yields_not_found_envelope() -> Result<()> {
    let app = common::app().await?;

    let res = app.get("/api/v1/does-not-exist", None).await?;
    common::assert_envelope(&res, StatusCode::NOT_FOUND, "NOT_FOUND");
    assert_eq!(res.body["message"], "Cannot GET /api/v1/does-not-exist");

    let logs = app.backend.error_logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status_code, 404);
    assert_eq!(logs[0].status_text, "NOT_FOUND");
    assert_eq!(logs[0].path, "/api/v1/does-not-exist");
    Ok(())
}

#[tokio::test]
async fn framework_rejections_are_normalized() -> Result<()> {
    let app = common::app().await?;

    // Wrong method on an existing path: 405 folds into BAD_REQUEST
    let res = app.get(&app.api("/auth/login"), None).await?;
    common::assert_envelope(&res, StatusCode::BAD_REQUEST, "BAD_REQUEST");

    // Malformed JSON
    let request = Request::builder()
        .method(Method::POST)
        .uri(app.api("/auth/login"))
        .header("content-type", "application/json")
        .body(Body::from("{not json"))?;
    let res = app.send(request).await?;
    common::assert_envelope(&res, StatusCode::BAD_REQUEST, "BAD_REQUEST");

    // Missing content type
    let request = Request::builder()
        .method(Method::POST)
        .uri(app.api("/auth/login"))
        .body(Body::from(r#"{"email":"a@b.c","password":"x"}"#))?;
    let res = app.send(request).await?;
    common::assert_envelope(&res, StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_MEDIA_TYPE");

    assert_eq!(app.backend.error_logs().len(), 3);
    Ok(())
}

mod common;

use anyhow::Result;
use axum::http::StatusCode;
use bastion_api::database::models::RoleType;
use serde_json::json;

#[tokio::test]
async fn failing_audit_store_does_not_fail_the_request() -> Result<()> {
    let app = common::app().await?;
    app.backend.set_audits_failing(true);

    let res = app
        .post(
            &app.api("/users/create"),
            Some(&app.admin_token),
            common::new_user_body("Still Created", "still@bastion.test", "EMPLOYEE"),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CREATED, "body: {}", res.text);
    assert_eq!(res.body["email"], "still@bastion.test");
    assert!(app.backend.audits().is_empty());
    assert!(app.backend.error_logs().is_empty());
    Ok(())
}

#[tokio::test]
async fn every_failure_uses_the_same_envelope() -> Result<()> {
    let app = common::app().await?;
    let (_, employee) = app.user_with_role(RoleType::Employee, "shape@bastion.test").await?;

    let res = app.get(&app.api("/users/find-by-uuid?uuid=bad"), Some(&employee)).await?;
    common::assert_envelope(&res, StatusCode::BAD_REQUEST, "BAD_REQUEST");

    let res = app.get(&app.api("/users/list"), None).await?;
    common::assert_envelope(&res, StatusCode::UNAUTHORIZED, "UNAUTHORIZED");

    let res = app.get(&app.api("/audits/list"), Some(&employee)).await?;
    common::assert_envelope(&res, StatusCode::FORBIDDEN, "FORBIDDEN");

    let res = app.get(&app.api("/nowhere"), None).await?;
    common::assert_envelope(&res, StatusCode::NOT_FOUND, "NOT_FOUND");

    let res = app
        .post(&app.api("/email-templates/create"), Some(&app.admin_token), json!({
            "name": "ForgotPassword", "subject": "s", "bodyHtml": "<p>x</p>"
        }))
        .await?;
    common::assert_envelope(&res, StatusCode::CONFLICT, "CONFLICT");

    let res = app.upload(&app.api("/files/create"), &employee, "x.bat", b"@echo", None).await?;
    common::assert_envelope(&res, StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_MEDIA_TYPE");

    assert_eq!(app.backend.error_logs().len(), 6);
    Ok(())
}

#[tokio::test]
async fn error_logs_are_listed_for_admins() -> Result<()> {
    let app = common::app().await?;
    app.get(&app.api("/missing-one"), None).await?;
    app.get(&app.api("/missing-two"), None).await?;
    app.post(&app.api("/auth/login"), None, json!({"email": "x@bastion.test", "password": "nope"}))
        .await?;

    let res = app.get(&app.api("/logs/list"), Some(&app.admin_token)).await?;
    assert_eq!(res.status, StatusCode::OK, "body: {}", res.text);
    assert_eq!(res.body["total"], 3);
    let first = &res.body["data"][0];
    assert!(first["statusCode"].is_number());
    assert!(first["statusText"].is_string());
    assert!(first["path"].as_str().is_some_and(|p| p.starts_with("/api/v1/")));

    let res = app
        .get(&app.api("/logs/list?search=missing-two"), Some(&app.admin_token))
        .await?;
    assert_eq!(res.body["total"], 1);
    assert_eq!(res.body["data"][0]["statusCode"], 404);
    assert_eq!(res.body["data"][0]["statusText"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn audits_are_listed_and_searchable() -> Result<()> {
    let app = common::app().await?;
    let (user, _) = app.user_with_role(RoleType::Employee, "audited@bastion.test").await?;

    app.post(
        &app.api("/users/create"),
        Some(&app.admin_token),
        common::new_user_body("Another One", "another@bastion.test", "EMPLOYEE"),
    )
    .await?;
    app.delete(&app.api(&format!("/users/delete?uuid={}", user.uuid)), Some(&app.admin_token))
        .await?;

    let res = app.get(&app.api("/audits/list"), Some(&app.admin_token)).await?;
    assert_eq!(res.status, StatusCode::OK, "body: {}", res.text);
    assert_eq!(res.body["total"], 2);

    let res = app
        .get(&app.api("/audits/list?search=delete"), Some(&app.admin_token))
        .await?;
    assert_eq!(res.body["total"], 1);
    let entry = &res.body["data"][0];
    assert_eq!(entry["method"], "DELETE");
    assert_eq!(entry["entity"], "users");
    assert_eq!(entry["userUuid"], app.admin.uuid.to_string());
    assert_eq!(entry["oldData"]["email"], "audited@bastion.test");
    Ok(())
}

#[tokio::test]
async fn seeded_templates_can_be_listed_and_found() -> Result<()> {
    let app = common::app().await?;

    let res = app.get(&app.api("/email-templates/list"), Some(&app.admin_token)).await?;
    assert_eq!(res.status, StatusCode::OK, "body: {}", res.text);
    assert_eq!(res.body["total"], 2);
    assert_eq!(res.body["data"][0]["name"], "ForgotPassword");
    assert_eq!(res.body["data"][1]["name"], "Welcome");

    let res = app
        .get(&app.api("/email-templates/find-by-name?name=ForgotPassword"), Some(&app.admin_token))
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["variables"], json!(["name", "code", "resetLink"]));
    assert_eq!(res.body["isActive"], true);

    let res = app
        .get(&app.api("/email-templates/find-by-name?name=Nope"), Some(&app.admin_token))
        .await?;
    common::assert_envelope(&res, StatusCode::NOT_FOUND, "NOT_FOUND");

    let res = app.get(&app.api("/email-templates/find-by-name"), Some(&app.admin_token)).await?;
    common::assert_envelope(&res, StatusCode::BAD_REQUEST, "BAD_REQUEST");
    Ok(())
}

#[tokio::test]
async fn templates_can_be_created_by_admins_only() -> Result<()> {
    let app = common::app().await?;
    let (_, manager) = app.user_with_role(RoleType::Manager, "tmpl@bastion.test").await?;
    let body = json!({
        "name": "Invoice",
        "subject": "Invoice {{ number }}",
        "bodyHtml": "<p>Invoice {{ number }} for {{ name }}</p>",
        "variables": ["number", "name"],
        "category": "billing"
    });

    let res = app.post(&app.api("/email-templates/create"), Some(&manager), body.clone()).await?;
    common::assert_envelope(&res, StatusCode::FORBIDDEN, "FORBIDDEN");

    let res = app.post(&app.api("/email-templates/create"), Some(&app.admin_token), body).await?;
    assert_eq!(res.status, StatusCode::CREATED, "body: {}", res.text);
    assert_eq!(res.body["version"], 1);
    assert_eq!(res.body["isActive"], true);

    let audits = app.backend.audits();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].entity, "email-templates");

    let res = app
        .post(&app.api("/email-templates/create"), Some(&app.admin_token), json!({"name": "", "subject": "", "bodyHtml": ""}))
        .await?;
    common::assert_envelope(&res, StatusCode::BAD_REQUEST, "BAD_REQUEST");
    Ok(())
}

#[tokio::test]
async fn failing_error_log_store_keeps_the_envelope() -> Result<()> {
    let app = common::app().await?;
    app.backend.set_error_logs_failing(true);

    let res = app.get(&app.api("/users/find-by-uuid?uuid=bad"), Some(&app.admin_token)).await?;
    common::assert_envelope(&res, StatusCode::BAD_REQUEST, "BAD_REQUEST");
    assert_eq!(res.body["message"], "Invalid uuid: bad");
    assert!(app.backend.error_logs().is_empty());
    Ok(())
}

#[tokio::test]
async fn handler_panic_becomes_a_generic_500() -> Result<()> {
    let mut app = common::app().await?;
    app.mount(vec![bastion_api::testing::fault_routes()]);

    let res = app.get(&app.api("/faults/panic"), None).await?;
    common::assert_envelope(&res, StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR");
    assert_eq!(res.body["message"], "Internal server error");
    assert!(!res.text.contains("postgres://secret"), "body: {}", res.text);

    let logs = app.backend.error_logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status_code, 500);
    assert!(!logs[0].error.contains("postgres://secret"));
    Ok(())
}

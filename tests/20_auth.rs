mod common;

use anyhow::Result;
use axum::http::StatusCode;
use bastion_api::database::models::RoleType;
use serde_json::json;

#[tokio::test]
async fn login_with_valid_credentials_returns_token_and_user() -> Result<()> {
    let app = common::app().await?;

    let res = app
        .post(
            &app.api("/auth/login"),
            None,
            json!({"email": common::ADMIN_EMAIL, "password": common::ADMIN_PASSWORD}),
        )
        .await?;

    assert_eq!(res.status, StatusCode::CREATED, "body: {}", res.text);
    assert_eq!(res.body["user"]["email"], common::ADMIN_EMAIL);
    assert_eq!(res.body["user"]["role"], "ADMIN");
    assert!(res.body["user"].get("passwordHash").is_none());

    let token = res.body["accessToken"].as_str().unwrap_or_default();
    let claims = app.state.tokens.verify(token)?;
    assert_eq!(claims.user_uuid, app.admin.uuid);
    assert_eq!(claims.email, common::ADMIN_EMAIL);

    // Logins are public and never audited
    assert!(app.backend.audits().is_empty());
    Ok(())
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() -> Result<()> {
    let app = common::app().await?;

    let res = app
        .post(
            &app.api("/auth/login"),
            None,
            json!({"email": common::ADMIN_EMAIL, "password": "Wrong@123"}),
        )
        .await?;
    common::assert_envelope(&res, StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
    assert_eq!(res.body["message"], "Invalid email or password.");

    let unknown = app
        .post(
            &app.api("/auth/login"),
            None,
            json!({"email": "ghost@bastion.test", "password": "Wrong@123"}),
        )
        .await?;
    common::assert_envelope(&unknown, StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
    assert_eq!(unknown.body["message"], res.body["message"]);
    Ok(())
}

#[tokio::test]
async fn login_email_is_case_insensitive() -> Result<()> {
    let app = common::app().await?;

    let res = app
        .post(
            &app.api("/auth/login"),
            None,
            json!({"email": "  ADMIN@Bastion.Test ", "password": common::ADMIN_PASSWORD}),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CREATED, "body: {}", res.text);
    Ok(())
}

#[tokio::test]
async fn verify_token_returns_resolved_user() -> Result<()> {
    let app = common::app().await?;
    let (employee, token) = app.user_with_role(RoleType::Employee, "worker@bastion.test").await?;

    let res = app.get(&app.api("/auth/verify-token"), Some(&token)).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["uuid"], employee.uuid.to_string());
    assert_eq!(res.body["role"], "EMPLOYEE");
    Ok(())
}

#[tokio::test]
async fn protected_routes_reject_missing_or_bad_tokens() -> Result<()> {
    let app = common::app().await?;
    let uri = app.api("/auth/verify-token");

    let res = app.get(&uri, None).await?;
    common::assert_envelope(&res, StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
    assert_eq!(res.body["message"], "Missing Authorization header");

    let res = app.get(&uri, Some("not.a.jwt")).await?;
    common::assert_envelope(&res, StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
    assert_eq!(res.body["message"], "Invalid or expired token.");
    Ok(())
}

#[tokio::test]
async fn token_of_removed_user_is_rejected() -> Result<()> {
    let app = common::app().await?;
    let (employee, token) = app.user_with_role(RoleType::Employee, "leaver@bastion.test").await?;

    let res = app
        .delete(
            &app.api(&format!("/users/delete?uuid={}", employee.uuid)),
            Some(&app.admin_token),
        )
        .await?;
    assert_eq!(res.status, StatusCode::OK, "body: {}", res.text);

    let res = app.get(&app.api("/auth/verify-token"), Some(&token)).await?;
    common::assert_envelope(&res, StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
    assert_eq!(res.body["message"], "User not found! Use a valid token or login again.");
    Ok(())
}

#[tokio::test]
async fn register_is_admin_only_and_audited_without_token() -> Result<()> {
    let app = common::app().await?;
    let (_, manager_token) = app.user_with_role(RoleType::Manager, "boss@bastion.test").await?;
    let body = common::new_user_body("New Person", "new.person@bastion.test", "EMPLOYEE");

    let res = app.post(&app.api("/auth/register"), Some(&manager_token), body.clone()).await?;
    common::assert_envelope(&res, StatusCode::FORBIDDEN, "FORBIDDEN");

    let res = app.post(&app.api("/auth/register"), Some(&app.admin_token), body).await?;
    assert_eq!(res.status, StatusCode::CREATED, "body: {}", res.text);
    assert!(res.body["accessToken"].as_str().is_some_and(|t| !t.is_empty()));

    let audits = app.backend.audits();
    assert_eq!(audits.len(), 1);
    let audit = &audits[0];
    assert_eq!(audit.entity, "auth");
    assert_eq!(audit.method, "POST");
    assert_eq!(audit.user_uuid, Some(app.admin.uuid));
    assert_eq!(audit.url, "/api/v1/auth/register");
    let new_data = audit.new_data.as_ref().expect("new data captured");
    assert_eq!(new_data["accessToken"], "[REDACTED]");
    assert_eq!(new_data["user"]["email"], "new.person@bastion.test");
    Ok(())
}

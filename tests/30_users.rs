mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use bastion_api::database::models::RoleType;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn create_user_returns_created_user_without_hash() -> Result<()> {
    let app = common::app().await?;

    let res = app
        .post(
            &app.api("/users/create"),
            Some(&app.admin_token),
            common::new_user_body("Maria Silva", "Maria@Bastion.Test", "MANAGER"),
        )
        .await?;

    assert_eq!(res.status, StatusCode::CREATED, "body: {}", res.text);
    assert_eq!(res.body["email"], "maria@bastion.test");
    assert_eq!(res.body["role"], "MANAGER");
    assert!(res.body.get("passwordHash").is_none());

    let audits = app.backend.audits();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].entity, "users");
    assert_eq!(audits[0].method, "POST");
    assert!(audits[0].old_data.is_none());
    assert_eq!(audits[0].new_data.as_ref().map(|d| d["email"].clone()), Some(json!("maria@bastion.test")));
    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_a_conflict_logged_once() -> Result<()> {
    let app = common::app().await?;
    let body = common::new_user_body("First Person", "dup@bastion.test", "EMPLOYEE");

    let res = app.post(&app.api("/users/create"), Some(&app.admin_token), body.clone()).await?;
    assert_eq!(res.status, StatusCode::CREATED);

    let res = app.post(&app.api("/users/create"), Some(&app.admin_token), body).await?;
    common::assert_envelope(&res, StatusCode::CONFLICT, "CONFLICT");
    assert_eq!(res.body["message"], "User already exists with this email.");

    let logs = app.backend.error_logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status_code, 409);
    assert_eq!(logs[0].status_text, "CONFLICT");
    assert_eq!(logs[0].method, "POST");
    assert_eq!(logs[0].path, "/api/v1/users/create");

    // Failed mutations leave no audit behind
    assert_eq!(app.backend.audits().len(), 1);
    Ok(())
}

#[tokio::test]
async fn invalid_payload_is_rejected_with_validation_message() -> Result<()> {
    let app = common::app().await?;

    let res = app
        .post(
            &app.api("/users/create"),
            Some(&app.admin_token),
            json!({"name": "Weak Pass", "email": "weak@bastion.test", "password": "weak", "role": "EMPLOYEE"}),
        )
        .await?;
    common::assert_envelope(&res, StatusCode::BAD_REQUEST, "BAD_REQUEST");
    assert!(res.body["message"].as_str().unwrap_or_default().contains("password"));

    let res = app
        .post(
            &app.api("/users/create"),
            Some(&app.admin_token),
            json!({"name": "Bad Role", "email": "role@bastion.test", "password": common::DEFAULT_PASSWORD, "role": "OWNER"}),
        )
        .await?;
    common::assert_envelope(&res, StatusCode::BAD_REQUEST, "BAD_REQUEST");
    assert!(app.backend.audits().is_empty());
    Ok(())
}

#[tokio::test]
async fn list_paginates_and_searches() -> Result<()> {
    let app = common::app().await?;
    for i in 0..11 {
        app.user_with_role(RoleType::Employee, &format!("staff{}@bastion.test", i)).await?;
    }
    // 11 employees plus the administrator
    let res = app
        .get(&app.api("/users/list?page=2&dataPerPage=5"), Some(&app.admin_token))
        .await?;
    assert_eq!(res.status, StatusCode::OK, "body: {}", res.text);
    assert_eq!(res.body["total"], 12);
    assert_eq!(res.body["actualPage"], 2);
    assert_eq!(res.body["totalPages"], 3);
    assert_eq!(res.body["data"].as_array().map(Vec::len), Some(5));

    let res = app
        .get(&app.api("/users/list?page=3&dataPerPage=5"), Some(&app.admin_token))
        .await?;
    assert_eq!(res.body["data"].as_array().map(Vec::len), Some(2));

    // Malformed values fall back to defaults, oversized pages are clamped
    let res = app
        .get(&app.api("/users/list?page=abc&dataPerPage=-3"), Some(&app.admin_token))
        .await?;
    assert_eq!(res.body["actualPage"], 1);
    assert_eq!(res.body["data"].as_array().map(Vec::len), Some(10));

    let res = app
        .get(&app.api("/users/list?dataPerPage=5000"), Some(&app.admin_token))
        .await?;
    assert_eq!(res.body["totalPages"], 1);
    assert_eq!(res.body["data"].as_array().map(Vec::len), Some(12));

    let res = app
        .get(&app.api("/users/list?search=ADMINISTRATOR"), Some(&app.admin_token))
        .await?;
    assert_eq!(res.body["total"], 1);
    assert_eq!(res.body["data"][0]["email"], common::ADMIN_EMAIL);
    Ok(())
}

#[tokio::test]
async fn list_is_limited_to_admins_and_managers() -> Result<()> {
    let app = common::app().await?;
    let (_, employee) = app.user_with_role(RoleType::Employee, "emp@bastion.test").await?;
    let (_, manager) = app.user_with_role(RoleType::Manager, "mgr@bastion.test").await?;
    let uri = app.api("/users/list");

    let res = app.get(&uri, Some(&employee)).await?;
    common::assert_envelope(&res, StatusCode::FORBIDDEN, "FORBIDDEN");
    assert_eq!(res.body["message"], "You do not have permission to access this resource");

    let res = app.get(&uri, Some(&manager)).await?;
    assert_eq!(res.status, StatusCode::OK);

    // Managers still cannot mutate users
    let res = app
        .post(
            &app.api("/users/create"),
            Some(&manager),
            common::new_user_body("Nope Nope", "nope@bastion.test", "EMPLOYEE"),
        )
        .await?;
    common::assert_envelope(&res, StatusCode::FORBIDDEN, "FORBIDDEN");
    Ok(())
}

#[tokio::test]
async fn find_by_uuid_validates_the_query() -> Result<()> {
    let app = common::app().await?;
    let (_, token) = app.user_with_role(RoleType::Employee, "finder@bastion.test").await?;

    let res = app
        .get(&app.api(&format!("/users/find-by-uuid?uuid={}", app.admin.uuid)), Some(&token))
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["email"], common::ADMIN_EMAIL);

    let res = app.get(&app.api("/users/find-by-uuid"), Some(&token)).await?;
    common::assert_envelope(&res, StatusCode::BAD_REQUEST, "BAD_REQUEST");
    assert_eq!(res.body["message"], "Query parameter 'uuid' is required");

    let res = app.get(&app.api("/users/find-by-uuid?uuid=nope"), Some(&token)).await?;
    common::assert_envelope(&res, StatusCode::BAD_REQUEST, "BAD_REQUEST");

    let res = app
        .get(&app.api(&format!("/users/find-by-uuid?uuid={}", Uuid::new_v4())), Some(&token))
        .await?;
    common::assert_envelope(&res, StatusCode::NOT_FOUND, "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn update_is_audited_with_before_and_after() -> Result<()> {
    let app = common::app().await?;
    let (user, _) = app.user_with_role(RoleType::Employee, "promote@bastion.test").await?;

    let res = app
        .put(
            &app.api(&format!("/users/update?uuid={}", user.uuid)),
            Some(&app.admin_token),
            json!({"name": "Promoted Person", "role": "MANAGER"}),
        )
        .await?;
    assert_eq!(res.status, StatusCode::OK, "body: {}", res.text);
    assert_eq!(res.body["name"], "Promoted Person");
    assert_eq!(res.body["role"], "MANAGER");
    assert_eq!(res.body["email"], "promote@bastion.test");

    let audits = app.backend.audits();
    assert_eq!(audits.len(), 1);
    let audit = &audits[0];
    assert_eq!(audit.method, "PUT");
    let old = audit.old_data.as_ref().expect("snapshot before update");
    assert_eq!(old["role"], "EMPLOYEE");
    assert!(old.get("passwordHash").is_none());
    assert_eq!(audit.new_data.as_ref().map(|d| d["role"].clone()), Some(json!("MANAGER")));

    let res = app
        .request(
            Method::PATCH,
            &app.api(&format!("/users/patch?uuid={}", user.uuid)),
            Some(&app.admin_token),
            Some(json!({"email": common::ADMIN_EMAIL})),
        )
        .await?;
    common::assert_envelope(&res, StatusCode::CONFLICT, "CONFLICT");
    assert_eq!(app.backend.audits().len(), 1);
    Ok(())
}

#[tokio::test]
async fn deleting_missing_user_is_not_found_and_not_audited() -> Result<()> {
    let app = common::app().await?;

    let res = app
        .delete(
            &app.api(&format!("/users/delete?uuid={}", Uuid::new_v4())),
            Some(&app.admin_token),
        )
        .await?;
    common::assert_envelope(&res, StatusCode::NOT_FOUND, "NOT_FOUND");
    assert_eq!(res.body["message"], "User not found");
    assert!(app.backend.audits().is_empty());
    Ok(())
}

#[tokio::test]
async fn soft_and_hard_delete() -> Result<()> {
    let app = common::app().await?;
    let (soft, _) = app.user_with_role(RoleType::Employee, "soft@bastion.test").await?;
    let (hard, _) = app.user_with_role(RoleType::Employee, "hard@bastion.test").await?;

    let res = app
        .delete(&app.api(&format!("/users/delete?uuid={}", soft.uuid)), Some(&app.admin_token))
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "User deleted successfully!");
    assert!(app
        .backend
        .all_users()
        .iter()
        .any(|u| u.uuid == soft.uuid && u.deleted_at.is_some()));

    // Soft-deleted users vanish from reads and lists
    let res = app
        .get(&app.api(&format!("/users/find-by-uuid?uuid={}", soft.uuid)), Some(&app.admin_token))
        .await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    // The email stays reserved
    let res = app
        .post(
            &app.api("/users/create"),
            Some(&app.admin_token),
            common::new_user_body("Soft Again", "soft@bastion.test", "EMPLOYEE"),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = app
        .delete(&app.api(&format!("/users/hard-delete?uuid={}", hard.uuid)), Some(&app.admin_token))
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert!(!app.backend.all_users().iter().any(|u| u.uuid == hard.uuid));

    let audits = app.backend.audits();
    assert_eq!(audits.len(), 2);
    for audit in &audits {
        assert_eq!(audit.method, "DELETE");
        assert!(audit.old_data.is_some());
    }
    Ok(())
}

//! Account and token flows.
//!
//! These tests require a running, migrated server (see the crate docs).

use cafe_calories_integration_tests::{Api, PASSWORD, unique_email};
use reqwest::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_register_then_login_authenticates_same_user() {
    let api = Api::new();
    let session = api.account("user").await;

    let me = api
        .expect_json(Method::GET, "/users/me", Some(&session), None, StatusCode::OK)
        .await;

    assert_eq!(me["id"].as_i64(), Some(session.id));
    assert_eq!(me["role"], "USER");
    assert!(me.get("password_hash").is_none());
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_duplicate_email_is_rejected() {
    let api = Api::new();
    let session = api.account("user").await;

    let body = api
        .expect_json(
            Method::POST,
            "/users/register",
            None,
            Some(json!({ "email": session.email, "name": "Again", "password": PASSWORD })),
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert_eq!(body["detail"], "Email already registered");
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_admin_cannot_self_register() {
    let api = Api::new();
    api.expect_json(
        Method::POST,
        "/users/register",
        None,
        Some(json!({
            "email": unique_email("admin"),
            "name": "Root",
            "password": PASSWORD,
            "role": "ADMIN",
        })),
        StatusCode::FORBIDDEN,
    )
    .await;
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_login_with_wrong_role_is_unauthorized() {
    let api = Api::new();
    let session = api.account("user").await;

    api.expect_json(
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": session.email, "password": PASSWORD, "role": "driver" })),
        StatusCode::UNAUTHORIZED,
    )
    .await;
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_deactivated_account_loses_access() {
    let api = Api::new();
    let session = api.account("user").await;

    api.expect_json(Method::DELETE, "/users/me", Some(&session), None, StatusCode::OK)
        .await;

    api.expect_json(Method::GET, "/users/me", Some(&session), None, StatusCode::UNAUTHORIZED)
        .await;
    api.expect_json(
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": session.email, "password": PASSWORD })),
        StatusCode::UNAUTHORIZED,
    )
    .await;
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_refresh_is_not_implemented() {
    let api = Api::new();
    api.expect_json(
        Method::GET,
        "/auth/refresh_token",
        None,
        None,
        StatusCode::NOT_IMPLEMENTED,
    )
    .await;
}

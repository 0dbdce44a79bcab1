mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, TestApp, ADMIN_PASSWORD};
use serde_json::json;

#[tokio::test]
async fn login_issues_usable_tokens() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "username": "admin", "password": ADMIN_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let tokens = body_json(response).await;
    assert_eq!(tokens["token_type"], "Bearer");
    let access = tokens["access_token"].as_str().unwrap().to_string();

    let me = app
        .request(Method::GET, "/api/v1/users/me", None, Some(&access))
        .await;
    assert_eq!(me.status(), StatusCode::OK);
    let profile = body_json(me).await;
    assert_eq!(profile["username"], "admin");
    assert!(profile.get("password_hash").is_none());
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "username": "admin", "password": "nope" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_rotates_and_logout_revokes() {
    let app = TestApp::new().await;
    let tokens = body_json(
        app.request(
            Method::POST,
            "/auth/login",
            Some(json!({ "username": "admin", "password": ADMIN_PASSWORD })),
            None,
        )
        .await,
    )
    .await;
    let refresh = tokens["refresh_token"].as_str().unwrap().to_string();

    let refreshed = app
        .request(
            Method::POST,
            "/auth/refresh",
            Some(json!({ "refresh_token": refresh })),
            None,
        )
        .await;
    assert_eq!(refreshed.status(), StatusCode::OK);
    let new_access = body_json(refreshed).await["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    // The old refresh token is spent
    let reused = app
        .request(
            Method::POST,
            "/auth/refresh",
            Some(json!({ "refresh_token": refresh })),
            None,
        )
        .await;
    assert_eq!(reused.status(), StatusCode::UNAUTHORIZED);

    let logout = app
        .request(Method::POST, "/auth/logout", None, Some(&new_access))
        .await;
    assert_eq!(logout.status(), StatusCode::OK);

    let after = app
        .request(Method::GET, "/api/v1/users/me", None, Some(&new_access))
        .await;
    assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn api_requires_a_token() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/api/v1/orders", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_reports_database() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["checks"]["database"], "healthy");
}

#[tokio::test]
async fn request_id_is_echoed() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

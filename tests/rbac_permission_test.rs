mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn clerk_can_view_orders_but_not_edit() {
    let app = TestApp::new().await;

    let view = app
        .request(Method::GET, "/api/v1/orders", None, Some(app.clerk_token()))
        .await;
    assert_eq!(view.status(), StatusCode::OK);

    let edit = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({ "customer_id": 1, "product_id": 1, "quantity": 1 })),
            Some(app.clerk_token()),
        )
        .await;
    assert_eq!(edit.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn clerk_is_kept_out_of_other_modules() {
    let app = TestApp::new().await;
    for uri in [
        "/api/v1/products",
        "/api/v1/employees",
        "/api/v1/purchasing",
        "/api/v1/stock",
        "/api/v1/admin-activities",
        "/api/v1/users",
    ] {
        let response = app
            .request(Method::GET, uri, None, Some(app.clerk_token()))
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "GET {}", uri);
    }
}

#[tokio::test]
async fn granted_permissions_apply_to_new_tokens() {
    let app = TestApp::new().await;
    let clerk_id = body_json(
        app.request(Method::GET, "/api/v1/users/me", None, Some(app.clerk_token()))
            .await,
    )
    .await["id"]
        .as_i64()
        .unwrap();

    let updated = app
        .admin(
            Method::PUT,
            &format!("/api/v1/users/{}/permissions", clerk_id),
            Some(json!({ "permissions": { "products": { "view": true } } })),
        )
        .await;
    assert_eq!(updated.status(), StatusCode::OK);

    let login = body_json(
        app.request(
            Method::POST,
            "/auth/login",
            Some(json!({ "username": "clerk", "password": common::CLERK_PASSWORD })),
            None,
        )
        .await,
    )
    .await;
    let token = login["access_token"].as_str().unwrap();

    let products = app
        .request(Method::GET, "/api/v1/products", None, Some(token))
        .await;
    assert_eq!(products.status(), StatusCode::OK);
    let orders = app
        .request(Method::GET, "/api/v1/orders", None, Some(token))
        .await;
    assert_eq!(orders.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_permission_module_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .admin(
            Method::PUT,
            "/api/v1/users/2/permissions",
            Some(json!({ "warp_drive": { "view": true } })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_cannot_delete_themselves() {
    let app = TestApp::new().await;
    let me = body_json(app.admin(Method::GET, "/api/v1/users/me", None).await).await;
    let response = app
        .admin(
            Method::DELETE,
            &format!("/api/v1/users/{}", me["id"]),
            None,
        )
        .await;
    assert!(response.status().is_client_error());
}

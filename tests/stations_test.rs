mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn station_names_are_unique() {
    let app = TestApp::new().await;
    app.station("Adama").await;
    let other = app.station("Hawassa").await;

    let duplicate = app
        .admin(
            Method::POST,
            "/api/v1/duty-stations",
            Some(json!({ "name": "Adama" })),
        )
        .await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let rename = app
        .admin(
            Method::PUT,
            &format!("/api/v1/duty-stations/{}", other),
            Some(json!({ "name": "Adama" })),
        )
        .await;
    assert_eq!(rename.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn stations_in_use_cannot_be_deleted() {
    let app = TestApp::new().await;
    let station = app.station("Addis Ababa").await;

    // Only a purchase request points at this station
    app.create(
        "/api/v1/purchasing/requests",
        json!({
            "dept_name": "Spare Parts",
            "duty_station_id": station,
            "item_name": "Bearing",
            "description": "6204 bearings",
            "unit_of_measure": "pcs",
            "quantity": 20,
        }),
    )
    .await;

    let response = app
        .admin(
            Method::DELETE,
            &format!("/api/v1/duty-stations/{}", station),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("still referenced"));

    app.get_json(&format!("/api/v1/duty-stations/{}", station))
        .await;
}

#[tokio::test]
async fn unused_stations_are_deleted() {
    let app = TestApp::new().await;
    let station = app.station("Kombolcha").await;

    let response = app
        .admin(
            Method::DELETE,
            &format!("/api/v1/duty-stations/{}", station),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let gone = app
        .admin(
            Method::GET,
            &format!("/api/v1/duty-stations/{}", station),
            None,
        )
        .await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

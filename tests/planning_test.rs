mod common;

use axum::http::{Method, StatusCode};
use common::{body_bytes, body_json, TestApp};
use serde_json::json;

async fn seed_plan(app: &TestApp, product: i64) -> serde_json::Value {
    app.create(
        "/api/v1/planning/plans",
        json!({
            "start_date": "2024-01-01",
            "end_date": "2024-01-07",
            "rows": [{
                "product_id": product,
                "daily": { "2024-01-01": 10.0, "2024-01-02": 5.0, "2024-02-01": 99.0 },
            }],
        }),
    )
    .await
}

#[tokio::test]
async fn plans_sum_only_days_inside_the_range() {
    let app = TestApp::new().await;
    let product = app.product("Poplin", "WOV-1", 20.0).await;

    let plans = seed_plan(&app, product).await;
    let plan = &plans[0];
    assert_eq!(plan["planned_quantity"], 15.0);
    assert_eq!(plan["planned_value"], 300.0);
}

#[tokio::test]
async fn empty_plan_rows_are_rejected() {
    let app = TestApp::new().await;
    let product = app.product("Poplin", "WOV-1", 20.0).await;
    let response = app
        .admin(
            Method::POST,
            "/api/v1/planning/plans",
            Some(json!({
                "start_date": "2024-01-01",
                "end_date": "2024-01-07",
                "rows": [{ "product_id": product, "daily": {} }],
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn plan_edits_are_logged() {
    let app = TestApp::new().await;
    let product = app.product("Poplin", "WOV-1", 20.0).await;
    let plan_id = seed_plan(&app, product).await[0]["id"].as_i64().unwrap();

    let updated = app
        .admin(
            Method::PUT,
            &format!("/api/v1/planning/plans/{}", plan_id),
            Some(json!({ "planned_quantity": 30.0, "planned_value": 600.0 })),
        )
        .await;
    assert_eq!(updated.status(), StatusCode::OK);

    let log = app
        .get_json(&format!("/api/v1/planning/plans/{}/changes", plan_id))
        .await;
    let entries = log.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["old_value"], 300.0);
    assert_eq!(entries[0]["new_value"], 600.0);

    let deleted = app
        .admin(
            Method::DELETE,
            &format!("/api/v1/planning/plans/{}", plan_id),
            None,
        )
        .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    let gone = app
        .admin(
            Method::GET,
            &format!("/api/v1/planning/plans/{}/changes", plan_id),
            None,
        )
        .await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn summary_splits_direct_and_service() {
    let app = TestApp::new().await;
    let product = app.product("Poplin", "WOV-1", 20.0).await;
    seed_plan(&app, product).await;

    let summary = app.get_json("/api/v1/planning/summary").await;
    assert_eq!(summary["direct"]["planned_quantity"], 15.0);
    assert_eq!(summary["service"]["planned_quantity"], 0.0);

    let pareto = app.get_json("/api/v1/planning/pareto").await;
    assert_eq!(pareto[0]["product"], "Poplin");
}

#[tokio::test]
async fn planning_export_rejects_unknown_period() {
    let app = TestApp::new().await;
    let ok = app
        .admin(Method::GET, "/api/v1/planning/export/summary", None)
        .await;
    assert_eq!(ok.status(), StatusCode::OK);
    assert!(!body_bytes(ok).await.is_empty());

    let bad = app
        .admin(Method::GET, "/api/v1/planning/export/fortnightly", None)
        .await;
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    let _ = body_json(bad).await;
}

mod common;

use axum::http::{Method, StatusCode};
use common::{body_bytes, TestApp};
use serde_json::json;

async fn loom(app: &TestApp, station: i64) -> i64 {
    app.create(
        "/api/v1/production/machines",
        json!({
            "name": "Loom 1",
            "duty_station_id": station,
            "process_type": "Weaving",
            "installed_capacity": 10.0,
            "efficiency_factor": 0.5,
        }),
    )
    .await["id"]
        .as_i64()
        .unwrap()
}

#[tokio::test]
async fn options_list_processes_periods_and_units() {
    let app = TestApp::new().await;
    let options = app.get_json("/api/v1/production/options").await;
    assert_eq!(options["process_types"].as_array().unwrap().len(), 7);
    assert!(options["period_types"]
        .as_array()
        .unwrap()
        .contains(&json!("Semi-Annual")));
    assert_eq!(options["units"], json!(["Kg", "Pcs"]));
}

#[tokio::test]
async fn records_compare_actual_output_with_capacity() {
    let app = TestApp::new().await;
    let station = app.station("Bahir Dar").await;
    let machine = loom(&app, station).await;

    // 10 × 0.5 × 8 h × 25 days
    let record = app
        .create(
            "/api/v1/production/records",
            json!({
                "machine_id": machine,
                "period_type": "Monthly",
                "start_date": "2024-01-01",
                "end_date": "2024-01-31",
                "actual_quantity": 750.0,
                "uom": "Kg",
            }),
        )
        .await;
    assert_eq!(record["utilized_capacity"], 75.0);

    app.create(
        "/api/v1/production/records",
        json!({
            "machine_id": machine,
            "period_type": "Weekly",
            "start_date": "2024-01-01",
            "end_date": "2024-01-07",
            "actual_quantity": 100.0,
            "uom": "Kg",
        }),
    )
    .await;

    let report = app.get_json("/api/v1/production/report").await;
    assert_eq!(report["period_type"], "Monthly");
    let processes = report["processes"].as_array().unwrap();
    assert_eq!(processes.len(), 1);
    assert_eq!(processes[0]["process_type"], "Weaving");
    assert_eq!(processes[0]["plan"], 1000.0);
    assert_eq!(processes[0]["actual"], 750.0);
    assert_eq!(processes[0]["perf"], 75.0);
    assert_eq!(report["average_performance"], 75.0);
    assert_eq!(report["rows"][0]["factory"], "Bahir Dar");
    assert_eq!(report["factory_contributions"]["Bahir Dar"], 100.0);

    let weekly = app
        .get_json("/api/v1/production/report?period_type=Weekly")
        .await;
    assert_eq!(weekly["rows"][0]["actual"], 100.0);

    let outside = app
        .get_json("/api/v1/production/report?start=2024-02-01")
        .await;
    assert!(outside["rows"].as_array().unwrap().is_empty());

    let export = app
        .admin(Method::GET, "/api/v1/production/report/export", None)
        .await;
    assert_eq!(export.status(), StatusCode::OK);
    let csv = String::from_utf8(body_bytes(export).await).unwrap();
    assert!(csv.contains("Bahir Dar"));
}

#[tokio::test]
async fn manual_capacity_overrides_the_formula() {
    let app = TestApp::new().await;
    let station = app.station("Mekelle").await;
    let machine = app
        .create(
            "/api/v1/production/machines",
            json!({
                "name": "Circular Knitter",
                "duty_station_id": station,
                "process_type": "Knitting",
                "installed_capacity": 10.0,
                "manual_capacity": 400.0,
            }),
        )
        .await["id"]
        .as_i64()
        .unwrap();

    let record = app
        .create(
            "/api/v1/production/records",
            json!({
                "machine_id": machine,
                "period_type": "Monthly",
                "start_date": "2024-03-01",
                "end_date": "2024-03-31",
                "actual_quantity": 100.0,
                "uom": "Pcs",
            }),
        )
        .await;
    assert_eq!(record["utilized_capacity"], 25.0);
}

#[tokio::test]
async fn invalid_setup_and_records_are_rejected() {
    let app = TestApp::new().await;
    let station = app.station("Dire Dawa").await;

    let bad_process = app
        .admin(
            Method::POST,
            "/api/v1/production/machines",
            Some(json!({
                "name": "Mystery",
                "duty_station_id": station,
                "process_type": "Tanning",
                "installed_capacity": 1.0,
            })),
        )
        .await;
    assert_eq!(bad_process.status(), StatusCode::BAD_REQUEST);

    let bad_efficiency = app
        .admin(
            Method::POST,
            "/api/v1/production/machines",
            Some(json!({
                "name": "Overdrive",
                "duty_station_id": station,
                "process_type": "Dyeing",
                "installed_capacity": 1.0,
                "efficiency_factor": 1.5,
            })),
        )
        .await;
    assert_eq!(bad_efficiency.status(), StatusCode::BAD_REQUEST);

    let machine = loom(&app, station).await;
    let bad_unit = app
        .admin(
            Method::POST,
            "/api/v1/production/records",
            Some(json!({
                "machine_id": machine,
                "period_type": "Monthly",
                "start_date": "2024-01-01",
                "end_date": "2024-01-31",
                "actual_quantity": 5.0,
                "uom": "Metres",
            })),
        )
        .await;
    assert_eq!(bad_unit.status(), StatusCode::BAD_REQUEST);

    let reversed = app
        .admin(
            Method::POST,
            "/api/v1/production/records",
            Some(json!({
                "machine_id": machine,
                "period_type": "Monthly",
                "start_date": "2024-02-01",
                "end_date": "2024-01-01",
                "actual_quantity": 5.0,
                "uom": "Kg",
            })),
        )
        .await;
    assert_eq!(reversed.status(), StatusCode::BAD_REQUEST);

    let unknown_machine = app
        .admin(
            Method::POST,
            "/api/v1/production/records",
            Some(json!({
                "machine_id": 999,
                "period_type": "Monthly",
                "start_date": "2024-01-01",
                "end_date": "2024-01-31",
                "actual_quantity": 5.0,
                "uom": "Kg",
            })),
        )
        .await;
    assert_eq!(unknown_machine.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn clerk_cannot_view_production() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::GET,
            "/api/v1/production/machines",
            None,
            Some(app.clerk_token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

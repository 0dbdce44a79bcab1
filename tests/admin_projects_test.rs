mod common;

use axum::http::{Method, StatusCode};
use common::{body_bytes, body_json, TestApp};
use serde_json::json;

fn bill(number: &str, station: i64, amount: f64, due: &str) -> serde_json::Value {
    json!({
        "bill_number": number,
        "bill_type": "Electricity",
        "description": "ignored for typed bills",
        "amount": amount,
        "due_date": due,
        "duty_station_id": station,
    })
}

#[tokio::test]
async fn bills_are_totalled_per_station() {
    let app = TestApp::new().await;
    let adama = app.station("Adama").await;
    let gondar = app.station("Gondar").await;

    let first = app
        .create("/api/v1/admin-activities/bills", bill("B-1", adama, 1200.0, "2024-01-15"))
        .await;
    assert_eq!(first["status"], "Pending");
    assert_eq!(first["description"], "Electricity");
    app.create("/api/v1/admin-activities/bills", bill("B-2", adama, 300.0, "2024-03-15"))
        .await;

    let all_time = app.get_json("/api/v1/admin-activities/overview/bills").await;
    assert_eq!(all_time["Adama"], 1500.0);
    assert_eq!(all_time["Gondar"], 0.0);

    let january = app
        .get_json("/api/v1/admin-activities/overview/bills?start=2024-01-01&end=2024-01-31")
        .await;
    assert_eq!(january["Adama"], 1200.0);

    // A lone bound leaves the range open
    let half_range = app
        .get_json("/api/v1/admin-activities/overview/bills?start=2024-03-01")
        .await;
    assert_eq!(half_range["Adama"], 1500.0);

    let id = first["id"].as_i64().unwrap();
    let mut moved = bill("B-1", gondar, 1200.0, "2024-01-15");
    moved["status"] = json!("Paid");
    let response = app
        .admin(
            Method::PUT,
            &format!("/api/v1/admin-activities/bills/{}", id),
            Some(moved),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "Paid");

    let after_move = app.get_json("/api/v1/admin-activities/overview/bills").await;
    assert_eq!(after_move["Gondar"], 1200.0);

    let deleted = app
        .admin(
            Method::DELETE,
            &format!("/api/v1/admin-activities/bills/{}", id),
            None,
        )
        .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    let again = app
        .admin(
            Method::DELETE,
            &format!("/api/v1/admin-activities/bills/{}", id),
            None,
        )
        .await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn funding_can_create_its_project() {
    let app = TestApp::new().await;
    let station = app.station("Hawassa").await;

    let funding = app
        .create(
            "/api/v1/admin-activities/funding",
            json!({
                "new_project_name": "Solar Dryers",
                "amount": 25000.0,
                "funding_date": "2024-02-01",
                "source": "Regional grant",
                "duty_station_id": station,
            }),
        )
        .await;
    assert!(funding["project_id"].as_i64().is_some());

    let overview = app.get_json("/api/v1/admin-activities/overview/funding").await;
    assert_eq!(overview["Hawassa"]["Solar Dryers"], 25000.0);

    let neither = app
        .admin(
            Method::POST,
            "/api/v1/admin-activities/funding",
            Some(json!({
                "amount": 10.0,
                "funding_date": "2024-02-01",
                "duty_station_id": station,
            })),
        )
        .await;
    assert_eq!(neither.status(), StatusCode::BAD_REQUEST);

    let projects = app.get_json("/api/v1/projects").await;
    assert!(projects["projects"]
        .as_array()
        .unwrap()
        .iter()
        .any(|p| p["name"] == "Solar Dryers"));
}

#[tokio::test]
async fn petty_cash_property_and_letters() {
    let app = TestApp::new().await;
    let station = app.station("Adama").await;
    let employee = app
        .create(
            "/api/v1/employees",
            json!({
                "name": "Hanna Girma",
                "title": "Cashier",
                "duty_station_id": station,
                "hire_date": "2022-05-01",
            }),
        )
        .await["id"]
        .as_i64()
        .unwrap();

    let petty = app
        .create(
            "/api/v1/admin-activities/petty-cash",
            json!({
                "description": "Printer toner",
                "amount": 850.0,
                "request_date": "2024-04-03",
                "employee_id": employee,
                "duty_station_id": station,
            }),
        )
        .await;
    assert_eq!(petty["employee_title"], "Cashier");
    assert_eq!(petty["status"], "Pending");

    // Only approved requests count
    let cash = app
        .get_json("/api/v1/admin-activities/overview/petty-cash")
        .await;
    assert_eq!(cash["Adama"], 0.0);

    for code in ["LAP-1", "LAP-2"] {
        app.create(
            "/api/v1/admin-activities/property",
            json!({
                "item_code": code,
                "item_type": "Laptop",
                "employee_id": employee,
                "duty_station_id": station,
            }),
        )
        .await;
    }
    let property = app
        .get_json("/api/v1/admin-activities/overview/property")
        .await;
    assert_eq!(property["Adama"]["Laptop"], 2);

    app.create(
        "/api/v1/admin-activities/letters",
        json!({
            "letter_type": "External",
            "recipient": "Ministry of Industry",
            "subject": "Export licence",
            "duty_station_id": station,
        }),
    )
    .await;
    let bad_letter = app
        .admin(
            Method::POST,
            "/api/v1/admin-activities/letters",
            Some(json!({
                "letter_type": "Memo",
                "recipient": "Staff",
                "subject": "Holiday",
                "duty_station_id": station,
            })),
        )
        .await;
    assert_eq!(bad_letter.status(), StatusCode::BAD_REQUEST);

    let letters = app
        .get_json("/api/v1/admin-activities/overview/letters")
        .await;
    assert_eq!(letters["Adama"]["External"], 1);
    assert_eq!(letters["Adama"]["Internal"], 0);

    let records = app.get_json("/api/v1/admin-activities").await;
    assert_eq!(records["property_items"].as_array().unwrap().len(), 2);
    assert_eq!(records["admin_letters"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn sections_export_as_csv() {
    let app = TestApp::new().await;
    let station = app.station("Adama").await;
    app.create("/api/v1/admin-activities/bills", bill("B-9", station, 75.0, "2024-05-05"))
        .await;

    let response = app
        .admin(Method::GET, "/api/v1/admin-activities/export/bills", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let csv = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(csv.contains("B-9"));
    assert!(csv.contains("Adama"));

    let unknown = app
        .admin(Method::GET, "/api/v1/admin-activities/export/payroll", None)
        .await;
    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn project_activities_and_reports() {
    let app = TestApp::new().await;
    let project = app
        .create(
            "/api/v1/projects",
            json!({
                "name": "Line Expansion",
                "start_date": "2024-01-01",
                "end_date": "2024-06-30",
            }),
        )
        .await["id"]
        .as_i64()
        .unwrap();

    let activity = app
        .create(
            "/api/v1/projects/activities",
            json!({
                "activity_name": "Install looms",
                "planned_date": "2024-01-30",
                "project_id": project,
                "department": "Engineering",
            }),
        )
        .await;
    assert_eq!(activity["status"], "Not Achieved");
    let activity_id = activity["id"].as_i64().unwrap();

    let response = app
        .admin(
            Method::PUT,
            &format!("/api/v1/projects/activities/{}/status", activity_id),
            Some(json!({ "status": "In Progress" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let invalid = app
        .admin(
            Method::PUT,
            &format!("/api/v1/projects/activities/{}/status", activity_id),
            Some(json!({ "status": "Done-ish" })),
        )
        .await;
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

    app.create(
        &format!("/api/v1/projects/activities/{}/followups", activity_id),
        json!({ "notes": "Two looms delivered", "status_update": "In Progress" }),
    )
    .await;

    // The week spans a month boundary, so the summary has two buckets
    let overview = app
        .get_json("/api/v1/projects?start=2024-01-29&end=2024-02-04")
        .await;
    assert_eq!(overview["days"].as_array().unwrap().len(), 7);
    assert_eq!(overview["activities"].as_array().unwrap().len(), 1);
    let months = overview["monthly_summary"].as_array().unwrap();
    assert_eq!(months.len(), 2);
    assert_eq!(months[0]["status_counts"]["In Progress"], 1);
    assert_eq!(months[1]["activity_count"], 0);

    let timeline = app
        .get_json(&format!("/api/v1/projects/{}/activities", project))
        .await;
    assert_eq!(timeline["project"]["name"], "Line Expansion");
    assert_eq!(timeline["activities"][0]["end_date"], "2024-01-31");

    app.create(
        "/api/v1/projects/reports",
        json!({
            "project_id": project,
            "week_start": "2024-01-29",
            "week_end": "2024-02-04",
            "summary": "Looms on site",
        }),
    )
    .await;
    let reports = app
        .get_json(&format!("/api/v1/projects/reports?project_id={}", project))
        .await;
    assert_eq!(reports.as_array().unwrap().len(), 1);

    let missing = app
        .admin(Method::GET, "/api/v1/projects/999/activities", None)
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

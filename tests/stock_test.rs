mod common;

use axum::http::{Method, StatusCode};
use common::{body_bytes, body_json, TestApp};
use serde_json::json;

async fn dye_item(app: &TestApp) -> (i64, i64) {
    let station = app.station("Kombolcha").await;
    let category = app
        .create("/api/v1/stock/categories", json!({ "name": "Dyes" }))
        .await["id"]
        .as_i64()
        .unwrap();
    let item = app
        .create(
            "/api/v1/stock/items",
            json!({
                "name": "Reactive Blue",
                "category_id": category,
                "duty_station_id": station,
                "unit_of_measure": "kg",
                "min_stock_level": 5.0,
            }),
        )
        .await["id"]
        .as_i64()
        .unwrap();
    (station, item)
}

#[tokio::test]
async fn movements_roll_into_monthly_balances() {
    let app = TestApp::new().await;
    let (_, item) = dye_item(&app).await;

    let received = app
        .create(
            "/api/v1/stock/transactions",
            json!({
                "item_id": item,
                "transaction_type": "IN",
                "quantity": 20.0,
                "unit_price": 10.0,
                "transaction_date": "2024-03-04",
            }),
        )
        .await;
    assert_eq!(received["transaction_type"], "IN");
    assert_eq!(received["total_value"], 200.0);

    app.create(
        "/api/v1/stock/transactions",
        json!({
            "item_id": item,
            "transaction_type": "OUT",
            "quantity": 8.0,
            "unit_price": 10.0,
            "transaction_date": "2024-03-20",
        }),
    )
    .await;

    let march = app
        .get_json("/api/v1/stock/report?filter_type=month&value=2024-03")
        .await;
    let rows = march.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["item"], "Reactive Blue");
    assert_eq!(rows[0]["duty_station"], "Kombolcha");
    assert_eq!(rows[0]["beginning_quantity"], 0.0);
    assert_eq!(rows[0]["ending_quantity"], 12.0);
    assert_eq!(rows[0]["ending_value"], 120.0);

    // April opens from March's closing figures
    app.create(
        "/api/v1/stock/transactions",
        json!({
            "item_id": item,
            "transaction_type": "IN",
            "quantity": 3.0,
            "unit_price": 10.0,
            "transaction_date": "2024-04-02",
        }),
    )
    .await;
    let april = app
        .get_json("/api/v1/stock/report?filter_type=month&value=2024-04")
        .await;
    assert_eq!(april[0]["beginning_quantity"], 12.0);
    assert_eq!(april[0]["ending_quantity"], 15.0);

    let quarter = app
        .get_json("/api/v1/stock/report?filter_type=quarter&value=2024-Q2")
        .await;
    assert_eq!(quarter.as_array().unwrap().len(), 1);

    let year = app
        .get_json("/api/v1/stock/report?filter_type=year&value=2024")
        .await;
    assert_eq!(year.as_array().unwrap().len(), 2);

    let overview = app.get_json("/api/v1/stock").await;
    assert_eq!(overview["transactions"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn balances_carry_across_idle_months() {
    let app = TestApp::new().await;
    let (_, item) = dye_item(&app).await;

    app.create(
        "/api/v1/stock/transactions",
        json!({
            "item_id": item,
            "transaction_type": "IN",
            "quantity": 100.0,
            "unit_price": 2.0,
            "transaction_date": "2024-01-10",
        }),
    )
    .await;

    // Nothing moves in February
    let withdrawal = app
        .admin(
            Method::POST,
            "/api/v1/stock/transactions",
            Some(json!({
                "item_id": item,
                "transaction_type": "OUT",
                "quantity": 10.0,
                "unit_price": 2.0,
                "transaction_date": "2024-03-10",
            })),
        )
        .await;
    assert_eq!(withdrawal.status(), StatusCode::CREATED);

    let march = app
        .get_json("/api/v1/stock/report?filter_type=month&value=2024-03")
        .await;
    assert_eq!(march[0]["beginning_quantity"], 100.0);
    assert_eq!(march[0]["beginning_value"], 200.0);
    assert_eq!(march[0]["ending_quantity"], 90.0);
}

#[tokio::test]
async fn out_movement_cannot_go_negative() {
    let app = TestApp::new().await;
    let (_, item) = dye_item(&app).await;

    let response = app
        .admin(
            Method::POST,
            "/api/v1/stock/transactions",
            Some(json!({
                "item_id": item,
                "transaction_type": "OUT",
                "quantity": 1.0,
                "transaction_date": "2024-03-01",
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let overview = app.get_json("/api/v1/stock").await;
    assert!(overview["transactions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_category_conflicts() {
    let app = TestApp::new().await;
    app.create("/api/v1/stock/categories", json!({ "name": "Spares" }))
        .await;
    let response = app
        .admin(
            Method::POST,
            "/api/v1/stock/categories",
            Some(json!({ "name": "Spares" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_filter_type_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .admin(Method::GET, "/api/v1/stock/report?filter_type=decade", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .admin(Method::GET, "/api/v1/stock/report?filter_type=quarter&value=2024", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sheet_upload_creates_items_and_stations() {
    let app = TestApp::new().await;
    let sheet = b"Item,Duty Station,Transaction Type,Quantity,Category,Unit Price,Date\n\
Cotton Yarn,Hawassa,IN,100,Raw Material,4.5,2024-05-02\n\
Cotton Yarn,Hawassa,OUT,40,Raw Material,4.5,2024-05-10\n";

    let response = app
        .upload(
            "/api/v1/stock/upload",
            &[],
            Some(("stock.csv", &sheet[..])),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["transactions"], 2);

    let may = app
        .get_json("/api/v1/stock/report?filter_type=month&value=2024-05")
        .await;
    assert_eq!(may[0]["item"], "Cotton Yarn");
    assert_eq!(may[0]["duty_station"], "Hawassa");
    assert_eq!(may[0]["ending_quantity"], 60.0);
    assert_eq!(may[0]["ending_value"], 270.0);

    let stations = app.get_json("/api/v1/duty-stations").await;
    assert!(stations
        .as_array()
        .unwrap()
        .iter()
        .any(|s| s["name"] == "Hawassa"));

    let export = app
        .admin(
            Method::GET,
            "/api/v1/stock/report/export?filter_type=month&value=2024-05",
            None,
        )
        .await;
    assert_eq!(export.status(), StatusCode::OK);
    let csv = String::from_utf8(body_bytes(export).await).unwrap();
    assert!(csv.contains("Cotton Yarn"));
}

#[tokio::test]
async fn sheet_upload_is_all_or_nothing() {
    let app = TestApp::new().await;
    let sheet = b"Item,Duty Station,Transaction Type,Quantity,Date\n\
Zipper,Adama,IN,10,2024-06-01\n\
Zipper,Adama,OUT,50,2024-06-02\n";

    let response = app
        .upload(
            "/api/v1/stock/upload",
            &[],
            Some(("stock.csv", &sheet[..])),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body.to_string().contains("Row 3"), "{}", body);

    let overview = app.get_json("/api/v1/stock").await;
    assert!(overview["items"].as_array().unwrap().is_empty());
    assert!(overview["transactions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn sheet_missing_required_column_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .upload(
            "/api/v1/stock/upload",
            &[],
            Some(("stock.csv", &b"Item,Quantity\nZipper,5\n"[..])),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

mod common;

use axum::http::{header, Method, StatusCode};
use common::{body_bytes, body_json, TestApp};

const GUIDE: &[u8] = b"%PDF-1.4 dyeing safety guide";

#[tokio::test]
async fn admin_uploads_and_anyone_permitted_downloads() {
    let app = TestApp::new().await;

    let response = app
        .upload(
            "/api/v1/resources",
            &[("title", "Dyeing safety"), ("category", "SOPs")],
            Some(("safety.pdf", GUIDE)),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["category"], "sops");
    let filename = created["filename"].as_str().unwrap().to_string();
    assert!(filename.ends_with(".pdf"));
    assert_ne!(filename, "safety.pdf");

    let listed = app.get_json("/api/v1/resources?category=sops").await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    let other = app.get_json("/api/v1/resources?category=rules").await;
    assert!(other.as_array().unwrap().is_empty());

    let download = app
        .admin(Method::GET, &format!("/api/v1/resources/{}", filename), None)
        .await;
    assert_eq!(download.status(), StatusCode::OK);
    assert_eq!(download.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(body_bytes(download).await, GUIDE);
}

#[tokio::test]
async fn uploads_are_validated() {
    let app = TestApp::new().await;

    let bad_category = app
        .upload(
            "/api/v1/resources",
            &[("title", "Holiday list"), ("category", "memos")],
            Some(("holidays.pdf", GUIDE)),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(bad_category.status(), StatusCode::BAD_REQUEST);

    let no_title = app
        .upload(
            "/api/v1/resources",
            &[("category", "rules")],
            Some(("rules.pdf", GUIDE)),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(no_title.status(), StatusCode::BAD_REQUEST);

    let executable = app
        .upload(
            "/api/v1/resources",
            &[("title", "Installer"), ("category", "howto")],
            Some(("setup.exe", &b"MZ"[..])),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(executable.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let no_file = app
        .upload(
            "/api/v1/resources",
            &[("title", "Empty"), ("category", "howto")],
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(no_file.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn only_admins_upload() {
    let app = TestApp::new().await;
    let response = app
        .upload(
            "/api/v1/resources",
            &[("title", "Guide"), ("category", "howto")],
            Some(("guide.pdf", GUIDE)),
            Some(app.clerk_token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let listing = app
        .request(Method::GET, "/api/v1/resources", None, Some(app.clerk_token()))
        .await;
    assert_eq!(listing.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_or_crafted_names_are_not_served() {
    let app = TestApp::new().await;
    for name in [
        "0123456789abcdef0123456789abcdef.pdf",
        "..%2F..%2Fetc%2Fpasswd",
        "notes.pdf",
    ] {
        let response = app
            .admin(Method::GET, &format!("/api/v1/resources/{}", name), None)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", name);
    }
}

#[tokio::test]
async fn oversized_files_are_refused() {
    let app = TestApp::with_upload_limit(16).await;
    let big = vec![b'x'; 64];
    let response = app
        .upload(
            "/api/v1/resources",
            &[("title", "Big"), ("category", "rules")],
            Some(("big.pdf", big.as_slice())),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let listed = app.get_json("/api/v1/resources").await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn failed_insert_leaves_no_file_behind() {
    use sea_orm::ConnectionTrait;

    let app = TestApp::new().await;
    app.state
        .db
        .execute_unprepared("DROP TABLE resources")
        .await
        .unwrap();

    let response = app
        .upload(
            "/api/v1/resources",
            &[("title", "Dyeing safety"), ("category", "sops")],
            Some(("safety.pdf", GUIDE)),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let area = std::path::Path::new(&app.state.config.uploads.dir).join("resources");
    let leftovers = std::fs::read_dir(&area)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftovers, 0);
}

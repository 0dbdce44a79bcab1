#![allow(dead_code)]

use std::sync::Arc;

use asbm_erp::{
    app_router,
    auth::{AuthService, TokenPair},
    config::AppConfig,
    db,
    entities::user,
    services::users::RegisterUser,
    AppState,
};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use http_body_util::BodyExt;
use sea_orm::EntityTrait;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_SECRET: &str =
    "Xq7r!Lm2pZ9vK4tW8yB3nF6hJ1sD5gC0aE-uR_iO.oP~Qw#Tz%Vy&Ux*Nk@Mj^Hb";
pub const ADMIN_PASSWORD: &str = "admin-pass-1";
pub const CLERK_PASSWORD: &str = "clerk-pass-1";

const BOUNDARY: &str = "asbm-test-boundary";

/// Application backed by a throwaway SQLite file and upload directory
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub auth_service: Arc<AuthService>,
    admin_token: String,
    clerk_token: String,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_upload_limit(1024 * 1024).await
    }

    /// The clerk only holds `orders:view` and `dashboard:view`
    pub async fn with_upload_limit(max_upload_bytes: usize) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let db_path = dir.path().join("erp.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            TEST_SECRET,
        );
        cfg.environment = "test".into();
        cfg.server.cors_allow_any_origin = true;
        cfg.database.max_connections = 1;
        cfg.uploads.dir = dir.path().join("uploads").display().to_string();
        cfg.uploads.max_bytes = max_upload_bytes;

        let pool = db::connect(&cfg.database)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let auth_service = Arc::new(AuthService::new(cfg.auth.clone(), db_arc.clone()));
        let state = AppState::new(db_arc.clone(), cfg);

        let admin = state
            .services
            .users
            .register(RegisterUser {
                username: "admin".into(),
                password: ADMIN_PASSWORD.into(),
                role: "admin".into(),
                permissions: Some(asbm_erp::auth::all_permissions()),
            })
            .await
            .expect("register admin");
        let clerk = state
            .services
            .users
            .register(RegisterUser {
                username: "clerk".into(),
                password: CLERK_PASSWORD.into(),
                role: "user".into(),
                permissions: Some(json!({
                    "orders": { "view": true },
                    "dashboard": { "view": true },
                })),
            })
            .await
            .expect("register clerk");

        let admin_token = Self::token_for(&auth_service, &db_arc, admin.id).await;
        let clerk_token = Self::token_for(&auth_service, &db_arc, clerk.id).await;

        let router = app_router(state.clone(), auth_service.clone());

        Self {
            router,
            state,
            auth_service,
            admin_token,
            clerk_token,
            _dir: dir,
        }
    }

    async fn token_for(auth: &AuthService, db: &db::DbPool, user_id: i32) -> String {
        let model = user::Entity::find_by_id(user_id)
            .one(db)
            .await
            .expect("load user")
            .expect("user exists");
        let TokenPair { access_token, .. } = auth.generate_token(&model).expect("issue token");
        access_token
    }

    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    pub fn clerk_token(&self) -> &str {
        &self.clerk_token
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tok) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", tok));
        }

        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json).expect("serialize request body"))
            }
            None => Body::empty(),
        };

        self.router
            .clone()
            .oneshot(builder.body(body).expect("build request"))
            .await
            .expect("router error during test request")
    }

    /// Authenticated as the administrator.
    pub async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, Some(self.admin_token())).await
    }

    pub async fn get_json(&self, uri: &str) -> Value {
        let response = self.admin(Method::GET, uri, None).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {}", uri);
        body_json(response).await
    }

    /// POST as admin and return the created body, asserting 201.
    pub async fn create(&self, uri: &str, body: Value) -> Value {
        let response = self.admin(Method::POST, uri, Some(body)).await;
        let status = response.status();
        let payload = body_json(response).await;
        assert_eq!(status, StatusCode::CREATED, "POST {} -> {}", uri, payload);
        payload
    }

    /// Multipart POST with text fields and one file part.
    pub async fn upload(
        &self,
        uri: &str,
        fields: &[(&str, &str)],
        file: Option<(&str, &[u8])>,
        token: Option<&str>,
    ) -> Response {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((filename, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(tok) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", tok));
        }

        self.router
            .clone()
            .oneshot(builder.body(Body::from(body)).expect("build request"))
            .await
            .expect("router error during test request")
    }

    /// Create a duty station and return its id.
    pub async fn station(&self, name: &str) -> i64 {
        self.create("/api/v1/duty-stations", json!({ "name": name }))
            .await["id"]
            .as_i64()
            .expect("station id")
    }

    /// Create a customer and return its id.
    pub async fn customer(&self, name: &str) -> i64 {
        self.create(
            "/api/v1/customers",
            json!({ "name": name, "email": format!("{}@example.com", name.to_lowercase().replace(' ', ".")) }),
        )
        .await["id"]
            .as_i64()
            .expect("customer id")
    }

    /// Create a woven product and return its id.
    pub async fn product(&self, name: &str, sku: &str, price: f64) -> i64 {
        self.create(
            "/api/v1/products",
            json!({
                "name": name,
                "product_type": "Woven",
                "selling_price": price,
                "cost": price / 2.0,
                "sku": sku,
                "parameters": { "fabric_type": "Poplin", "fabric_gsm": 120 },
                "initial_price": { "price": price, "start_date": "2020-01-01" },
            }),
        )
        .await["id"]
            .as_i64()
            .expect("product id")
    }
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = body_bytes(response).await;
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("response body is json")
}

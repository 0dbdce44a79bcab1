//! ASBM ERP
//!
//! JSON API for a textile manufacturer covering orders, products, planning,
//! sales, purchasing, stock, production, HR, projects and administrative records.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Extension, Router,
};
use chrono::Utc;
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowHeaders, AllowMethods, Any, CorsLayer},
    timeout::TimeoutLayer,
};

use crate::{auth::AuthService, config::AppConfig, db::DbPool};

/// Bodies beyond the upload limit carry multipart framing and form fields
const BODY_LIMIT_SLACK: usize = 64 * 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: Arc<AppConfig>,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(db: Arc<DbPool>, config: AppConfig) -> Self {
        let services = handlers::AppServices::new(db.clone(), &config);
        Self {
            db,
            config: Arc::new(config),
            services,
        }
    }
}

/// Every business module, each guarding its own routes
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .merge(handlers::dashboard::routes())
        .merge(handlers::notifications::routes())
        .merge(handlers::users::routes())
        .merge(handlers::duty_stations::routes())
        // Sales side
        .merge(handlers::customers::routes())
        .merge(handlers::products::routes())
        .merge(handlers::orders::routes())
        .merge(handlers::sales::routes())
        .merge(handlers::planning::routes())
        // Operations
        .merge(handlers::purchasing::routes())
        .merge(handlers::stock::routes())
        .merge(handlers::production::routes())
        // People and office
        .merge(handlers::hr::routes())
        .merge(handlers::projects::routes())
        .merge(handlers::admin_activities::routes())
        .merge(handlers::resources::routes())
}

/// Database connectivity check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and database are healthy"),
        (status = 503, description = "Database is unreachable")
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (status, db_status) = match db::check_connection(&state.db).await {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy"),
    };

    (
        status,
        Json(json!({
            "status": db_status,
            "checks": { "database": db_status },
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
}

fn cors_layer(cfg: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cfg
        .server
        .cors_origins()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if !origins.is_empty() {
        let layer = CorsLayer::new().allow_origin(origins);
        // Credentialed CORS cannot answer with wildcards
        if cfg.server.cors_allow_credentials {
            layer
                .allow_methods(AllowMethods::mirror_request())
                .allow_headers(AllowHeaders::mirror_request())
                .allow_credentials(true)
        } else {
            layer.allow_methods(Any).allow_headers(Any)
        }
    } else if cfg.permissive_cors() {
        ::tracing::info!("Using permissive CORS because explicit origins were not configured");
        CorsLayer::permissive()
    } else {
        ::tracing::warn!("No CORS origins configured; cross-origin requests will be refused");
        CorsLayer::new()
    }
}

/// Full application: auth, health, the v1 API and Swagger UI with the shared layers
pub fn app_router(state: AppState, auth_service: Arc<AuthService>) -> Router {
    let body_limit = state.config.uploads.max_bytes + BODY_LIMIT_SLACK;
    let cors = cors_layer(&state.config);

    Router::<AppState>::new()
        .route("/", get(|| async { "asbm-erp up" }))
        .route("/health", get(health_check))
        .nest("/api/v1", api_v1_routes())
        .nest("/auth", auth::auth_routes().with_state(auth_service.clone()))
        .merge(openapi::swagger_ui())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(crate::tracing::configure_http_tracing())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .layer(cors)
        // Auth middleware looks the service up in request extensions
        .layer(Extension(auth_service))
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

use super::common::success_response;
use crate::{
    auth::{consts as perm, AuthRouterExt},
    errors::ApiError,
    handlers::AppState,
};
use axum::{extract::State, response::IntoResponse, routing::get, Router};

pub async fn dashboard(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.dashboard.summary().await?))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .with_permission(perm::DASHBOARD_VIEW)
}

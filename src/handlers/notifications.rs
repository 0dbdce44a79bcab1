use super::common::success_response;
use crate::{
    auth::{consts as perm, AuthRouterExt},
    errors::ApiError,
    handlers::AppState,
};
use axum::{extract::State, response::IntoResponse, routing::get, Router};

/// Latest notifications, newest first
pub async fn list_notifications(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.notifications.latest().await?))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .with_permission(perm::NOTIFICATIONS_VIEW)
}

use super::common::{created_response, no_content_response, read_multipart, success_response};
use crate::{
    auth::{AuthRouterExt, AuthenticatedUser},
    errors::ApiError,
    handlers::AppState,
    services::users::{RegisterUser, UpdateProfile},
};
use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::Value;
use tracing::info;

/// Register a user (admin only)
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUser>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.services.users.register(payload).await?;
    Ok(created_response(user))
}

pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.users.list_users().await?))
}

pub async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.users.me(user.user_id).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdateProfile>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .services
        .users
        .update_profile(user.user_id, payload)
        .await?;
    Ok(success_response(profile))
}

pub async fn upload_profile_picture(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let file = read_multipart(multipart).await?.require_file()?;
    let profile = state
        .services
        .users
        .upload_profile_picture(user.user_id, &file.filename, &file.bytes)
        .await?;
    Ok(success_response(profile))
}

pub async fn update_permissions(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let permissions = payload.get("permissions").cloned().unwrap_or(payload);
    let profile = state
        .services
        .users
        .update_permissions(user_id, permissions)
        .await?;
    info!(user_id, "permissions updated");
    Ok(success_response(profile))
}

pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .users
        .delete_user(user.user_id, user_id)
        .await?;
    Ok(no_content_response())
}

pub fn routes() -> Router<AppState> {
    let own_profile = Router::new()
        .route("/users/me", get(me).put(update_profile))
        .route("/users/me/picture", post(upload_profile_picture))
        .with_auth();

    let admin = Router::new()
        .route("/users", get(list_users).post(register_user))
        .route("/users/:id/permissions", put(update_permissions))
        .route("/users/:id", axum::routing::delete(delete_user))
        .with_role("admin");

    own_profile.merge(admin)
}

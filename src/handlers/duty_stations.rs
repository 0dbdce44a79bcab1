use super::common::{created_response, no_content_response, success_response, validate_input};
use crate::{
    auth::{consts as perm, AuthRouterExt},
    errors::ApiError,
    handlers::AppState,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct StationName {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

pub async fn list_stations(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.duty_stations.list().await?))
}

pub async fn get_station(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.duty_stations.get(id).await?))
}

pub async fn create_station(
    State(state): State<AppState>,
    Json(payload): Json<StationName>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let station = state.services.duty_stations.create(&payload.name).await?;
    Ok(created_response(station))
}

pub async fn rename_station(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<StationName>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let station = state
        .services
        .duty_stations
        .rename(id, &payload.name)
        .await?;
    Ok(success_response(station))
}

pub async fn delete_station(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.duty_stations.delete(id).await?;
    Ok(no_content_response())
}

pub fn routes() -> Router<AppState> {
    let read = Router::new()
        .route("/duty-stations", get(list_stations))
        .route("/duty-stations/:id", get(get_station))
        .with_auth();

    let edit = Router::new()
        .route("/duty-stations", axum::routing::post(create_station))
        .route("/duty-stations/:id", put(rename_station))
        .with_permission(perm::SYSTEM_SETUP_EDIT);

    let delete = Router::new()
        .route("/duty-stations/:id", axum::routing::delete(delete_station))
        .with_permission(perm::SYSTEM_SETUP_DELETE);

    read.merge(edit).merge(delete)
}

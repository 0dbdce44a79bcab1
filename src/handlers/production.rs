use super::common::{created_response, csv_response, success_response};
use crate::{
    auth::{consts as perm, AuthRouterExt},
    errors::ApiError,
    handlers::AppState,
    services::production::{
        MachineSetup, NewProductionRecord, ProductionFilter, PERIOD_TYPES, PROCESS_TYPES, UNITS,
    },
};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

pub async fn list_machines(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.production.machines().await?))
}

pub async fn production_options() -> impl IntoResponse {
    success_response(json!({
        "process_types": PROCESS_TYPES,
        "period_types": PERIOD_TYPES,
        "units": UNITS,
    }))
}

pub async fn setup_machine(
    State(state): State<AppState>,
    Json(payload): Json<MachineSetup>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(
        state.services.production.setup_machine(payload).await?,
    ))
}

pub async fn record_production(
    State(state): State<AppState>,
    Json(payload): Json<NewProductionRecord>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(
        state.services.production.record_production(payload).await?,
    ))
}

pub async fn production_report(
    State(state): State<AppState>,
    Query(filter): Query<ProductionFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.production.report(filter).await?))
}

pub async fn export_production(
    State(state): State<AppState>,
    Query(filter): Query<ProductionFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(csv_response(state.services.production.export(filter).await?))
}

pub fn routes() -> Router<AppState> {
    let read = Router::new()
        .route("/production/machines", get(list_machines))
        .route("/production/options", get(production_options))
        .route("/production/report", get(production_report))
        .route("/production/report/export", get(export_production))
        .with_permission(perm::PRODUCTION_VIEW);

    let edit = Router::new()
        .route("/production/machines", post(setup_machine))
        .route("/production/records", post(record_production))
        .with_permission(perm::PRODUCTION_EDIT);

    read.merge(edit)
}

use super::common::{
    created_response, csv_response, no_content_response, read_multipart, success_response,
};
use crate::{
    auth::{consts as perm, AuthRouterExt},
    errors::ApiError,
    handlers::AppState,
    services::hr::{DocumentKind, EmployeeChanges, EmployeeFilter, NewEmployee, NewPeriod},
};
use axum::{
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct SummaryRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

pub async fn list_employees(
    State(state): State<AppState>,
    Query(filter): Query<EmployeeFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.hr.list(filter).await?))
}

pub async fn get_employee(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.hr.get(id).await?))
}

pub async fn add_employee(
    State(state): State<AppState>,
    Json(payload): Json<NewEmployee>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(state.services.hr.add(payload).await?))
}

pub async fn modify_employee(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<EmployeeChanges>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.hr.modify(id, payload).await?))
}

pub async fn remove_employee(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.hr.remove(id).await?;
    Ok(no_content_response())
}

pub async fn station_summary(
    State(state): State<AppState>,
    Query(range): Query<SummaryRange>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.hr.station_summary(range.start, range.end).await?,
    ))
}

/// Store a photo or CV; the kind comes from the path
pub async fn upload_document(
    State(state): State<AppState>,
    Path((id, kind)): Path<(i32, String)>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let kind: DocumentKind = kind
        .parse()
        .map_err(|_| ApiError::NotFound(format!("Unknown document kind {}", kind)))?;
    let file = read_multipart(multipart).await?.require_file()?;
    let employee = state
        .services
        .hr
        .upload_document(id, kind, &file.filename, &file.bytes)
        .await?;
    Ok(success_response(employee))
}

pub async fn add_period(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<NewPeriod>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(state.services.hr.add_period(id, payload).await?))
}

pub async fn list_periods(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.hr.periods(id).await?))
}

pub async fn export_employees(
    State(state): State<AppState>,
    Query(filter): Query<EmployeeFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(csv_response(state.services.hr.export(filter).await?))
}

pub fn routes() -> Router<AppState> {
    let read = Router::new()
        .route("/employees", get(list_employees))
        .route("/employees/export", get(export_employees))
        .route("/employees/summary", get(station_summary))
        .route("/employees/:id", get(get_employee))
        .route("/employees/:id/periods", get(list_periods))
        .with_permission(perm::HR_VIEW);

    let edit = Router::new()
        .route("/employees", post(add_employee))
        .route("/employees/:id", put(modify_employee))
        .route("/employees/:id/periods", post(add_period))
        .route("/employees/:id/documents/:kind", post(upload_document))
        .with_permission(perm::HR_EDIT);

    let delete = Router::new()
        .route("/employees/:id", axum::routing::delete(remove_employee))
        .with_permission(perm::HR_DELETE);

    read.merge(edit).merge(delete)
}

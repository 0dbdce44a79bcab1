use super::common::{created_response, csv_response, success_response};
use crate::{
    auth::{consts as perm, AuthRouterExt},
    errors::ApiError,
    handlers::AppState,
    services::sales::{NewSale, SaleFilter},
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct ReportRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

pub async fn list_sales(
    State(state): State<AppState>,
    Query(filter): Query<SaleFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.sales.list(filter).await?))
}

pub async fn record_sale(
    State(state): State<AppState>,
    Json(payload): Json<NewSale>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(state.services.sales.record(payload).await?))
}

/// Plan-versus-actual report bucketed by every period kind
pub async fn sales_report(
    State(state): State<AppState>,
    Query(range): Query<ReportRange>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .services
        .sales_report
        .report(range.start, range.end)
        .await?;
    Ok(success_response(report))
}

pub async fn export_sales_report(
    State(state): State<AppState>,
    Path(period): Path<String>,
    Query(range): Query<ReportRange>,
) -> Result<impl IntoResponse, ApiError> {
    let export = state
        .services
        .sales_report
        .export(&period, range.start, range.end)
        .await?;
    Ok(csv_response(export))
}

pub fn routes() -> Router<AppState> {
    let read = Router::new()
        .route("/sales", get(list_sales))
        .route("/sales/report", get(sales_report))
        .route("/sales/report/:period/export", get(export_sales_report))
        .with_permission(perm::SALES_VIEW);

    let edit = Router::new()
        .route("/sales", post(record_sale))
        .with_permission(perm::SALES_EDIT);

    read.merge(edit)
}

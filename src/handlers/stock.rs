use super::common::{created_response, csv_response, read_multipart, success_response};
use crate::{
    auth::{consts as perm, AuthRouterExt, AuthenticatedUser},
    errors::ApiError,
    handlers::AppState,
    services::stock::{NewCategory, NewItem, NewTransaction, StockFilter},
};
use axum::{
    extract::{Multipart, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

pub async fn stock_overview(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.stock.overview().await?))
}

pub async fn add_category(
    State(state): State<AppState>,
    Json(payload): Json<NewCategory>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(state.services.stock.add_category(payload).await?))
}

pub async fn add_item(
    State(state): State<AppState>,
    Json(payload): Json<NewItem>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(state.services.stock.add_item(payload).await?))
}

pub async fn record_transaction(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<NewTransaction>,
) -> Result<impl IntoResponse, ApiError> {
    let transaction = state
        .services
        .stock
        .record_transaction(payload, user.user_id)
        .await?;
    Ok(created_response(transaction))
}

/// Post every row of an uploaded transaction sheet, all or nothing
pub async fn upload_transactions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let file = read_multipart(multipart).await?.require_file()?;
    let summary = state
        .services
        .stock
        .upload(&file.bytes, user.user_id)
        .await?;
    Ok(created_response(summary))
}

pub async fn stock_report(
    State(state): State<AppState>,
    Query(filter): Query<StockFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.stock.report(filter).await?))
}

pub async fn export_stock(
    State(state): State<AppState>,
    Query(filter): Query<StockFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(csv_response(state.services.stock.export(filter).await?))
}

pub fn routes() -> Router<AppState> {
    let read = Router::new()
        .route("/stock", get(stock_overview))
        .route("/stock/report", get(stock_report))
        .route("/stock/report/export", get(export_stock))
        .with_permission(perm::STOCK_VIEW);

    let edit = Router::new()
        .route("/stock/categories", post(add_category))
        .route("/stock/items", post(add_item))
        .route("/stock/transactions", post(record_transaction))
        .route("/stock/upload", post(upload_transactions))
        .with_permission(perm::STOCK_EDIT);

    read.merge(edit)
}

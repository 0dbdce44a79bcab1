use super::common::{created_response, csv_response, success_response};
use crate::{
    auth::{consts as perm, AuthRouterExt},
    errors::ApiError,
    handlers::AppState,
    services::orders::{NewOrder, OrderChanges, OrderFilter},
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.orders.list(filter).await?))
}

pub async fn order_details(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.orders.details(id).await?))
}

pub async fn export_orders(
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(csv_response(state.services.orders.export(filter).await?))
}

pub async fn add_order(
    State(state): State<AppState>,
    Json(payload): Json<NewOrder>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state.services.orders.add(payload).await?;
    info!(order_number = %order.order.order_number, "order placed via API");
    Ok(created_response(order))
}

pub async fn edit_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<OrderChanges>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.orders.edit(id, payload).await?))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<StatusUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .update_status(id, &payload.status)
        .await?;
    Ok(success_response(order))
}

pub fn routes() -> Router<AppState> {
    let read = Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/export", get(export_orders))
        .route("/orders/:id", get(order_details))
        .with_permission(perm::ORDERS_VIEW);

    let edit = Router::new()
        .route("/orders", post(add_order))
        .route("/orders/:id", put(edit_order))
        .route("/orders/:id/status", put(update_order_status))
        .with_permission(perm::ORDERS_EDIT);

    read.merge(edit)
}

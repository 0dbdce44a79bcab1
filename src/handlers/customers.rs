use super::common::{created_response, csv_response, success_response};
use crate::{
    auth::{consts as perm, AuthRouterExt},
    errors::ApiError,
    handlers::AppState,
    services::customers::{CustomerChanges, NewCustomer},
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

/// List customers with freshly computed ratings
pub async fn list_customers(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.customers.list().await?))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.customers.get(id).await?))
}

pub async fn add_customer(
    State(state): State<AppState>,
    Json(payload): Json<NewCustomer>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(state.services.customers.add(payload).await?))
}

pub async fn edit_customer(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<CustomerChanges>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.customers.edit(id, payload).await?,
    ))
}

pub async fn export_customers(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(csv_response(state.services.customers.export().await?))
}

pub fn routes() -> Router<AppState> {
    let read = Router::new()
        .route("/customers", get(list_customers))
        .route("/customers/export", get(export_customers))
        .route("/customers/:id", get(get_customer))
        .with_permission(perm::CUSTOMERS_VIEW);

    let edit = Router::new()
        .route("/customers", post(add_customer))
        .route("/customers/:id", put(edit_customer))
        .with_permission(perm::CUSTOMERS_EDIT);

    read.merge(edit)
}

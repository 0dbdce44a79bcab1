use super::common::{
    created_response, csv_response, no_content_response, read_multipart, success_response,
};
use crate::{
    auth::{consts as perm, AuthRouterExt, AuthenticatedUser},
    errors::ApiError,
    handlers::AppState,
    services::purchasing::{
        FulfillRequest, NewPurchase, NewRequest, NewYearlyPlan, PaymentUpdate, PurchaseFilter,
        SupplierInput,
    },
};
use axum::{
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct SupplierSearch {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_limit() -> u64 {
    10
}

pub async fn purchasing_overview(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.purchasing.overview().await?))
}

pub async fn cost_categories() -> impl IntoResponse {
    success_response(json!({
        "cost_categories": crate::services::purchasing::COST_CATEGORIES
    }))
}

pub async fn create_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<NewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let request = state
        .services
        .purchasing
        .create_request(payload, user.user_id, &user.username)
        .await?;
    Ok(created_response(request))
}

pub async fn fulfill_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
    Json(payload): Json<FulfillRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .purchasing
        .fulfill_request(id, payload, user.user_id)
        .await?;
    Ok(created_response(order))
}

pub async fn register_purchase(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<NewPurchase>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .purchasing
        .register_purchase(payload, user.user_id, &user.username)
        .await?;
    Ok(created_response(order))
}

pub async fn update_payment(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<PaymentUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.purchasing.update_payment(id, payload).await?,
    ))
}

pub async fn payables(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.purchasing.payables().await?))
}

pub async fn export_payables(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(csv_response(state.services.purchasing.export_payables().await?))
}

pub async fn export_purchases(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(csv_response(state.services.purchasing.export_purchases().await?))
}

pub async fn purchase_report(
    State(state): State<AppState>,
    Query(filter): Query<PurchaseFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.purchasing.report(filter).await?))
}

pub async fn export_report(
    State(state): State<AppState>,
    Query(filter): Query<PurchaseFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(csv_response(
        state.services.purchasing.export_report(filter).await?,
    ))
}

pub async fn search_suppliers(
    State(state): State<AppState>,
    Query(search): Query<SupplierSearch>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.purchasing.search_suppliers(&search.q).await?,
    ))
}

pub async fn list_suppliers(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.purchasing.list_suppliers().await?))
}

pub async fn register_supplier(
    State(state): State<AppState>,
    Json(payload): Json<SupplierInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(
        state.services.purchasing.register_supplier(payload).await?,
    ))
}

pub async fn modify_supplier(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<SupplierInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.purchasing.modify_supplier(id, payload).await?,
    ))
}

pub async fn delete_supplier(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.purchasing.delete_supplier(id).await?;
    Ok(no_content_response())
}

pub async fn export_suppliers(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(csv_response(state.services.purchasing.export_suppliers().await?))
}

pub async fn list_yearly_plans(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.purchasing.list_yearly_plans().await?,
    ))
}

pub async fn register_yearly_plan(
    State(state): State<AppState>,
    Json(payload): Json<NewYearlyPlan>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(
        state.services.purchasing.register_yearly_plan(payload).await?,
    ))
}

/// Bulk load yearly plans from an uploaded CSV
pub async fn upload_yearly_plans(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let file = read_multipart(multipart).await?.require_file()?;
    let inserted = state
        .services
        .purchasing
        .upload_yearly_plans(&file.bytes)
        .await?;
    Ok(created_response(json!({ "inserted": inserted })))
}

pub async fn export_yearly_plans(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(csv_response(
        state.services.purchasing.export_yearly_plans().await?,
    ))
}

pub async fn purchasing_notifications(
    State(state): State<AppState>,
    Query(query): Query<NotificationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.purchasing.notifications(query.limit).await?,
    ))
}

pub fn routes() -> Router<AppState> {
    let read = Router::new()
        .route("/purchasing", get(purchasing_overview))
        .route("/purchasing/cost-categories", get(cost_categories))
        .route("/purchasing/payables", get(payables))
        .route("/purchasing/payables/export", get(export_payables))
        .route("/purchasing/orders/export", get(export_purchases))
        .route("/purchasing/report", get(purchase_report))
        .route("/purchasing/report/export", get(export_report))
        .route("/purchasing/notifications", get(purchasing_notifications))
        .route("/suppliers", get(list_suppliers))
        .route("/suppliers/search", get(search_suppliers))
        .route("/suppliers/export", get(export_suppliers))
        .route("/purchasing/yearly-plans", get(list_yearly_plans))
        .route("/purchasing/yearly-plans/export", get(export_yearly_plans))
        .with_permission(perm::PURCHASING_VIEW);

    let edit = Router::new()
        .route("/purchasing/requests", post(create_request))
        .route("/purchasing/requests/:id/fulfill", post(fulfill_request))
        .route("/purchasing/orders", post(register_purchase))
        .route("/purchasing/orders/:id/payment", put(update_payment))
        .route("/suppliers", post(register_supplier))
        .route("/suppliers/:id", put(modify_supplier))
        .route("/purchasing/yearly-plans", post(register_yearly_plan))
        .route("/purchasing/yearly-plans/upload", post(upload_yearly_plans))
        .with_permission(perm::PURCHASING_EDIT);

    let delete = Router::new()
        .route("/suppliers/:id", axum::routing::delete(delete_supplier))
        .with_permission(perm::PURCHASING_DELETE);

    read.merge(edit).merge(delete)
}

use super::common::{created_response, no_content_response, read_multipart, success_response};
use crate::{
    auth::{consts as perm, AuthRouterExt},
    errors::ApiError,
    handlers::AppState,
    services::products::{
        parameter_template, NewProduct, ProductChanges, ProductFilter, PRODUCT_TYPES,
    },
};
use axum::{
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;

pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.products.list(filter).await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.products.get(id).await?))
}

pub async fn product_prices(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.products.prices(id).await?))
}

pub async fn product_types() -> impl IntoResponse {
    success_response(json!({ "product_types": PRODUCT_TYPES }))
}

/// Parameter fields for a product type
pub async fn product_template(Path(product_type): Path<String>) -> Result<impl IntoResponse, ApiError> {
    let fields = parameter_template(&product_type)?;
    Ok(success_response(json!({
        "product_type": product_type,
        "fields": fields,
    })))
}

pub async fn add_product(
    State(state): State<AppState>,
    Json(payload): Json<NewProduct>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(state.services.products.add(payload).await?))
}

pub async fn edit_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<ProductChanges>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.products.edit(id, payload).await?,
    ))
}

pub async fn upload_image(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let file = read_multipart(multipart).await?.require_file()?;
    let product = state
        .services
        .products
        .upload_image(id, &file.filename, &file.bytes)
        .await?;
    Ok(success_response(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.products.delete(id).await?;
    Ok(no_content_response())
}

pub fn routes() -> Router<AppState> {
    let read = Router::new()
        .route("/products", get(list_products))
        .route("/products/types", get(product_types))
        .route("/products/templates/:product_type", get(product_template))
        .route("/products/:id", get(get_product))
        .route("/products/:id/prices", get(product_prices))
        .with_permission(perm::PRODUCTS_VIEW);

    let edit = Router::new()
        .route("/products", post(add_product))
        .route("/products/:id", put(edit_product))
        .route("/products/:id/image", post(upload_image))
        .with_permission(perm::PRODUCTS_EDIT);

    let delete = Router::new()
        .route("/products/:id", axum::routing::delete(delete_product))
        .with_permission(perm::PRODUCTS_DELETE);

    read.merge(edit).merge(delete)
}

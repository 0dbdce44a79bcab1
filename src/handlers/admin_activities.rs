use super::common::{created_response, csv_response, no_content_response, success_response};
use crate::{
    auth::{consts as perm, AuthRouterExt},
    errors::ApiError,
    handlers::AppState,
    services::admin_activities::{
        AdminSection, BillInput, FoodFuelInput, FundingInput, LetterInput, OverviewRange,
        PettyCashInput, PropertyInput, SecurityInput,
    },
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};

pub async fn list_all(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.admin_activities.list_all().await?))
}

pub async fn add_bill(
    State(state): State<AppState>,
    Json(payload): Json<BillInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(
        state.services.admin_activities.add_bill(payload).await?,
    ))
}

pub async fn edit_bill(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<BillInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.admin_activities.edit_bill(id, payload).await?,
    ))
}

pub async fn delete_bill(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.admin_activities.delete_bill(id).await?;
    Ok(no_content_response())
}

pub async fn add_food_fuel(
    State(state): State<AppState>,
    Json(payload): Json<FoodFuelInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(
        state.services.admin_activities.add_food_fuel(payload).await?,
    ))
}

pub async fn edit_food_fuel(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<FoodFuelInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state
            .services
            .admin_activities
            .edit_food_fuel(id, payload)
            .await?,
    ))
}

pub async fn delete_food_fuel(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.admin_activities.delete_food_fuel(id).await?;
    Ok(no_content_response())
}

pub async fn add_security_incident(
    State(state): State<AppState>,
    Json(payload): Json<SecurityInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(
        state
            .services
            .admin_activities
            .add_security_incident(payload)
            .await?,
    ))
}

pub async fn add_petty_cash(
    State(state): State<AppState>,
    Json(payload): Json<PettyCashInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(
        state.services.admin_activities.add_petty_cash(payload).await?,
    ))
}

pub async fn add_funding(
    State(state): State<AppState>,
    Json(payload): Json<FundingInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(
        state.services.admin_activities.add_funding(payload).await?,
    ))
}

pub async fn add_property_item(
    State(state): State<AppState>,
    Json(payload): Json<PropertyInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(
        state
            .services
            .admin_activities
            .add_property_item(payload)
            .await?,
    ))
}

pub async fn add_letter(
    State(state): State<AppState>,
    Json(payload): Json<LetterInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(
        state.services.admin_activities.add_letter(payload).await?,
    ))
}

pub async fn bills_overview(
    State(state): State<AppState>,
    Query(range): Query<OverviewRange>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.admin_activities.bills_overview(range).await?,
    ))
}

pub async fn petty_cash_overview(
    State(state): State<AppState>,
    Query(range): Query<OverviewRange>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state
            .services
            .admin_activities
            .petty_cash_overview(range)
            .await?,
    ))
}

pub async fn funding_overview(
    State(state): State<AppState>,
    Query(range): Query<OverviewRange>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.admin_activities.funding_overview(range).await?,
    ))
}

pub async fn property_overview(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.admin_activities.property_overview().await?,
    ))
}

pub async fn letters_overview(
    State(state): State<AppState>,
    Query(range): Query<OverviewRange>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.admin_activities.letters_overview(range).await?,
    ))
}

pub async fn export_section(
    State(state): State<AppState>,
    Path(section): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let section: AdminSection = section
        .parse()
        .map_err(|_| ApiError::ValidationError(format!("Unknown section {}", section)))?;
    Ok(csv_response(
        state.services.admin_activities.export(section).await?,
    ))
}

pub fn routes() -> Router<AppState> {
    let read = Router::new()
        .route("/admin-activities", get(list_all))
        .route("/admin-activities/overview/bills", get(bills_overview))
        .route("/admin-activities/overview/petty-cash", get(petty_cash_overview))
        .route("/admin-activities/overview/funding", get(funding_overview))
        .route("/admin-activities/overview/property", get(property_overview))
        .route("/admin-activities/overview/letters", get(letters_overview))
        .route("/admin-activities/export/:section", get(export_section))
        .with_permission(perm::ADMIN_ACTIVITIES_VIEW);

    let edit = Router::new()
        .route("/admin-activities/bills", post(add_bill))
        .route("/admin-activities/bills/:id", put(edit_bill))
        .route("/admin-activities/food-fuel", post(add_food_fuel))
        .route("/admin-activities/food-fuel/:id", put(edit_food_fuel))
        .route("/admin-activities/security", post(add_security_incident))
        .route("/admin-activities/petty-cash", post(add_petty_cash))
        .route("/admin-activities/funding", post(add_funding))
        .route("/admin-activities/property", post(add_property_item))
        .route("/admin-activities/letters", post(add_letter))
        .with_permission(perm::ADMIN_ACTIVITIES_EDIT);

    let remove = Router::new()
        .route("/admin-activities/bills/:id", delete(delete_bill))
        .route("/admin-activities/food-fuel/:id", delete(delete_food_fuel))
        .with_permission(perm::ADMIN_ACTIVITIES_DELETE);

    read.merge(edit).merge(remove)
}

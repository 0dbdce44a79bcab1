use super::common::{created_response, csv_response, no_content_response, success_response};
use crate::{
    auth::{consts as perm, AuthRouterExt, AuthenticatedUser},
    errors::ApiError,
    handlers::AppState,
    services::planning::{NewPlans, PlanUpdate},
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

pub async fn planning_overview(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.planning.overview().await?))
}

pub async fn planning_summary(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.planning.summary().await?))
}

pub async fn planning_pareto(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.planning.pareto().await?))
}

pub async fn planning_products(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.planning.products().await?))
}

pub async fn plan_change_log(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.planning.change_log(id).await?))
}

pub async fn export_plans(
    State(state): State<AppState>,
    Path(period): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(csv_response(state.services.planning.export(&period).await?))
}

pub async fn create_plans(
    State(state): State<AppState>,
    Json(payload): Json<NewPlans>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(
        state.services.planning.create_plan(payload).await?,
    ))
}

pub async fn update_plan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
    Json(payload): Json<PlanUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let plan = state
        .services
        .planning
        .update_plan(id, payload, user.user_id)
        .await?;
    Ok(success_response(plan))
}

pub async fn delete_plan(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.planning.delete_plan(id).await?;
    Ok(no_content_response())
}

pub fn routes() -> Router<AppState> {
    let read = Router::new()
        .route("/planning", get(planning_overview))
        .route("/planning/summary", get(planning_summary))
        .route("/planning/pareto", get(planning_pareto))
        .route("/planning/products", get(planning_products))
        .route("/planning/export/:period", get(export_plans))
        .route("/planning/plans/:id/changes", get(plan_change_log))
        .with_permission(perm::PLANNING_VIEW);

    let edit = Router::new()
        .route("/planning/plans", post(create_plans))
        .route("/planning/plans/:id", put(update_plan))
        .with_permission(perm::PLANNING_EDIT);

    let delete = Router::new()
        .route("/planning/plans/:id", axum::routing::delete(delete_plan))
        .with_permission(perm::PLANNING_DELETE);

    read.merge(edit).merge(delete)
}

use super::common::{created_response, success_response};
use crate::{
    auth::{consts as perm, AuthRouterExt},
    errors::ApiError,
    handlers::AppState,
    services::projects::{NewActivity, NewFollowup, NewProject, NewReport},
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct WeekQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub project_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ActivityStatus {
    pub status: String,
}

pub async fn project_overview(
    State(state): State<AppState>,
    Query(week): Query<WeekQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.projects.overview(week.start, week.end).await?,
    ))
}

pub async fn add_project(
    State(state): State<AppState>,
    Json(payload): Json<NewProject>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(state.services.projects.add_project(payload).await?))
}

pub async fn add_activity(
    State(state): State<AppState>,
    Json(payload): Json<NewActivity>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(state.services.projects.add_activity(payload).await?))
}

pub async fn update_activity_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<ActivityStatus>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state
            .services
            .projects
            .update_activity_status(id, &payload.status)
            .await?,
    ))
}

/// Gantt-style span of a project and its activities
pub async fn project_activities(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.projects.project_activities(id).await?,
    ))
}

pub async fn add_followup(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<NewFollowup>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(
        state.services.projects.add_followup(id, payload).await?,
    ))
}

pub async fn add_report(
    State(state): State<AppState>,
    Json(payload): Json<NewReport>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(state.services.projects.add_report(payload).await?))
}

pub async fn list_reports(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.projects.list_reports(query.project_id).await?,
    ))
}

pub fn routes() -> Router<AppState> {
    let read = Router::new()
        .route("/projects", get(project_overview))
        .route("/projects/reports", get(list_reports))
        .route("/projects/:id/activities", get(project_activities))
        .with_permission(perm::PROJECT_VIEW);

    let edit = Router::new()
        .route("/projects", post(add_project))
        .route("/projects/reports", post(add_report))
        .route("/projects/activities", post(add_activity))
        .route("/projects/activities/:id/status", put(update_activity_status))
        .route("/projects/activities/:id/followups", post(add_followup))
        .with_permission(perm::PROJECT_EDIT);

    read.merge(edit)
}

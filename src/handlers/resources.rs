use super::common::{created_response, file_response, read_multipart, success_response};
use crate::{
    auth::{consts as perm, AuthRouterExt, AuthenticatedUser},
    errors::ApiError,
    handlers::AppState,
    services::resources::NewResource,
};
use axum::{
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct CategoryQuery {
    pub category: Option<String>,
}

pub async fn list_resources(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state
            .services
            .resources
            .list(query.category.as_deref())
            .await?,
    ))
}

pub async fn download_resource(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let file = state.services.resources.download(&filename).await?;
    Ok(file_response(&file.filename, file.content_type, file.bytes))
}

/// Multipart form with `title`, `category` and one file part
pub async fn upload_resource(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_multipart(multipart).await?;
    let title = form.require_text("title")?.to_string();
    let category = form.require_text("category")?.to_lowercase();
    let file = form.require_file()?;
    let created = state
        .services
        .resources
        .upload(
            NewResource {
                title,
                category,
                original_name: file.filename,
                bytes: file.bytes,
            },
            user.user_id,
        )
        .await?;
    Ok(created_response(created))
}

pub fn routes() -> Router<AppState> {
    let read = Router::new()
        .route("/resources", get(list_resources))
        .route("/resources/:filename", get(download_resource))
        .with_permission(perm::RESOURCES_VIEW);

    let upload = Router::new()
        .route("/resources", post(upload_resource))
        .with_role("admin");

    read.merge(upload)
}

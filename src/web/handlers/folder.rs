//! Folder handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::file::{FolderService, NewFolder};
use crate::web::dto::{ApiResponse, CreateFolderRequest, FolderListQuery, FolderResponse, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;

use super::AppState;

/// POST /api/folders - Create a folder.
#[utoipa::path(
    post,
    path = "/api/folders",
    tag = "folders",
    request_body = CreateFolderRequest,
    responses(
        (status = 201, description = "Folder created", body = FolderResponse),
        (status = 400, description = "Invalid name"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Parent folder not found"),
        (status = 409, description = "Name already used in this location")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateFolderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<FolderResponse>>), ApiError> {
    let owner = state.current_user(&auth_user.0).await?;

    let new_folder = NewFolder {
        name: req.name,
        parent_id: req.parent_id,
    };
    let folder = FolderService::new(&state.db)
        .create_folder(owner.id, &new_folder)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(FolderResponse::from(folder))),
    ))
}

/// GET /api/folders - List child folders.
#[utoipa::path(
    get,
    path = "/api/folders",
    tag = "folders",
    params(FolderListQuery),
    responses(
        (status = 200, description = "Child folders ordered by name", body = Vec<FolderResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Parent folder not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_folders(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Query(query): Query<FolderListQuery>,
) -> Result<Json<ApiResponse<Vec<FolderResponse>>>, ApiError> {
    let owner = state.current_user(&auth_user.0).await?;

    let folders = FolderService::new(&state.db)
        .list_folders(owner.id, query.parent_id)
        .await?;

    Ok(Json(ApiResponse::new(
        folders.into_iter().map(FolderResponse::from).collect(),
    )))
}

/// GET /api/folders/:id - Get a folder.
#[utoipa::path(
    get,
    path = "/api/folders/{id}",
    tag = "folders",
    params(("id" = i64, Path, description = "Folder ID")),
    responses(
        (status = 200, description = "Folder with its parent's name", body = FolderResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Folder not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_folder(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<FolderResponse>>, ApiError> {
    let owner = state.current_user(&auth_user.0).await?;
    let folder = FolderService::new(&state.db).get_folder(id, owner.id).await?;
    Ok(Json(ApiResponse::new(FolderResponse::from(folder))))
}

/// GET /api/folders/:id/path - Ancestors of a folder, root first.
#[utoipa::path(
    get,
    path = "/api/folders/{id}/path",
    tag = "folders",
    params(("id" = i64, Path, description = "Folder ID")),
    responses(
        (status = 200, description = "Path from the top-level folder down to this one", body = Vec<FolderResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Folder not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_folder_path(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<FolderResponse>>>, ApiError> {
    let owner = state.current_user(&auth_user.0).await?;
    let path = FolderService::new(&state.db).breadcrumb(id, owner.id).await?;
    Ok(Json(ApiResponse::new(
        path.into_iter().map(FolderResponse::from).collect(),
    )))
}

/// DELETE /api/folders/:id - Delete an empty folder.
#[utoipa::path(
    delete,
    path = "/api/folders/{id}",
    tag = "folders",
    params(("id" = i64, Path, description = "Folder ID")),
    responses(
        (status = 204, description = "Folder deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Folder not found"),
        (status = 409, description = "Folder is not empty")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_folder(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let owner = state.current_user(&auth_user.0).await?;
    FolderService::new(&state.db).delete_folder(id, owner.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! File handlers.

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
        StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use futures::TryStreamExt;
use std::io;
use std::sync::Arc;
use tokio_util::io::{ReaderStream, StreamReader};

use crate::file::{FileService, FileSort, UploadRequest};
use crate::web::dto::{
    ApiResponse, FileListQuery, FileResponse, PaginatedResponse, SearchQuery, StatsResponse,
    UploadQuery, UploadResponse,
};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;

use super::AppState;

/// Build a Content-Disposition header value for a download.
///
/// Names that are not plain ASCII get an ASCII fallback plus an RFC 5987
/// `filename*` parameter.
fn content_disposition_header(filename: &str) -> String {
    let plain = filename
        .chars()
        .all(|c| c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\');
    if plain {
        return format!("attachment; filename=\"{filename}\"");
    }

    let fallback: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            c if !c.is_ascii() => '_',
            c => c,
        })
        .collect();

    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    )
}

/// POST /api/files/upload - Upload a file.
///
/// Multipart body: an optional `name` text part, then a `file` part whose
/// bytes are streamed to the blob store.
#[utoipa::path(
    post,
    path = "/api/files/upload",
    tag = "files",
    params(UploadQuery),
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "File uploaded", body = UploadResponse),
        (status = 400, description = "Empty or missing file"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Folder not found"),
        (status = 413, description = "File too large")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<UploadResponse>>), ApiError> {
    let owner = state.current_user(&auth_user.0).await?;
    let mut display_name: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let part_name = field.name().map(str::to_string);
        match part_name.as_deref() {
            Some("name") => {
                let text = field.text().await.map_err(multipart_error)?;
                display_name = Some(text).filter(|s| !s.trim().is_empty());
            }
            Some("file") => {
                let name = display_name
                    .take()
                    .or_else(|| field.file_name().map(str::to_string))
                    .ok_or_else(|| ApiError::bad_request("File name is required"))?;
                let media_type = field.content_type().map(str::to_string);

                let stream = field.map_err(|e| io::Error::other(e.to_string()));
                let reader = StreamReader::new(Box::pin(stream));

                let mut request = UploadRequest::new(name, reader);
                if let Some(media_type) = media_type {
                    request = request.with_media_type(media_type);
                }
                if let Some(folder_id) = query.folder_id {
                    request = request.with_folder(folder_id);
                }

                let record = FileService::new(&state.db, &state.storage)
                    .upload(owner.id, request)
                    .await?;

                return Ok((
                    StatusCode::CREATED,
                    Json(ApiResponse::new(UploadResponse::from(record))),
                ));
            }
            _ => {}
        }
    }

    Err(ApiError::bad_request("Missing file part"))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::payload_too_large("File too large");
    }
    ApiError::bad_request(format!("Invalid multipart body: {}", e.body_text()))
}

/// GET /api/files - List files in a folder, or the unfiled files.
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "files",
    params(FileListQuery),
    responses(
        (status = 200, description = "One page of files", body = Vec<FileResponse>),
        (status = 400, description = "Bad paging or sort parameters"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Folder not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Query(query): Query<FileListQuery>,
) -> Result<Json<PaginatedResponse<FileResponse>>, ApiError> {
    let owner = state.current_user(&auth_user.0).await?;
    let page = state.page_request(query.page, query.size)?;
    let sort = match query.sort.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(sort) => sort.parse::<FileSort>()?,
        None => FileSort::default(),
    };

    let files = FileService::new(&state.db, &state.storage)
        .list_files(owner.id, query.folder_id, page, sort)
        .await?;

    Ok(Json(PaginatedResponse::from_page(files, FileResponse::from)))
}

/// GET /api/files/search - Search files by name.
#[utoipa::path(
    get,
    path = "/api/files/search",
    tag = "files",
    params(SearchQuery),
    responses(
        (status = 200, description = "One page of matching files, newest first", body = Vec<FileResponse>),
        (status = 400, description = "Empty search text"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn search_files(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<PaginatedResponse<FileResponse>>, ApiError> {
    let owner = state.current_user(&auth_user.0).await?;
    let page = state.page_request(query.page, query.size)?;

    let files = FileService::new(&state.db, &state.storage)
        .search_files(owner.id, &query.q, page)
        .await?;

    Ok(Json(PaginatedResponse::from_page(files, FileResponse::from)))
}

/// GET /api/files/stats - File count and storage used.
#[utoipa::path(
    get,
    path = "/api/files/stats",
    tag = "files",
    responses(
        (status = 200, description = "Usage of the current user", body = StatsResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn file_stats(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<StatsResponse>>, ApiError> {
    let owner = state.current_user(&auth_user.0).await?;
    let stats = FileService::new(&state.db, &state.storage)
        .stats(owner.id)
        .await?;
    Ok(Json(ApiResponse::new(StatsResponse::from(stats))))
}

/// GET /api/files/:id - File metadata.
#[utoipa::path(
    get,
    path = "/api/files/{id}",
    tag = "files",
    params(("id" = i64, Path, description = "File ID")),
    responses(
        (status = 200, description = "File metadata", body = FileResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let owner = state.current_user(&auth_user.0).await?;
    let file = FileService::new(&state.db, &state.storage)
        .get_file(id, owner.id)
        .await?;
    Ok(Json(ApiResponse::new(FileResponse::from(file))))
}

/// GET /api/files/:id/download - Stream file content.
#[utoipa::path(
    get,
    path = "/api/files/{id}/download",
    tag = "files",
    params(("id" = i64, Path, description = "File ID")),
    responses(
        (status = 200, description = "File content with the stored media type"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let owner = state.current_user(&auth_user.0).await?;
    let download = FileService::new(&state.db, &state.storage)
        .download(id, owner.id)
        .await?;

    let record = download.record;
    let body = Body::from_stream(ReaderStream::new(download.blob.file));

    Ok((
        [
            (CONTENT_TYPE, record.media_type),
            (CONTENT_LENGTH, download.blob.size.to_string()),
            (
                CONTENT_DISPOSITION,
                content_disposition_header(&record.display_name),
            ),
        ],
        body,
    )
        .into_response())
}

/// DELETE /api/files/:id - Delete a file and its content.
#[utoipa::path(
    delete,
    path = "/api/files/{id}",
    tag = "files",
    params(("id" = i64, Path, description = "File ID")),
    responses(
        (status = 204, description = "File deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let owner = state.current_user(&auth_user.0).await?;
    FileService::new(&state.db, &state.storage)
        .delete_file(id, owner.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

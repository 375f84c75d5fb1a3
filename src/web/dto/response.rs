//! Response DTOs for the HTTP API.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::User;
use crate::file::{FileRecord, FileStats, FileView, Folder, FolderView, Page};

/// Message returned with every successful upload.
pub const UPLOAD_SUCCESS_MESSAGE: &str = "File uploaded successfully";

/// `{"data": ...}` envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Paginated response wrapper.
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T: Serialize> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

impl<T: Serialize> PaginatedResponse<T> {
    /// Build a response from a catalog page.
    pub fn from_page<U>(page: Page<U>, f: impl FnMut(U) -> T) -> Self {
        let page = page.map(f);
        Self {
            meta: PaginationMeta {
                page: page.page,
                size: page.page_size,
                total: page.total_items,
                total_pages: page.total_pages,
            },
            data: page.items,
        }
    }
}

/// Pagination metadata.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaginationMeta {
    /// Zero-based page index.
    pub page: u32,
    /// Requested page size.
    pub size: u32,
    /// Total number of matching items.
    pub total: u64,
    /// Number of pages.
    pub total_pages: u64,
}

/// User information in responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserInfo {
    pub id: i64,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role.to_string(),
            created_at: user.created_at,
        }
    }
}

/// Login and registration response.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    /// Access token (JWT).
    pub access_token: String,
    /// Always `Bearer`.
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    pub user: UserInfo,
}

/// Folder in responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct FolderResponse {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    /// Only filled in by the single-folder lookup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Folder> for FolderResponse {
    fn from(folder: Folder) -> Self {
        Self {
            id: folder.id,
            name: folder.name,
            parent_id: folder.parent_id,
            parent_name: None,
            created_at: folder.created_at,
            updated_at: folder.updated_at,
        }
    }
}

impl From<FolderView> for FolderResponse {
    fn from(view: FolderView) -> Self {
        Self {
            parent_name: view.parent_name,
            ..Self::from(view.folder)
        }
    }
}

/// File metadata in responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct FileResponse {
    pub id: i64,
    pub file_name: String,
    pub file_size: i64,
    pub content_type: String,
    pub folder_id: Option<i64>,
    pub folder_name: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

impl From<FileView> for FileResponse {
    fn from(view: FileView) -> Self {
        let file = view.file;
        Self {
            id: file.id,
            file_name: file.display_name,
            file_size: file.size_bytes,
            content_type: file.media_type,
            folder_id: file.folder_id,
            folder_name: view.folder_name,
            uploaded_at: file.uploaded_at,
        }
    }
}

/// Upload result.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub id: i64,
    pub file_name: String,
    pub file_size: i64,
    pub content_type: String,
    pub message: String,
}

impl From<FileRecord> for UploadResponse {
    fn from(file: FileRecord) -> Self {
        Self {
            id: file.id,
            file_name: file.display_name,
            file_size: file.size_bytes,
            content_type: file.media_type,
            message: UPLOAD_SUCCESS_MESSAGE.to_string(),
        }
    }
}

/// Per-owner usage.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    pub file_count: i64,
    /// Sum of file sizes in bytes.
    pub storage_used: i64,
}

impl From<FileStats> for StatsResponse {
    fn from(stats: FileStats) -> Self {
        Self {
            file_count: stats.file_count,
            storage_used: stats.storage_used,
        }
    }
}

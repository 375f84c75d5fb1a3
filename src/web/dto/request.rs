//! Request DTOs for the HTTP API.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::validation::not_empty_trimmed;

/// Account registration request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    /// Login email.
    #[validate(length(min = 3, max = 254, message = "Email must be 3-254 characters"))]
    pub email: String,
    /// Password (8-128 characters).
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,
}

/// Login request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Folder creation request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateFolderRequest {
    /// Folder name, unique among its siblings.
    #[validate(
        length(min = 1, max = 255, message = "Name must be 1-255 characters"),
        custom(function = "not_empty_trimmed")
    )]
    pub name: String,
    /// Parent folder (omit for a top-level folder).
    #[serde(default, alias = "parentId")]
    pub parent_id: Option<i64>,
}

/// Multipart upload body.
#[derive(Debug, ToSchema)]
pub struct UploadForm {
    /// Display name; the file part's own name is used when absent.
    pub name: Option<String>,
    /// File content.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// Query for listing folders.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FolderListQuery {
    /// Parent folder (omit for top-level folders).
    #[serde(rename = "parentId")]
    pub parent_id: Option<i64>,
}

/// Query for the upload target.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UploadQuery {
    /// Target folder (omit for unfiled).
    #[serde(rename = "folderId")]
    pub folder_id: Option<i64>,
}

/// Query for listing files.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FileListQuery {
    /// Folder to list (omit for unfiled files).
    #[serde(rename = "folderId")]
    pub folder_id: Option<i64>,
    /// Zero-based page index.
    pub page: Option<u32>,
    /// Page size.
    pub size: Option<u32>,
    /// Sort as `key[,direction]`, key one of uploadedAt, name, size.
    pub sort: Option<String>,
}

/// Query for searching files.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive substring of the file name.
    #[serde(default)]
    pub q: String,
    /// Zero-based page index.
    pub page: Option<u32>,
    /// Page size.
    pub size: Option<u32>,
}

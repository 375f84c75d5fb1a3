//! File management module for Stowage.
//!
//! This module provides per-owner file storage including:
//! - Hierarchical folder tree with sibling-unique names
//! - File metadata catalog with paging, sorting and search
//! - Blob store with opaque, sharded object names
//! - Services tying the catalog to the blob store

mod folder;
mod metadata;
mod page;
mod service;
mod storage;

pub use folder::{validate_folder_name, Folder, FolderRepository, FolderView, NewFolder};
pub use metadata::{validate_display_name, FileRecord, FileRepository, FileView, NewFile};
pub use page::{FileSort, Page, PageRequest, SortDirection, SortKey};
pub use service::{
    resolve_media_type, Download, FileService, FileStats, FolderService, UploadRequest,
};
pub use storage::{BlobReader, BlobStore, StoredBlob};

/// Maximum length for folder and file names (in characters).
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum number of ancestors walked when building a folder path.
pub const MAX_FOLDER_DEPTH: usize = 64;

/// Media type used when none can be determined.
pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// Maximum number of name characters kept in a blob name suffix.
pub const BLOB_SUFFIX_LENGTH: usize = 40;

/// Maximum length of a blob name.
pub const MAX_BLOB_NAME_LENGTH: usize = 128;

//! File metadata types and repository for Stowage.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::page::{FileSort, Page, PageRequest};
use super::MAX_NAME_LENGTH;
use crate::db::now_timestamp;
use crate::{Result, StowageError};

const VIEW_SELECT: &str = "SELECT f.id, f.display_name, f.blob_name, f.size_bytes, f.media_type,
            f.folder_id, f.owner_id, f.uploaded_at, d.name AS folder_name
     FROM file_metadata f
     LEFT JOIN folders d ON d.id = f.folder_id";

/// Metadata of a stored file.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct FileRecord {
    /// Unique file ID.
    pub id: i64,
    /// User-visible file name.
    pub display_name: String,
    /// Name of the backing object in the blob store.
    pub blob_name: String,
    /// File size in bytes.
    pub size_bytes: i64,
    /// Media type (MIME).
    pub media_type: String,
    /// Containing folder (None for unfiled files).
    pub folder_id: Option<i64>,
    /// Owning user ID.
    pub owner_id: i64,
    /// Upload timestamp.
    pub uploaded_at: DateTime<Utc>,
}

/// A file record together with its folder's name.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FileView {
    #[sqlx(flatten)]
    pub file: FileRecord,
    pub folder_name: Option<String>,
}

/// Data for creating a new file record.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub display_name: String,
    pub blob_name: String,
    pub size_bytes: i64,
    pub media_type: String,
    pub folder_id: Option<i64>,
}

/// Validate a display name and return it trimmed.
pub fn validate_display_name(name: &str) -> Result<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(StowageError::InvalidInput(
            "file name must not be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(StowageError::InvalidInput(format!(
            "file name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(StowageError::InvalidInput(
            "file name contains control characters".to_string(),
        ));
    }

    Ok(name.to_string())
}

/// Repository for file metadata operations.
pub struct FileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a file record for `owner_id`.
    ///
    /// The insert only happens if the target folder (if any) is owned by
    /// `owner_id`; otherwise it fails with `NotFound`.
    pub async fn create(&self, owner_id: i64, file: &NewFile) -> Result<FileRecord> {
        let result = sqlx::query(
            "INSERT INTO file_metadata
                 (display_name, search_name, blob_name, size_bytes, media_type,
                  folder_id, owner_id, uploaded_at)
             SELECT ?, ?, ?, ?, ?, ?, ?, ?
             WHERE ? IS NULL
                OR EXISTS (SELECT 1 FROM folders WHERE id = ? AND owner_id = ?)",
        )
        .bind(&file.display_name)
        .bind(file.display_name.to_lowercase())
        .bind(&file.blob_name)
        .bind(file.size_bytes)
        .bind(&file.media_type)
        .bind(file.folder_id)
        .bind(owner_id)
        .bind(now_timestamp())
        .bind(file.folder_id)
        .bind(file.folder_id)
        .bind(owner_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StowageError::NotFound("folder".to_string()));
        }

        self.get(result.last_insert_rowid(), owner_id)
            .await?
            .ok_or_else(|| StowageError::NotFound("file".to_string()))
    }

    /// Get a file record by ID, scoped to its owner.
    pub async fn get(&self, id: i64, owner_id: i64) -> Result<Option<FileRecord>> {
        let file = sqlx::query_as::<_, FileRecord>(
            "SELECT id, display_name, blob_name, size_bytes, media_type,
                    folder_id, owner_id, uploaded_at
             FROM file_metadata WHERE id = ? AND owner_id = ?",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(file)
    }

    /// Get a file record with its folder name, scoped to its owner.
    pub async fn get_view(&self, id: i64, owner_id: i64) -> Result<Option<FileView>> {
        let sql = format!("{VIEW_SELECT} WHERE f.id = ? AND f.owner_id = ?");
        let view = sqlx::query_as::<_, FileView>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(self.pool)
            .await?;

        Ok(view)
    }

    /// List one page of the files directly in `folder_id` (unfiled files
    /// when None). Does not check that the folder exists.
    pub async fn list(
        &self,
        owner_id: i64,
        folder_id: Option<i64>,
        page: PageRequest,
        sort: FileSort,
    ) -> Result<Page<FileView>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM file_metadata WHERE owner_id = ? AND folder_id IS ?",
        )
        .bind(owner_id)
        .bind(folder_id)
        .fetch_one(self.pool)
        .await?;

        let sql = format!(
            "{VIEW_SELECT}
             WHERE f.owner_id = ? AND f.folder_id IS ?
             ORDER BY {}
             LIMIT ? OFFSET ?",
            sort.order_by()
        );
        let items = sqlx::query_as::<_, FileView>(&sql)
            .bind(owner_id)
            .bind(folder_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.pool)
            .await?;

        Ok(Page::new(items, page, total as u64))
    }

    /// Search all of an owner's files whose display name contains `needle`,
    /// ignoring case. Newest first.
    ///
    /// The match is a plain substring test, so `%` and `_` are literal.
    pub async fn search(
        &self,
        owner_id: i64,
        needle: &str,
        page: PageRequest,
    ) -> Result<Page<FileView>> {
        let needle = needle.to_lowercase();

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM file_metadata WHERE owner_id = ? AND instr(search_name, ?) > 0",
        )
        .bind(owner_id)
        .bind(&needle)
        .fetch_one(self.pool)
        .await?;

        let sql = format!(
            "{VIEW_SELECT}
             WHERE f.owner_id = ? AND instr(f.search_name, ?) > 0
             ORDER BY {}
             LIMIT ? OFFSET ?",
            FileSort::default().order_by()
        );
        let items = sqlx::query_as::<_, FileView>(&sql)
            .bind(owner_id)
            .bind(&needle)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.pool)
            .await?;

        Ok(Page::new(items, page, total as u64))
    }

    /// Delete a file record.
    ///
    /// Returns `true` if a row was deleted.
    pub async fn delete(&self, id: i64, owner_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM file_metadata WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Total bytes stored by an owner.
    pub async fn storage_used(&self, owner_id: i64) -> Result<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(size_bytes), 0) FROM file_metadata WHERE owner_id = ?",
        )
        .bind(owner_id)
        .fetch_one(self.pool)
        .await?;

        Ok(total)
    }

    /// Number of files owned by a user.
    pub async fn count(&self, owner_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM file_metadata WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }
}

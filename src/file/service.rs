//! File and folder services for Stowage.
//!
//! This module provides the owner-scoped operations used by the web layer:
//! - Folder create, list, get, delete and path lookup
//! - Upload (blob first, then metadata) and streamed download
//! - Paged listing, search, deletion and usage statistics

use tokio::io::AsyncRead;
use tracing::{info, warn};

use crate::db::Database;
use crate::{Result, StowageError};

use super::folder::{validate_folder_name, Folder, FolderRepository, FolderView, NewFolder};
use super::metadata::{validate_display_name, FileRecord, FileRepository, FileView, NewFile};
use super::page::{FileSort, Page, PageRequest};
use super::storage::{BlobReader, BlobStore};
use super::DEFAULT_MEDIA_TYPE;

/// Folder tree operations for one database.
pub struct FolderService<'a> {
    db: &'a Database,
}

impl<'a> FolderService<'a> {
    /// Create a new FolderService.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create a folder.
    ///
    /// # Errors
    /// - `InvalidInput` for a bad name
    /// - `NotFound` if the parent is not owned by `owner_id`
    /// - `Conflict` if a sibling already has the name
    pub async fn create_folder(&self, owner_id: i64, request: &NewFolder) -> Result<Folder> {
        let folder = NewFolder {
            name: validate_folder_name(&request.name)?,
            parent_id: request.parent_id,
        };

        let created = FolderRepository::new(self.db.pool())
            .create(owner_id, &folder)
            .await?;

        info!(
            owner_id,
            folder_id = created.id,
            parent_id = ?created.parent_id,
            "Folder created"
        );
        Ok(created)
    }

    /// List the children of `parent_id`, or the top-level folders.
    pub async fn list_folders(&self, owner_id: i64, parent_id: Option<i64>) -> Result<Vec<Folder>> {
        let repo = FolderRepository::new(self.db.pool());

        if let Some(parent_id) = parent_id {
            repo.get(parent_id, owner_id)
                .await?
                .ok_or_else(|| StowageError::NotFound("folder".to_string()))?;
        }

        repo.list_children(owner_id, parent_id).await
    }

    /// Get a folder.
    pub async fn get_folder(&self, id: i64, owner_id: i64) -> Result<FolderView> {
        FolderRepository::new(self.db.pool())
            .get_view(id, owner_id)
            .await?
            .ok_or_else(|| StowageError::NotFound("folder".to_string()))
    }

    /// Delete an empty folder.
    pub async fn delete_folder(&self, id: i64, owner_id: i64) -> Result<()> {
        FolderRepository::new(self.db.pool())
            .delete(id, owner_id)
            .await?;

        info!(owner_id, folder_id = id, "Folder deleted");
        Ok(())
    }

    /// Get the path from the top level down to the folder.
    pub async fn breadcrumb(&self, id: i64, owner_id: i64) -> Result<Vec<Folder>> {
        FolderRepository::new(self.db.pool())
            .breadcrumb(id, owner_id)
            .await
    }
}

/// Request data for a file upload.
#[derive(Debug)]
pub struct UploadRequest<R> {
    /// User-visible file name.
    pub display_name: String,
    /// Media type reported by the client, if any.
    pub media_type: Option<String>,
    /// Target folder (None for unfiled).
    pub folder_id: Option<i64>,
    /// File content.
    pub content: R,
}

impl<R> UploadRequest<R> {
    /// Create a new unfiled upload request.
    pub fn new(display_name: impl Into<String>, content: R) -> Self {
        Self {
            display_name: display_name.into(),
            media_type: None,
            folder_id: None,
            content,
        }
    }

    /// Set the reported media type.
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// Set the target folder.
    pub fn with_folder(mut self, folder_id: i64) -> Self {
        self.folder_id = Some(folder_id);
        self
    }
}

/// Result of a file download.
#[derive(Debug)]
pub struct Download {
    /// File metadata. Name and media type for the response come from here.
    pub record: FileRecord,
    /// Open blob.
    pub blob: BlobReader,
}

/// Usage statistics for one owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStats {
    pub file_count: i64,
    pub storage_used: i64,
}

/// Pick the media type for an upload.
///
/// A valid, specific type reported by the client wins; otherwise it is
/// guessed from the file name, falling back to `application/octet-stream`.
pub fn resolve_media_type(reported: Option<&str>, display_name: &str) -> String {
    if let Some(reported) = reported.map(str::trim).filter(|s| !s.is_empty()) {
        if let Ok(mime) = reported.parse::<mime_guess::mime::Mime>() {
            if mime.essence_str() != DEFAULT_MEDIA_TYPE {
                return mime.essence_str().to_string();
            }
        }
    }

    mime_guess::from_path(display_name)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| DEFAULT_MEDIA_TYPE.to_string())
}

/// File catalog operations backed by a blob store.
pub struct FileService<'a> {
    db: &'a Database,
    storage: &'a BlobStore,
}

impl<'a> FileService<'a> {
    /// Create a new FileService.
    pub fn new(db: &'a Database, storage: &'a BlobStore) -> Self {
        Self { db, storage }
    }

    /// Upload a file.
    ///
    /// The target folder is checked first, then the blob is written, then the
    /// metadata row is inserted. If the insert fails the blob is removed
    /// again on a best-effort basis.
    pub async fn upload<R>(&self, owner_id: i64, request: UploadRequest<R>) -> Result<FileRecord>
    where
        R: AsyncRead + Unpin,
    {
        let display_name = validate_display_name(&request.display_name)?;
        let media_type = resolve_media_type(request.media_type.as_deref(), &display_name);

        if let Some(folder_id) = request.folder_id {
            FolderRepository::new(self.db.pool())
                .get(folder_id, owner_id)
                .await?
                .ok_or_else(|| StowageError::NotFound("folder".to_string()))?;
        }

        let stored = self.storage.store(request.content, &display_name).await?;

        let new_file = NewFile {
            display_name,
            blob_name: stored.blob_name.clone(),
            size_bytes: stored.size as i64,
            media_type,
            folder_id: request.folder_id,
        };

        let record = match FileRepository::new(self.db.pool())
            .create(owner_id, &new_file)
            .await
        {
            Ok(record) => record,
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&stored.blob_name).await {
                    warn!(
                        blob_name = %stored.blob_name,
                        error = %cleanup,
                        "Failed to remove blob after metadata insert failed"
                    );
                }
                return Err(e);
            }
        };

        info!(
            owner_id,
            file_id = record.id,
            folder_id = ?record.folder_id,
            bytes = record.size_bytes,
            "File uploaded"
        );
        Ok(record)
    }

    /// Open a file for download.
    pub async fn download(&self, id: i64, owner_id: i64) -> Result<Download> {
        let record = FileRepository::new(self.db.pool())
            .get(id, owner_id)
            .await?
            .ok_or_else(|| StowageError::NotFound("file".to_string()))?;

        let blob = self.storage.open(&record.blob_name).await.map_err(|e| match e {
            StowageError::NotFound(_) => {
                warn!(file_id = id, blob_name = %record.blob_name, "Blob missing for file");
                StowageError::NotFound("file content".to_string())
            }
            other => other,
        })?;

        Ok(Download { record, blob })
    }

    /// Get file metadata.
    pub async fn get_file(&self, id: i64, owner_id: i64) -> Result<FileView> {
        FileRepository::new(self.db.pool())
            .get_view(id, owner_id)
            .await?
            .ok_or_else(|| StowageError::NotFound("file".to_string()))
    }

    /// List one page of files in a folder, or the unfiled files.
    pub async fn list_files(
        &self,
        owner_id: i64,
        folder_id: Option<i64>,
        page: PageRequest,
        sort: FileSort,
    ) -> Result<Page<FileView>> {
        if let Some(folder_id) = folder_id {
            FolderRepository::new(self.db.pool())
                .get(folder_id, owner_id)
                .await?
                .ok_or_else(|| StowageError::NotFound("folder".to_string()))?;
        }

        FileRepository::new(self.db.pool())
            .list(owner_id, folder_id, page, sort)
            .await
    }

    /// Search files by a case-insensitive substring of their name.
    pub async fn search_files(
        &self,
        owner_id: i64,
        needle: &str,
        page: PageRequest,
    ) -> Result<Page<FileView>> {
        let needle = needle.trim();
        if needle.is_empty() {
            return Err(StowageError::InvalidInput(
                "search text must not be empty".to_string(),
            ));
        }

        FileRepository::new(self.db.pool())
            .search(owner_id, needle, page)
            .await
    }

    /// Delete a file and its blob.
    ///
    /// The blob goes first; if that fails the metadata is kept so the
    /// delete can be retried. A blob that is already gone is fine.
    pub async fn delete_file(&self, id: i64, owner_id: i64) -> Result<()> {
        let repo = FileRepository::new(self.db.pool());
        let record = repo
            .get(id, owner_id)
            .await?
            .ok_or_else(|| StowageError::NotFound("file".to_string()))?;

        if !self.storage.delete(&record.blob_name).await? {
            warn!(file_id = id, blob_name = %record.blob_name, "Blob already absent");
        }

        if !repo.delete(id, owner_id).await? {
            return Err(StowageError::NotFound("file".to_string()));
        }

        info!(owner_id, file_id = id, "File deleted");
        Ok(())
    }

    /// Usage statistics for an owner.
    pub async fn stats(&self, owner_id: i64) -> Result<FileStats> {
        let repo = FileRepository::new(self.db.pool());
        Ok(FileStats {
            file_count: repo.count(owner_id).await?,
            storage_used: repo.storage_used(owner_id).await?,
        })
    }

    /// Get the blob store used by this service.
    pub fn storage(&self) -> &BlobStore {
        self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    struct Fixture {
        db: Database,
        store: BlobStore,
        alice: i64,
        bob: i64,
        _temp_dir: TempDir,
    }

    async fn setup() -> Fixture {
        let db = Database::open_in_memory().await.unwrap();
        let temp_dir = TempDir::new().unwrap();
        let store = BlobStore::new(temp_dir.path(), 1024 * 1024).unwrap();
        let users = UserRepository::new(db.pool());
        let alice = users
            .create(&NewUser::new("alice@example.com", "hash"))
            .await
            .unwrap()
            .id;
        let bob = users
            .create(&NewUser::new("bob@example.com", "hash"))
            .await
            .unwrap()
            .id;
        Fixture {
            db,
            store,
            alice,
            bob,
            _temp_dir: temp_dir,
        }
    }

    fn page(page: u32, size: u32) -> PageRequest {
        PageRequest::new(page, size, 100).unwrap()
    }

    fn blob_count(root: &std::path::Path) -> usize {
        std::fs::read_dir(root)
            .unwrap()
            .flatten()
            .map(|entry| {
                let path = entry.path();
                if path.is_dir() {
                    blob_count(&path)
                } else {
                    1
                }
            })
            .sum()
    }

    #[test]
    fn test_resolve_media_type() {
        assert_eq!(resolve_media_type(Some("image/png"), "x.txt"), "image/png");
        assert_eq!(
            resolve_media_type(Some("text/plain; charset=utf-8"), "x.bin"),
            "text/plain"
        );
        assert_eq!(resolve_media_type(None, "report.pdf"), "application/pdf");
        assert_eq!(resolve_media_type(Some("not a mime"), "a.txt"), "text/plain");
        assert_eq!(resolve_media_type(Some(""), "noext"), DEFAULT_MEDIA_TYPE);
        assert_eq!(
            resolve_media_type(Some("application/octet-stream"), "notes.txt"),
            "text/plain"
        );
    }

    #[tokio::test]
    async fn test_folder_service_rejects_bad_names() {
        let f = setup().await;
        let folders = FolderService::new(&f.db);

        let result = folders.create_folder(f.alice, &NewFolder::new("../etc")).await;
        assert!(matches!(result, Err(StowageError::InvalidInput(_))));

        let created = folders
            .create_folder(f.alice, &NewFolder::new("  Docs "))
            .await
            .unwrap();
        assert_eq!(created.name, "Docs");
    }

    #[tokio::test]
    async fn test_list_folders_unknown_parent() {
        let f = setup().await;
        let folders = FolderService::new(&f.db);
        let docs = folders
            .create_folder(f.alice, &NewFolder::new("Docs"))
            .await
            .unwrap();

        assert!(folders
            .list_folders(f.alice, Some(docs.id))
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            folders.list_folders(f.bob, Some(docs.id)).await,
            Err(StowageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_and_download_round_trip() {
        let f = setup().await;
        let service = FileService::new(&f.db, &f.store);
        let content = b"Hello, World!".to_vec();

        let record = service
            .upload(f.alice, UploadRequest::new("greeting.txt", &content[..]))
            .await
            .unwrap();

        assert_eq!(record.display_name, "greeting.txt");
        assert_eq!(record.size_bytes, content.len() as i64);
        assert_eq!(record.media_type, "text/plain");
        assert_ne!(record.blob_name, record.display_name);

        let mut download = service.download(record.id, f.alice).await.unwrap();
        assert_eq!(download.record.display_name, "greeting.txt");
        assert_eq!(download.blob.size, content.len() as u64);

        let mut buf = Vec::new();
        download.blob.file.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, content);
    }

    #[tokio::test]
    async fn test_upload_empty_rejected() {
        let f = setup().await;
        let service = FileService::new(&f.db, &f.store);

        let result = service
            .upload(f.alice, UploadRequest::new("empty.txt", &b""[..]))
            .await;

        assert!(matches!(result, Err(StowageError::InvalidInput(_))));
        assert_eq!(service.stats(f.alice).await.unwrap().file_count, 0);
    }

    #[tokio::test]
    async fn test_upload_into_foreign_folder_not_found() {
        let f = setup().await;
        let docs = FolderService::new(&f.db)
            .create_folder(f.alice, &NewFolder::new("Docs"))
            .await
            .unwrap();
        let service = FileService::new(&f.db, &f.store);

        let result = service
            .upload(
                f.bob,
                UploadRequest::new("x.txt", &b"x"[..]).with_folder(docs.id),
            )
            .await;

        assert!(matches!(result, Err(StowageError::NotFound(_))));
        // Nothing was written to the blob store
        assert_eq!(blob_count(f.store.root()), 0);
    }

    #[tokio::test]
    async fn test_upload_removes_blob_when_metadata_insert_fails() {
        let f = setup().await;
        sqlx::query(
            "CREATE TRIGGER reject_file_metadata BEFORE INSERT ON file_metadata
             BEGIN SELECT RAISE(ABORT, 'metadata rejected'); END",
        )
        .execute(f.db.pool())
        .await
        .unwrap();
        let service = FileService::new(&f.db, &f.store);

        let result = service
            .upload(f.alice, UploadRequest::new("report.pdf", &b"content"[..]))
            .await;

        assert!(matches!(result, Err(StowageError::Database(_))));
        assert_eq!(blob_count(f.store.root()), 0);
        assert_eq!(service.stats(f.alice).await.unwrap().file_count, 0);
    }

    #[tokio::test]
    async fn test_other_owner_sees_nothing() {
        let f = setup().await;
        let service = FileService::new(&f.db, &f.store);

        let record = service
            .upload(f.alice, UploadRequest::new("secret.txt", &b"s"[..]))
            .await
            .unwrap();

        assert!(matches!(
            service.get_file(record.id, f.bob).await,
            Err(StowageError::NotFound(_))
        ));
        assert!(matches!(
            service.download(record.id, f.bob).await,
            Err(StowageError::NotFound(_))
        ));
        assert!(matches!(
            service.delete_file(record.id, f.bob).await,
            Err(StowageError::NotFound(_))
        ));
        let found = service.search_files(f.bob, "secret", page(0, 10)).await.unwrap();
        assert!(found.items.is_empty());
        let listed = service
            .list_files(f.bob, None, page(0, 10), FileSort::default())
            .await
            .unwrap();
        assert!(listed.items.is_empty());

        assert!(service.get_file(record.id, f.alice).await.is_ok());
    }

    #[tokio::test]
    async fn test_docs_scenario() {
        let f = setup().await;
        let folders = FolderService::new(&f.db);
        let files = FileService::new(&f.db, &f.store);

        let docs = folders
            .create_folder(f.alice, &NewFolder::new("Docs"))
            .await
            .unwrap();
        files
            .upload(
                f.alice,
                UploadRequest::new("a.txt", &b"aaa"[..]).with_folder(docs.id),
            )
            .await
            .unwrap();

        let listed = files
            .list_files(f.alice, Some(docs.id), page(0, 20), FileSort::default())
            .await
            .unwrap();
        assert_eq!(listed.items.len(), 1);
        assert_eq!(listed.items[0].file.display_name, "a.txt");
        assert_eq!(listed.items[0].folder_name.as_deref(), Some("Docs"));

        assert!(matches!(
            folders.create_folder(f.alice, &NewFolder::new("Docs")).await,
            Err(StowageError::Conflict(_))
        ));
        assert!(matches!(
            folders.get_folder(docs.id, f.bob).await,
            Err(StowageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_file_removes_blob() {
        let f = setup().await;
        let service = FileService::new(&f.db, &f.store);

        let record = service
            .upload(f.alice, UploadRequest::new("a.txt", &b"data"[..]))
            .await
            .unwrap();
        assert!(f.store.exists(&record.blob_name).await.unwrap());

        service.delete_file(record.id, f.alice).await.unwrap();

        assert!(!f.store.exists(&record.blob_name).await.unwrap());
        assert!(matches!(
            service.get_file(record.id, f.alice).await,
            Err(StowageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_file_with_missing_blob() {
        let f = setup().await;
        let service = FileService::new(&f.db, &f.store);

        let record = service
            .upload(f.alice, UploadRequest::new("a.txt", &b"data"[..]))
            .await
            .unwrap();
        f.store.delete(&record.blob_name).await.unwrap();

        // The record can still be removed
        service.delete_file(record.id, f.alice).await.unwrap();
        assert_eq!(service.stats(f.alice).await.unwrap().file_count, 0);
    }

    #[tokio::test]
    async fn test_download_with_missing_blob() {
        let f = setup().await;
        let service = FileService::new(&f.db, &f.store);

        let record = service
            .upload(f.alice, UploadRequest::new("a.txt", &b"data"[..]))
            .await
            .unwrap();
        f.store.delete(&record.blob_name).await.unwrap();

        assert!(matches!(
            service.download(record.id, f.alice).await,
            Err(StowageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_search_rejects_blank_needle() {
        let f = setup().await;
        let service = FileService::new(&f.db, &f.store);

        assert!(matches!(
            service.search_files(f.alice, "   ", page(0, 10)).await,
            Err(StowageError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_stats() {
        let f = setup().await;
        let service = FileService::new(&f.db, &f.store);

        service
            .upload(f.alice, UploadRequest::new("a.txt", &b"12345"[..]))
            .await
            .unwrap();
        service
            .upload(f.alice, UploadRequest::new("b.txt", &b"123"[..]))
            .await
            .unwrap();

        let stats = service.stats(f.alice).await.unwrap();
        assert_eq!(
            stats,
            FileStats {
                file_count: 2,
                storage_used: 8
            }
        );
        assert_eq!(service.stats(f.bob).await.unwrap().file_count, 0);
    }
}

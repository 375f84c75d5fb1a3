//! Blob storage for Stowage.
//!
//! This module maps uploaded byte streams to durable on-disk objects:
//! - Opaque blob names (UUID plus a sanitized hint of the suggested name)
//! - Directory sharding by the first 2 characters of the blob name
//! - Streamed store, open and idempotent delete

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{BLOB_SUFFIX_LENGTH, MAX_BLOB_NAME_LENGTH};
use crate::{Result, StowageError};

/// Size of the copy buffer used while storing a blob.
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// A blob that has been durably written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Generated blob name.
    pub blob_name: String,
    /// Number of bytes written.
    pub size: u64,
}

/// An opened blob ready to be streamed.
#[derive(Debug)]
pub struct BlobReader {
    /// Open file handle positioned at the start of the blob.
    pub file: fs::File,
    /// Size of the blob in bytes.
    pub size: u64,
}

/// Blob store backed by a local directory.
///
/// Blobs are stored in a sharded directory structure:
/// ```text
/// {root}/
/// ├── 3f/
/// │   └── 3f2b9c...e1_report.pdf
/// ├── a0/
/// │   └── a07d41...9c
/// └── ...
/// ```
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
    max_blob_size: u64,
}

impl BlobStore {
    /// Create a new BlobStore rooted at the given directory.
    ///
    /// The root directory will be created if it doesn't exist.
    pub fn new(root: impl Into<PathBuf>, max_blob_size: u64) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            StowageError::Storage(format!("cannot create blob root {}: {e}", root.display()))
        })?;

        Ok(Self {
            root,
            max_blob_size,
        })
    }

    /// Get the root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the largest blob this store accepts, in bytes.
    pub fn max_blob_size(&self) -> u64 {
        self.max_blob_size
    }

    /// Store the full content of `reader` under a freshly generated name.
    ///
    /// The content is written to a `.part` file, synced, then renamed into
    /// place. Empty content, content larger than the configured maximum, or
    /// any I/O error leaves nothing behind and returns no name.
    pub async fn store<R>(&self, reader: R, suggested_name: &str) -> Result<StoredBlob>
    where
        R: AsyncRead + Unpin,
    {
        let blob_name = Self::generate_blob_name(suggested_name);
        let path = self.blob_path(&blob_name)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_error("create shard directory", e))?;
        }

        let part_path = path.with_file_name(format!("{blob_name}.part"));
        let size = match self.write_part(reader, &part_path).await {
            Ok(0) => {
                remove_quietly(&part_path).await;
                return Err(StowageError::InvalidInput("file is empty".to_string()));
            }
            Ok(size) => size,
            Err(e) => {
                remove_quietly(&part_path).await;
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&part_path, &path).await {
            remove_quietly(&part_path).await;
            return Err(storage_error("finalize blob", e));
        }

        debug!(blob_name = %blob_name, bytes = size, "Stored blob");
        Ok(StoredBlob { blob_name, size })
    }

    async fn write_part<R>(&self, mut reader: R, part_path: &Path) -> Result<u64>
    where
        R: AsyncRead + Unpin,
    {
        let mut file = fs::File::create(part_path)
            .await
            .map_err(|e| storage_error("create blob", e))?;
        let mut buf = vec![0u8; COPY_BUFFER_SIZE];
        let mut total: u64 = 0;

        loop {
            let n = reader.read(&mut buf).await.map_err(|e| {
                StowageError::InvalidInput(format!("failed to read upload content: {e}"))
            })?;
            if n == 0 {
                break;
            }

            total += n as u64;
            if total > self.max_blob_size {
                return Err(StowageError::TooLarge(self.max_blob_size));
            }

            file.write_all(&buf[..n])
                .await
                .map_err(|e| storage_error("write blob", e))?;
        }

        file.flush().await.map_err(|e| storage_error("write blob", e))?;
        file.sync_all()
            .await
            .map_err(|e| storage_error("sync blob", e))?;

        Ok(total)
    }

    /// Open a blob for streaming.
    pub async fn open(&self, blob_name: &str) -> Result<BlobReader> {
        let path = self.blob_path(blob_name)?;

        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StowageError::NotFound("blob".to_string()));
            }
            Err(e) => return Err(storage_error("open blob", e)),
        };
        let size = file
            .metadata()
            .await
            .map_err(|e| storage_error("read blob metadata", e))?
            .len();

        Ok(BlobReader { file, size })
    }

    /// Delete a blob.
    ///
    /// Returns `true` if the blob was deleted, `false` if it didn't exist.
    pub async fn delete(&self, blob_name: &str) -> Result<bool> {
        let path = self.blob_path(blob_name)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(blob_name = %blob_name, "Deleted blob");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(storage_error("delete blob", e)),
        }
    }

    /// Check if a blob exists.
    pub async fn exists(&self, blob_name: &str) -> Result<bool> {
        let path = self.blob_path(blob_name)?;
        fs::try_exists(&path)
            .await
            .map_err(|e| storage_error("stat blob", e))
    }

    /// Remove empty shard directories.
    ///
    /// Returns the number of directories removed.
    pub async fn cleanup_empty_shards(&self) -> Result<usize> {
        let mut removed = 0;
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| storage_error("list blob root", e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| storage_error("list blob root", e))?
        {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let mut shard = match fs::read_dir(&path).await {
                Ok(shard) => shard,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot read shard directory");
                    continue;
                }
            };
            if matches!(shard.next_entry().await, Ok(None)) && fs::remove_dir(&path).await.is_ok()
            {
                removed += 1;
            }
        }

        Ok(removed)
    }

    /// Get the full path for a blob name.
    ///
    /// The path is constructed as: {root}/{shard}/{blob_name}
    /// where shard is the first 2 characters of the blob name.
    fn blob_path(&self, blob_name: &str) -> Result<PathBuf> {
        validate_blob_name(blob_name)?;
        Ok(self.root.join(&blob_name[..2]).join(blob_name))
    }

    /// Generate a new blob name for the given suggested name.
    ///
    /// The UUID alone makes the name unique; the suffix is only a readable
    /// hint built from the tail of the suggested name.
    pub fn generate_blob_name(suggested_name: &str) -> String {
        let id = Uuid::new_v4().simple().to_string();
        let suffix = sanitize_suffix(suggested_name);
        if suffix.is_empty() {
            id
        } else {
            format!("{id}_{suffix}")
        }
    }
}

fn is_blob_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

/// Keep the last characters of `name` that are safe in a blob name.
fn sanitize_suffix(name: &str) -> String {
    let safe: Vec<char> = name.chars().filter(|c| is_blob_name_char(*c)).collect();
    let start = safe.len().saturating_sub(BLOB_SUFFIX_LENGTH);
    safe[start..].iter().collect()
}

/// Check that a blob name cannot escape the store root.
fn validate_blob_name(blob_name: &str) -> Result<()> {
    let valid = blob_name.len() >= 2
        && blob_name.len() <= MAX_BLOB_NAME_LENGTH
        && !blob_name.starts_with('.')
        && blob_name.chars().all(is_blob_name_char);

    if valid {
        Ok(())
    } else {
        Err(StowageError::InvalidInput(format!(
            "invalid blob name: {blob_name:?}"
        )))
    }
}

fn storage_error(action: &str, e: io::Error) -> StowageError {
    StowageError::Storage(format!("failed to {action}: {e}"))
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove partial blob");
        }
    }
}

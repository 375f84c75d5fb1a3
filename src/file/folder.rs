//! Folder types and repository for Stowage.
//!
//! Every query here is scoped by owner: a folder that exists but belongs to
//! someone else is indistinguishable from one that does not exist.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::{MAX_FOLDER_DEPTH, MAX_NAME_LENGTH};
use crate::db::now_timestamp;
use crate::{Result, StowageError};

const FOLDER_COLUMNS: &str = "id, name, parent_id, owner_id, created_at, updated_at";

/// A folder in an owner's tree.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Folder {
    /// Unique folder ID.
    pub id: i64,
    /// Folder name (unique among its siblings).
    pub name: String,
    /// Parent folder ID (None for top-level folders).
    pub parent_id: Option<i64>,
    /// Owning user ID.
    pub owner_id: i64,
    /// When the folder was created.
    pub created_at: DateTime<Utc>,
    /// When the folder was last modified.
    pub updated_at: DateTime<Utc>,
}

/// A folder together with its parent's name.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FolderView {
    #[sqlx(flatten)]
    pub folder: Folder,
    pub parent_name: Option<String>,
}

/// Data for creating a new folder.
#[derive(Debug, Clone)]
pub struct NewFolder {
    /// Folder name.
    pub name: String,
    /// Parent folder ID (None for top-level folders).
    pub parent_id: Option<i64>,
}

impl NewFolder {
    /// Create a new top-level folder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_id: None,
        }
    }

    /// Set the parent folder.
    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Validate a folder name and return it trimmed.
pub fn validate_folder_name(name: &str) -> Result<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(StowageError::InvalidInput(
            "folder name must not be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(StowageError::InvalidInput(format!(
            "folder name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    if name == "." || name == ".." {
        return Err(StowageError::InvalidInput(
            "folder name must not be '.' or '..'".to_string(),
        ));
    }
    if name.chars().any(|c| c == '/' || c == '\\' || c.is_control()) {
        return Err(StowageError::InvalidInput(
            "folder name contains invalid characters".to_string(),
        ));
    }

    Ok(name.to_string())
}

/// Repository for folder operations.
pub struct FolderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FolderRepository<'a> {
    /// Create a new FolderRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new folder for `owner_id`.
    ///
    /// The parent check, the depth check and the insert are one statement,
    /// and the unique index on `(owner_id, parent, name)` decides between
    /// concurrent creates of the same name. Fails with `NotFound` if the
    /// parent is not owned by `owner_id`, `InvalidInput` if the parent is
    /// already `MAX_FOLDER_DEPTH` levels deep and `Conflict` if a sibling has
    /// the same name.
    pub async fn create(&self, owner_id: i64, folder: &NewFolder) -> Result<Folder> {
        let now = now_timestamp();
        let max_depth = MAX_FOLDER_DEPTH as i64;
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "WITH RECURSIVE chain(id, parent_id, depth) AS (
                 SELECT id, parent_id, 1 FROM folders WHERE id = ? AND owner_id = ?
                 UNION ALL
                 SELECT f.id, f.parent_id, c.depth + 1
                 FROM folders f JOIN chain c ON f.id = c.parent_id
                 WHERE c.depth <= ?
             )
             INSERT INTO folders (name, parent_id, owner_id, created_at, updated_at)
             SELECT ?, ?, ?, ?, ?
             WHERE ? IS NULL
                OR (SELECT MAX(depth) FROM chain) < ?",
        )
        .bind(folder.parent_id)
        .bind(owner_id)
        .bind(max_depth)
        .bind(&folder.name)
        .bind(folder.parent_id)
        .bind(owner_id)
        .bind(&now)
        .bind(&now)
        .bind(folder.parent_id)
        .bind(max_depth)
        .execute(&mut *tx)
        .await
        .map_err(|e| match StowageError::from(e) {
            StowageError::Conflict(_) => StowageError::Conflict(
                "folder with this name already exists in this location".to_string(),
            ),
            other => other,
        })?;

        if result.rows_affected() == 0 {
            let parent_exists: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM folders WHERE id = ? AND owner_id = ?)",
            )
            .bind(folder.parent_id)
            .bind(owner_id)
            .fetch_one(&mut *tx)
            .await?;

            return Err(if parent_exists {
                StowageError::InvalidInput(format!(
                    "folders cannot be nested more than {MAX_FOLDER_DEPTH} levels deep"
                ))
            } else {
                StowageError::NotFound("parent folder".to_string())
            });
        }

        let sql = format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE id = ?");
        let created = sqlx::query_as::<_, Folder>(&sql)
            .bind(result.last_insert_rowid())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    /// Get a folder by ID, scoped to its owner.
    pub async fn get(&self, id: i64, owner_id: i64) -> Result<Option<Folder>> {
        let sql = format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE id = ? AND owner_id = ?");
        let folder = sqlx::query_as::<_, Folder>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(self.pool)
            .await?;

        Ok(folder)
    }

    /// Get a folder with its parent's name, scoped to its owner.
    pub async fn get_view(&self, id: i64, owner_id: i64) -> Result<Option<FolderView>> {
        let view = sqlx::query_as::<_, FolderView>(
            "SELECT f.id, f.name, f.parent_id, f.owner_id, f.created_at, f.updated_at,
                    p.name AS parent_name
             FROM folders f
             LEFT JOIN folders p ON p.id = f.parent_id
             WHERE f.id = ? AND f.owner_id = ?",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(view)
    }

    /// List the direct children of `parent_id` (top-level folders when None).
    ///
    /// Ordered by name, then id. Does not check that the parent exists.
    pub async fn list_children(&self, owner_id: i64, parent_id: Option<i64>) -> Result<Vec<Folder>> {
        let sql = format!(
            "SELECT {FOLDER_COLUMNS} FROM folders
             WHERE owner_id = ? AND parent_id IS ?
             ORDER BY name, id"
        );
        let folders = sqlx::query_as::<_, Folder>(&sql)
            .bind(owner_id)
            .bind(parent_id)
            .fetch_all(self.pool)
            .await?;

        Ok(folders)
    }

    /// Delete an empty folder.
    ///
    /// The emptiness check is part of the DELETE itself. Fails with
    /// `NotFound` if the folder is not owned by `owner_id` and `Conflict`
    /// if it still has child folders or files.
    pub async fn delete(&self, id: i64, owner_id: i64) -> Result<()> {
        let result = sqlx::query(
            "DELETE FROM folders
             WHERE id = ? AND owner_id = ?
               AND NOT EXISTS (SELECT 1 FROM folders WHERE parent_id = ?)
               AND NOT EXISTS (SELECT 1 FROM file_metadata WHERE folder_id = ?)",
        )
        .bind(id)
        .bind(owner_id)
        .bind(id)
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(|e| match StowageError::from(e) {
            StowageError::Conflict(_) => StowageError::Conflict("folder is not empty".to_string()),
            other => other,
        })?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        match self.get(id, owner_id).await? {
            Some(_) => Err(StowageError::Conflict("folder is not empty".to_string())),
            None => Err(StowageError::NotFound("folder".to_string())),
        }
    }

    /// Get the path from the top level down to the folder itself.
    pub async fn breadcrumb(&self, id: i64, owner_id: i64) -> Result<Vec<Folder>> {
        let mut path = Vec::new();
        let mut next = Some(id);

        while let Some(current) = next {
            if path.len() >= MAX_FOLDER_DEPTH {
                return Err(StowageError::Database(format!(
                    "folder {id} is nested deeper than {MAX_FOLDER_DEPTH} levels"
                )));
            }
            let folder = self
                .get(current, owner_id)
                .await?
                .ok_or_else(|| StowageError::NotFound("folder".to_string()))?;
            next = folder.parent_id;
            path.push(folder);
        }

        path.reverse();
        Ok(path)
    }

    /// Count folders owned by a user.
    pub async fn count(&self, owner_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM folders WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, NewUser, UserRepository};

    async fn setup() -> (Database, i64, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let users = UserRepository::new(db.pool());
        let alice = users
            .create(&NewUser::new("alice@example.com", "hash"))
            .await
            .unwrap();
        let bob = users
            .create(&NewUser::new("bob@example.com", "hash"))
            .await
            .unwrap();
        (db, alice.id, bob.id)
    }

    #[test]
    fn test_validate_folder_name() {
        assert_eq!(validate_folder_name("  Docs  ").unwrap(), "Docs");
        assert_eq!(validate_folder_name("写真 2024").unwrap(), "写真 2024");

        for bad in ["", "   ", ".", "..", "a/b", "a\\b", "tab\there"] {
            assert!(
                matches!(validate_folder_name(bad), Err(StowageError::InvalidInput(_))),
                "{bad:?} should be rejected"
            );
        }

        assert!(validate_folder_name(&"x".repeat(MAX_NAME_LENGTH)).is_ok());
        assert!(validate_folder_name(&"x".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[tokio::test]
    async fn test_create_top_level() {
        let (db, alice, _) = setup().await;
        let repo = FolderRepository::new(db.pool());

        let folder = repo.create(alice, &NewFolder::new("Docs")).await.unwrap();

        assert!(folder.id > 0);
        assert_eq!(folder.name, "Docs");
        assert_eq!(folder.parent_id, None);
        assert_eq!(folder.owner_id, alice);
        assert_eq!(folder.created_at, folder.updated_at);
    }

    #[tokio::test]
    async fn test_create_duplicate_top_level_conflicts() {
        let (db, alice, bob) = setup().await;
        let repo = FolderRepository::new(db.pool());

        repo.create(alice, &NewFolder::new("Docs")).await.unwrap();
        let result = repo.create(alice, &NewFolder::new("Docs")).await;
        assert!(matches!(result, Err(StowageError::Conflict(_))));

        // Another owner may use the same name
        assert!(repo.create(bob, &NewFolder::new("Docs")).await.is_ok());
    }

    #[tokio::test]
    async fn test_same_name_under_different_parents() {
        let (db, alice, _) = setup().await;
        let repo = FolderRepository::new(db.pool());

        let a = repo.create(alice, &NewFolder::new("A")).await.unwrap();
        let b = repo.create(alice, &NewFolder::new("B")).await.unwrap();

        repo.create(alice, &NewFolder::new("Shared").with_parent(a.id))
            .await
            .unwrap();
        repo.create(alice, &NewFolder::new("Shared").with_parent(b.id))
            .await
            .unwrap();
        // Top-level "Shared" does not clash with the nested ones
        repo.create(alice, &NewFolder::new("Shared")).await.unwrap();

        let result = repo
            .create(alice, &NewFolder::new("Shared").with_parent(a.id))
            .await;
        assert!(matches!(result, Err(StowageError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_create_with_foreign_parent_not_found() {
        let (db, alice, bob) = setup().await;
        let repo = FolderRepository::new(db.pool());

        let alices = repo.create(alice, &NewFolder::new("Private")).await.unwrap();

        let result = repo
            .create(bob, &NewFolder::new("Sneaky").with_parent(alices.id))
            .await;
        assert!(matches!(result, Err(StowageError::NotFound(_))));

        let result = repo
            .create(alice, &NewFolder::new("Orphan").with_parent(9999))
            .await;
        assert!(matches!(result, Err(StowageError::NotFound(_))));
        assert_eq!(repo.count(bob).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_is_owner_scoped() {
        let (db, alice, bob) = setup().await;
        let repo = FolderRepository::new(db.pool());

        let folder = repo.create(alice, &NewFolder::new("Docs")).await.unwrap();

        assert_eq!(repo.get(folder.id, alice).await.unwrap(), Some(folder.clone()));
        assert!(repo.get(folder.id, bob).await.unwrap().is_none());
        assert!(repo.get_view(folder.id, bob).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_view_includes_parent_name() {
        let (db, alice, _) = setup().await;
        let repo = FolderRepository::new(db.pool());

        let parent = repo.create(alice, &NewFolder::new("Parent")).await.unwrap();
        let child = repo
            .create(alice, &NewFolder::new("Child").with_parent(parent.id))
            .await
            .unwrap();

        let view = repo.get_view(child.id, alice).await.unwrap().unwrap();
        assert_eq!(view.folder, child);
        assert_eq!(view.parent_name.as_deref(), Some("Parent"));

        let view = repo.get_view(parent.id, alice).await.unwrap().unwrap();
        assert!(view.parent_name.is_none());
    }

    #[tokio::test]
    async fn test_list_children() {
        let (db, alice, bob) = setup().await;
        let repo = FolderRepository::new(db.pool());

        let b = repo.create(alice, &NewFolder::new("beta")).await.unwrap();
        repo.create(alice, &NewFolder::new("alpha")).await.unwrap();
        repo.create(alice, &NewFolder::new("inner").with_parent(b.id))
            .await
            .unwrap();
        repo.create(bob, &NewFolder::new("bobs")).await.unwrap();

        let top: Vec<String> = repo
            .list_children(alice, None)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(top, vec!["alpha", "beta"]);

        let inner = repo.list_children(alice, Some(b.id)).await.unwrap();
        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].name, "inner");

        assert!(repo.list_children(bob, Some(b.id)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_empty_folder() {
        let (db, alice, _) = setup().await;
        let repo = FolderRepository::new(db.pool());

        let folder = repo.create(alice, &NewFolder::new("Tmp")).await.unwrap();
        repo.delete(folder.id, alice).await.unwrap();

        assert!(repo.get(folder.id, alice).await.unwrap().is_none());
        // The name is free again
        assert!(repo.create(alice, &NewFolder::new("Tmp")).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_non_empty_folder_conflicts() {
        let (db, alice, _) = setup().await;
        let repo = FolderRepository::new(db.pool());

        let parent = repo.create(alice, &NewFolder::new("Parent")).await.unwrap();
        let child = repo
            .create(alice, &NewFolder::new("Child").with_parent(parent.id))
            .await
            .unwrap();

        match repo.delete(parent.id, alice).await {
            Err(StowageError::Conflict(msg)) => assert_eq!(msg, "folder is not empty"),
            other => panic!("expected Conflict, got {other:?}"),
        }

        repo.delete(child.id, alice).await.unwrap();
        repo.delete(parent.id, alice).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_other_owners_folder_not_found() {
        let (db, alice, bob) = setup().await;
        let repo = FolderRepository::new(db.pool());

        let folder = repo.create(alice, &NewFolder::new("Docs")).await.unwrap();

        let result = repo.delete(folder.id, bob).await;
        assert!(matches!(result, Err(StowageError::NotFound(_))));
        assert!(repo.get(folder.id, alice).await.unwrap().is_some());

        let result = repo.delete(4242, alice).await;
        assert!(matches!(result, Err(StowageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_breadcrumb() {
        let (db, alice, bob) = setup().await;
        let repo = FolderRepository::new(db.pool());

        let a = repo.create(alice, &NewFolder::new("a")).await.unwrap();
        let b = repo
            .create(alice, &NewFolder::new("b").with_parent(a.id))
            .await
            .unwrap();
        let c = repo
            .create(alice, &NewFolder::new("c").with_parent(b.id))
            .await
            .unwrap();

        let names: Vec<String> = repo
            .breadcrumb(c.id, alice)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        assert_eq!(repo.breadcrumb(a.id, alice).await.unwrap().len(), 1);
        assert!(matches!(
            repo.breadcrumb(c.id, bob).await,
            Err(StowageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_nesting_depth_is_limited() {
        let (db, alice, _) = setup().await;
        let repo = FolderRepository::new(db.pool());

        let mut parent = repo.create(alice, &NewFolder::new("level1")).await.unwrap();
        for level in 2..=MAX_FOLDER_DEPTH {
            parent = repo
                .create(
                    alice,
                    &NewFolder::new(format!("level{level}")).with_parent(parent.id),
                )
                .await
                .unwrap();
        }

        let path = repo.breadcrumb(parent.id, alice).await.unwrap();
        assert_eq!(path.len(), MAX_FOLDER_DEPTH);
        assert_eq!(path[0].name, "level1");

        let result = repo
            .create(alice, &NewFolder::new("too-deep").with_parent(parent.id))
            .await;
        assert!(matches!(result, Err(StowageError::InvalidInput(_))));
        assert_eq!(repo.count(alice).await.unwrap(), MAX_FOLDER_DEPTH as i64);

        // A sibling at the deepest allowed level is still fine
        let grandparent = path[MAX_FOLDER_DEPTH - 2].id;
        assert!(repo
            .create(alice, &NewFolder::new("sibling").with_parent(grandparent))
            .await
            .is_ok());
    }
}

//! User repository for Stowage.
//!
//! This module provides the identity store's queries.

use sqlx::SqlitePool;

use super::now_timestamp;
use super::user::{NewUser, User};
use crate::{Result, StowageError};

const USER_COLUMNS: &str = "id, email, password, role, created_at";

/// Repository for user operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user in the database.
    ///
    /// Returns the created user with the assigned ID. A duplicate email
    /// (case-insensitive) fails with `Conflict`.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let result =
            sqlx::query("INSERT INTO users (email, password, role, created_at) VALUES (?, ?, ?, ?)")
                .bind(&new_user.email)
                .bind(&new_user.password)
                .bind(new_user.role.as_str())
                .bind(now_timestamp())
                .execute(self.pool)
                .await
                .map_err(|e| match StowageError::from(e) {
                    StowageError::Conflict(_) => {
                        StowageError::Conflict("email already registered".to_string())
                    }
                    other => other,
                })?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| StowageError::NotFound("user".to_string()))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(user)
    }

    /// Get a user by email (case-insensitive).
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ? COLLATE NOCASE");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(self.pool)
            .await?;

        Ok(user)
    }

    /// Check if an email is already registered (case-insensitive).
    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? COLLATE NOCASE)",
        )
        .bind(email)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Count all users.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, Role};

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_create_user() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        let user = repo
            .create(&NewUser::new("alice@example.com", "hash"))
            .await
            .unwrap();

        assert!(user.id > 0);
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.password, "hash");
        assert_eq!(user.role, Role::User);
    }

    #[tokio::test]
    async fn test_create_admin() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        let user = repo
            .create(&NewUser::new("root@example.com", "hash").with_role(Role::Admin))
            .await
            .unwrap();

        assert!(user.is_admin());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        repo.create(&NewUser::new("bob@example.com", "hash"))
            .await
            .unwrap();
        let result = repo.create(&NewUser::new("BOB@example.com", "hash")).await;

        match result {
            Err(StowageError::Conflict(msg)) => assert_eq!(msg, "email already registered"),
            other => panic!("expected Conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_by_email_case_insensitive() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        let created = repo
            .create(&NewUser::new("Carol@Example.com", "hash"))
            .await
            .unwrap();

        let found = repo.get_by_email("carol@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(repo.get_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_by_id_missing() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_email_exists_and_count() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        assert!(!repo.email_exists("dave@example.com").await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 0);

        repo.create(&NewUser::new("dave@example.com", "hash"))
            .await
            .unwrap();

        assert!(repo.email_exists("DAVE@example.com").await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}

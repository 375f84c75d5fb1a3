//! Account registration and login for Stowage.

use tracing::{debug, info};

use crate::auth::password::{hash_password, validate_password, verify_password};
use crate::auth::validation::validate_email;
use crate::db::{Database, NewUser, Role, User, UserRepository};
use crate::{Result, StowageError};

/// Registration request data.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    /// Login email.
    pub email: String,
    /// Password (8-128 characters).
    pub password: String,
}

impl RegistrationRequest {
    /// Create a new registration request.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Register a new user with the default role.
///
/// This function:
/// 1. Validates the email and password
/// 2. Checks if the email is already registered
/// 3. Hashes the password
/// 4. Creates the user in the database
///
/// A duplicate email fails with `Conflict`, even when two registrations
/// race past step 2.
pub async fn register(db: &Database, request: RegistrationRequest) -> Result<User> {
    register_with_role(db, request, Role::User).await
}

/// Register a new user with a specific role.
pub async fn register_with_role(
    db: &Database,
    request: RegistrationRequest,
    role: Role,
) -> Result<User> {
    let email = request.email.trim().to_string();
    validate_email(&email)?;
    validate_password(&request.password)?;

    let repo = UserRepository::new(db.pool());
    if repo.email_exists(&email).await? {
        return Err(StowageError::Conflict("email already registered".to_string()));
    }

    let password = request.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| StowageError::Auth(format!("password hashing task failed: {e}")))??;

    let user = repo
        .create(&NewUser::new(email, password_hash).with_role(role))
        .await?;

    info!(user_id = user.id, role = %user.role, "New user registered");

    Ok(user)
}

/// Check an email and password pair.
///
/// Unknown email and wrong password fail the same way.
pub async fn login(db: &Database, email: &str, password: &str) -> Result<User> {
    let invalid = || StowageError::Auth("invalid credentials".to_string());

    let user = UserRepository::new(db.pool())
        .get_by_email(email.trim())
        .await?
        .ok_or_else(invalid)?;

    let password = password.to_string();
    let hash = user.password.clone();
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| StowageError::Auth(format!("password check task failed: {e}")))?
        .map_err(|e| {
            debug!(user_id = user.id, error = %e, "Password check failed");
            invalid()
        })?;

    info!(user_id = user.id, "User logged in");
    Ok(user)
}

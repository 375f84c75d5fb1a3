//! API handlers and their shared state.

pub mod auth;
pub mod file;
pub mod folder;

use jsonwebtoken::{encode, EncodingKey, Header};

use crate::config::Config;
use crate::db::{Database, User, UserRepository};
use crate::file::{BlobStore, PageRequest};
use crate::web::error::ApiError;
use crate::web::middleware::JwtClaims;

pub use auth::*;
pub use file::*;
pub use folder::*;

/// Application state shared across handlers.
pub struct AppState {
    /// Database pool.
    pub db: Database,
    /// Blob store for file content.
    pub storage: BlobStore,
    /// JWT encoding key.
    pub encoding_key: EncodingKey,
    /// Access token expiry in seconds.
    pub access_token_expiry: u64,
    /// Page size used when a request does not send one.
    pub default_page_size: u32,
    /// Largest page size a request may ask for.
    pub max_page_size: u32,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: Database, storage: BlobStore, config: &Config) -> Self {
        Self {
            db,
            storage,
            encoding_key: EncodingKey::from_secret(config.auth.jwt_secret.as_bytes()),
            access_token_expiry: config.auth.access_token_expiry_secs,
            default_page_size: config.listing.default_page_size,
            max_page_size: config.listing.max_page_size,
        }
    }

    /// Generate an access token for a user.
    pub fn generate_access_token(&self, user: &User) -> Result<String, ApiError> {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = JwtClaims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role.to_string(),
            iat: now,
            exp: now + self.access_token_expiry,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!(error = %e, "Failed to encode JWT");
            ApiError::internal("Failed to generate token")
        })
    }

    /// Load the user a token was issued to.
    ///
    /// A token for a user that no longer exists is rejected.
    pub async fn current_user(&self, claims: &JwtClaims) -> Result<User, ApiError> {
        UserRepository::new(self.db.pool())
            .get_by_id(claims.sub)
            .await?
            .ok_or_else(|| ApiError::unauthorized("User no longer exists"))
    }

    /// Build a page request from optional query values.
    pub fn page_request(&self, page: Option<u32>, size: Option<u32>) -> Result<PageRequest, ApiError> {
        let size = size.unwrap_or(self.default_page_size);
        Ok(PageRequest::new(page.unwrap_or(0), size, self.max_page_size)?)
    }
}

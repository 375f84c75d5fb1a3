//! HTTP API for Stowage.
//!
//! Every route under `/api` except registration and login needs a bearer
//! token, and every folder or file operation is scoped to the token's user.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::{create_health_router, create_router, create_swagger_router, ApiDoc};
pub use server::WebServer;

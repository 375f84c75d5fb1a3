//! Router configuration for the HTTP API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use super::dto::{
    AuthResponse, CreateFolderRequest, FileResponse, FolderResponse, LoginRequest,
    PaginationMeta, RegisterRequest, StatsResponse, UploadForm, UploadResponse, UserInfo,
};
use super::error::{ErrorBody, ErrorCode, ErrorDetail};
use super::handlers::{self, AppState};
use super::middleware::{create_cors_layer, jwt_auth, JwtState};

/// Room for multipart boundaries and the `name` part on top of the file.
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// OpenAPI document for the API.
#[derive(OpenApi)]
#[openapi(
    info(title = "Stowage API", description = "Per-owner folders and file storage"),
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::me,
        handlers::folder::create_folder,
        handlers::folder::list_folders,
        handlers::folder::get_folder,
        handlers::folder::get_folder_path,
        handlers::folder::delete_folder,
        handlers::file::upload_file,
        handlers::file::list_files,
        handlers::file::search_files,
        handlers::file::file_stats,
        handlers::file::get_file,
        handlers::file::download_file,
        handlers::file::delete_file,
    ),
    components(schemas(
        RegisterRequest,
        LoginRequest,
        AuthResponse,
        UserInfo,
        CreateFolderRequest,
        UploadForm,
        FolderResponse,
        FileResponse,
        UploadResponse,
        StatsResponse,
        PaginationMeta,
        ErrorBody,
        ErrorDetail,
        ErrorCode,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Registration and login"),
        (name = "folders", description = "Folder tree"),
        (name = "files", description = "File upload, listing and download")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the main API router.
pub fn create_router(
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    cors_origins: &[String],
) -> Router {
    let body_limit = app_state.storage.max_blob_size() as usize + MULTIPART_OVERHEAD_BYTES;

    let auth_routes = Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/me", get(handlers::me));

    let folder_routes = Router::new()
        .route(
            "/",
            get(handlers::list_folders).post(handlers::create_folder),
        )
        .route(
            "/:id",
            get(handlers::get_folder).delete(handlers::delete_folder),
        )
        .route("/:id/path", get(handlers::get_folder_path));

    let file_routes = Router::new()
        .route("/", get(handlers::list_files))
        .route(
            "/upload",
            post(handlers::upload_file).layer(DefaultBodyLimit::disable()),
        )
        .route("/search", get(handlers::search_files))
        .route("/stats", get(handlers::file_stats))
        .route(
            "/:id",
            get(handlers::get_file).delete(handlers::delete_file),
        )
        .route("/:id/download", get(handlers::download_file));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/folders", folder_routes)
        .nest("/files", file_routes);

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(move |req, next| {
                    jwt_auth(jwt_state.clone(), req, next)
                }))
                .layer(RequestBodyLimitLayer::new(body_limit)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

async fn health_check() -> &'static str {
    "OK"
}

/// Serve the OpenAPI document and Swagger UI.
pub fn create_swagger_router() -> Router {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_value(&doc).unwrap();

        assert!(json["paths"].get("/api/files/upload").is_some());
        assert!(json["paths"].get("/api/folders/{id}/path").is_some());
        assert!(json["components"]["securitySchemes"]
            .get("bearer_auth")
            .is_some());
    }
}

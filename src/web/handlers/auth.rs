//! Authentication handlers.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::auth::{self, RegistrationRequest};
use crate::db::User;
use crate::web::dto::{ApiResponse, AuthResponse, LoginRequest, RegisterRequest, UserInfo, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;

use super::AppState;

fn auth_response(state: &AppState, user: User) -> Result<AuthResponse, ApiError> {
    let access_token = state.generate_access_token(&user)?;
    Ok(AuthResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.access_token_expiry,
        user: UserInfo::from(user),
    })
}

/// POST /api/auth/register - Create an account and log in.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid email or password"),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), ApiError> {
    let user = auth::register(&state.db, RegistrationRequest::new(req.email, req.password)).await?;
    let response = auth_response(&state, user)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(response))))
}

/// POST /api/auth/login - Log in with email and password.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, ApiError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let user = auth::login(&state.db, &req.email, &req.password).await?;
    Ok(Json(ApiResponse::new(auth_response(&state, user)?)))
}

/// GET /api/auth/me - Current user.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserInfo),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let user = state.current_user(&claims).await?;
    Ok(Json(ApiResponse::new(UserInfo::from(user))))
}

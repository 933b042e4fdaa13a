//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for registration, login and password changes.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storefront_core::domain::{Registration, User, UserId};
use utoipa::ToSchema;

use crate::web::{
    error::{ApiJson, HttpError},
    state::AppState,
};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema, Default)]
#[serde(default)]
pub struct RegisterRequest {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct RegisterResponse {
    pub msg: String,
    pub user_id: i32,
}

/// `username` accepts either the username or the email address, and may also
/// be sent as `username_or_email`.
#[derive(Deserialize, ToSchema, Default)]
#[serde(default)]
pub struct LoginRequest {
    #[serde(alias = "username_or_email")]
    pub username: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginUser {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
}

impl From<User> for LoginUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id.0,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub msg: String,
    pub access_token: String,
    pub user: LoginUser,
}

#[derive(Deserialize, ToSchema, Default)]
#[serde(default)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// A response carrying only a human-readable message.
#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub msg: String,
}

impl MessageResponse {
    pub fn new(msg: impl Into<String>) -> Json<Self> {
        Json(Self { msg: msg.into() })
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = RegisterResponse),
        (status = 400, description = "Missing field, or username/email already taken", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let user = state
        .auth
        .register(Registration {
            full_name: req.full_name,
            username: req.username,
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            msg: "Registered successfully".to_string(),
            user_id: user.id.0,
        }),
    ))
}

/// POST /auth/login - Login with a username or email
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Username and password are required", body = MessageResponse),
        (status = 401, description = "Invalid credentials", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, HttpError> {
    let session = state.auth.login(&req.username, &req.password).await?;

    Ok(Json(LoginResponse {
        msg: "Login successful".to_string(),
        access_token: session.token.token,
        user: session.user.into(),
    }))
}

/// POST /auth/change-password - Replace the caller's password
#[utoipa::path(
    post,
    path = "/auth/change-password",
    tag = "auth",
    request_body = ChangePasswordRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Missing or unchanged password", body = MessageResponse),
        (status = 401, description = "Bad token or wrong current password", body = MessageResponse),
        (status = 404, description = "User not found", body = MessageResponse)
    )
)]
pub async fn change_password_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, HttpError> {
    state
        .auth
        .change_password(user_id, &req.current_password, &req.new_password)
        .await?;

    Ok(MessageResponse::new("Password changed successfully"))
}

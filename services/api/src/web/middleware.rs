//! services/api/src/web/middleware.rs
//!
//! Bearer-token middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use storefront_core::domain::UserId;

use crate::web::{error::HttpError, state::AppState};

/// The caller of a route where signing in is optional.
#[derive(Debug, Clone, Copy)]
pub struct MaybeUser(pub Option<UserId>);

/// The token part of an `Authorization` header.
///
/// A header without the `Bearer ` scheme is passed through whole so that it
/// fails verification as an invalid token rather than a missing one.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    Some(value.strip_prefix("Bearer ").unwrap_or(value))
}

/// Middleware that validates the bearer token and extracts the user id.
///
/// If valid, inserts the `UserId` into request extensions for handlers to use.
/// If invalid or missing, returns 401 with the reason.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, HttpError> {
    let user_id = state.auth.authenticate(bearer_token(req.headers()))?;
    req.extensions_mut().insert(user_id);
    Ok(next.run(req).await)
}

/// Like `require_auth`, but lets requests without an `Authorization` header
/// through as anonymous. A header that is present must still be valid.
pub async fn optional_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, HttpError> {
    let user = match bearer_token(req.headers()) {
        None => None,
        Some(token) => Some(state.auth.authenticate(Some(token))?),
    };
    req.extensions_mut().insert(MaybeUser(user));
    Ok(next.run(req).await)
}

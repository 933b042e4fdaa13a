//! services/api/src/web/error.rs
//!
//! Maps component errors to HTTP status codes and `{"msg": ...}` bodies, and
//! provides the JSON extractor whose rejections use the same shape.

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use storefront_core::{AccountError, AuthError, CheckoutError, PortError, WishlistError};
use tracing::error;

const SERVER_ERROR: &str = "Server error";

/// An error answered to the client as `{"msg": ...}` with `status`.
#[derive(Debug)]
pub struct HttpError {
    pub status: StatusCode,
    pub msg: String,
}

impl HttpError {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            msg: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    /// Logs the storage failure and hides its details from the client.
    fn storage(error: &PortError) -> Self {
        error!("Storage failure: {}", error);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "msg": self.msg }))).into_response()
    }
}

impl From<PortError> for HttpError {
    fn from(error: PortError) -> Self {
        Self::storage(&error)
    }
}

impl From<AuthError> for HttpError {
    fn from(error: AuthError) -> Self {
        let status = match &error {
            AuthError::Storage(e) => return Self::storage(e),
            AuthError::MissingField(_)
            | AuthError::MissingLogin
            | AuthError::MissingPasswords
            | AuthError::UsernameTaken
            | AuthError::EmailTaken
            | AuthError::SameAsCurrentPassword => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials
            | AuthError::TokenMissing
            | AuthError::TokenExpired
            | AuthError::TokenInvalid
            | AuthError::WrongCurrentPassword => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
        };
        Self::new(status, error.to_string())
    }
}

impl From<CheckoutError> for HttpError {
    fn from(error: CheckoutError) -> Self {
        let status = match &error {
            CheckoutError::Storage(e) => return Self::storage(e),
            CheckoutError::ProductNotFound(_) | CheckoutError::UserNotFound => StatusCode::NOT_FOUND,
            CheckoutError::EmptyCart
            | CheckoutError::MissingField(_)
            | CheckoutError::InvalidQuantity(_)
            | CheckoutError::InvalidAmount(_)
            | CheckoutError::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
        };
        Self::new(status, error.to_string())
    }
}

impl From<WishlistError> for HttpError {
    fn from(error: WishlistError) -> Self {
        let status = match &error {
            WishlistError::Storage(e) => return Self::storage(e),
            WishlistError::AlreadyExists => StatusCode::BAD_REQUEST,
            WishlistError::NotFound
            | WishlistError::ProductNotFound
            | WishlistError::UserNotFound => StatusCode::NOT_FOUND,
        };
        Self::new(status, error.to_string())
    }
}

impl From<AccountError> for HttpError {
    fn from(error: AccountError) -> Self {
        let status = match &error {
            AccountError::Storage(e) => return Self::storage(e),
            AccountError::UserNotFound => StatusCode::NOT_FOUND,
            AccountError::EmailTaken | AccountError::UsernameTaken => StatusCode::BAD_REQUEST,
        };
        Self::new(status, error.to_string())
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(format!("Invalid request body: {}", rejection.body_text()))
    }
}

/// `axum::Json` with malformed bodies answered as 400 `{"msg": ...}`.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(HttpError))]
pub struct ApiJson<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_errors_are_unauthorized_with_their_message() {
        let err = HttpError::from(AuthError::TokenExpired);

        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.msg, "Token has expired. Please log in again.");
    }

    #[test]
    fn storage_details_are_not_leaked() {
        let err = HttpError::from(CheckoutError::Storage(PortError::Unexpected(
            "connection reset by peer".into(),
        )));

        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.msg, "Server error");
    }

    #[test]
    fn checkout_errors_map_to_client_statuses() {
        assert_eq!(
            HttpError::from(CheckoutError::ProductNotFound(9)).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            HttpError::from(CheckoutError::InsufficientStock {
                product_id: 9,
                available: 1,
                requested: 2
            })
            .status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HttpError::from(CheckoutError::MissingField("city")).msg,
            "city is required"
        );
    }

    #[test]
    fn forbidden_is_403() {
        assert_eq!(
            HttpError::from(AuthError::Forbidden).status,
            StatusCode::FORBIDDEN
        );
    }
}

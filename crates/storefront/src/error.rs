//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Error bodies are JSON objects with a single `message` field.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::addresses::AddressError;
use crate::services::auth::AuthError;
use crate::services::catalog::CatalogError;
use crate::services::orders::OrderError;
use crate::services::payments::PaymentError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::MissingToken | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
                AuthError::AdminOnly => StatusCode::FORBIDDEN,
                AuthError::Signing(_)
                | AuthError::Mail(_)
                | AuthError::Repository(_)
                | AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Order(err) => match err {
                OrderError::NotFound => StatusCode::NOT_FOUND,
                OrderError::Forbidden => StatusCode::FORBIDDEN,
                OrderError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Address(err) => match err {
                AddressError::NotFound | AddressError::UserNotFound => StatusCode::NOT_FOUND,
                AddressError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Catalog(err) => match err {
                CatalogError::NotFound => StatusCode::NOT_FOUND,
                CatalogError::Upload(_) | CatalogError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Payment(err) => match err {
                PaymentError::OrderNotFound => StatusCode::NOT_FOUND,
                PaymentError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Message safe to show the caller.
    fn public_message(&self) -> String {
        match self {
            Self::Auth(AuthError::InvalidEmail(_)) => "Invalid email address".to_string(),
            Self::Auth(err) => err.to_string(),
            Self::Order(err) => err.to_string(),
            Self::Address(err) => err.to_string(),
            Self::Catalog(err) => err.to_string(),
            Self::Payment(err) => err.to_string(),
            Self::Database(_) => "Not found".to_string(),
            Self::NotFound(msg) | Self::Forbidden(msg) | Self::BadRequest(msg) => msg.clone(),
            Self::RateLimited => "Too many requests, please slow down".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        let message = if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
            // Don't expose internal error details to clients
            "Internal server error".to_string()
        } else {
            self.public_message()
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoi_core::OrderStatus;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_domain_error_status_codes() {
        assert_eq!(
            get_status(AuthError::InvalidToken.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(get_status(AuthError::AdminOnly.into()), StatusCode::FORBIDDEN);
        assert_eq!(get_status(AuthError::EmailTaken.into()), StatusCode::BAD_REQUEST);
        assert_eq!(get_status(OrderError::Forbidden.into()), StatusCode::FORBIDDEN);
        assert_eq!(get_status(OrderError::NotFound.into()), StatusCode::NOT_FOUND);
        assert_eq!(
            get_status(OrderError::NotCancellable(OrderStatus::Shipped).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(get_status(AddressError::Duplicate.into()), StatusCode::BAD_REQUEST);
        assert_eq!(get_status(AddressError::NotFound.into()), StatusCode::NOT_FOUND);
        assert_eq!(get_status(CatalogError::SlugTaken.into()), StatusCode::BAD_REQUEST);
        assert_eq!(
            get_status(PaymentError::OrderNotFound.into()),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_public_messages() {
        assert_eq!(
            AppError::from(AddressError::Duplicate).public_message(),
            "This address already exists in your account."
        );
        assert_eq!(
            AppError::from(OrderError::NotCancellable(OrderStatus::OutForDelivery)).public_message(),
            "Order cannot be cancelled once it is OUT FOR DELIVERY"
        );
    }
}

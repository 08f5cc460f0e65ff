//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Responses carry a JSON body `{"error": "<message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use rounds_core::tokens::TokenError;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::orders::OrderError;
use crate::services::scope::ScopeError;
use crate::services::storage::StorageError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Shop scope could not be resolved.
    #[error("Scope error: {0}")]
    Scope(#[from] ScopeError),

    /// Order request broke a placement rule.
    #[error("Order rejected: {0}")]
    Order(#[from] OrderError),

    /// Upload could not be stored.
    #[error("Upload error: {0}")]
    Storage(#[from] StorageError),

    /// Session store failure.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but may not do this.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Duplicate of something that must be unique.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

const INTERNAL: &str = "Internal server error";

fn repository_response(err: &RepositoryError) -> (StatusCode, String) {
    match err {
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_owned()),
        RepositoryError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_owned())
        }
    }
}

fn token_response(err: TokenError) -> (StatusCode, String) {
    match err {
        TokenError::InvalidToken => (StatusCode::BAD_REQUEST, "Invalid or used link".to_owned()),
        TokenError::TokenExpired => (StatusCode::GONE, "This link has expired".to_owned()),
    }
}

fn auth_response(err: &AuthError) -> (StatusCode, String) {
    match err {
        AuthError::InvalidEmail(_) => (StatusCode::BAD_REQUEST, "Invalid email address".to_owned()),
        AuthError::WeakPassword(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        AuthError::MissingName | AuthError::AlreadyVerified => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        AuthError::InvalidCredentials => {
            (StatusCode::UNAUTHORIZED, "Invalid email or password".to_owned())
        }
        AuthError::EmailNotVerified => (
            StatusCode::FORBIDDEN,
            "Please verify your email address before signing in".to_owned(),
        ),
        AuthError::UserNotFound => (StatusCode::NOT_FOUND, "Account not found".to_owned()),
        AuthError::UserAlreadyExists => (
            StatusCode::CONFLICT,
            "An account with this email already exists".to_owned(),
        ),
        AuthError::Token(e) => token_response(*e),
        AuthError::Delivery(_) => (
            StatusCode::BAD_GATEWAY,
            "Could not send email, please try again later".to_owned(),
        ),
        AuthError::Repository(e) => repository_response(e),
        AuthError::PasswordHash => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_owned()),
    }
}

impl AppError {
    /// Status code and client-safe message.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Database(e) => repository_response(e),
            Self::Auth(e) => auth_response(e),
            Self::Scope(e) => match e {
                ScopeError::Unauthorized => {
                    (StatusCode::UNAUTHORIZED, "Authentication required".to_owned())
                }
                ScopeError::UnknownShop => (StatusCode::NOT_FOUND, "Shop not found".to_owned()),
                ScopeError::Repository(e) => repository_response(e),
                ScopeError::Session(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_owned()),
            },
            Self::Order(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            Self::Storage(e) => match e {
                StorageError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_owned()),
                other => (StatusCode::BAD_REQUEST, other.to_string()),
            },
            Self::Session(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_owned())
            }
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "Too many requests".to_owned()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        // Capture server errors to Sentry; upstream failures are only logged
        if status == StatusCode::BAD_GATEWAY {
            tracing::warn!(error = %self, "Upstream failure");
        } else if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(json!({ "error": message }))).into_response()
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

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for customer actions such as placing an order.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("round 12".to_string());
        assert_eq!(err.to_string(), "Not found: round 12");

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
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
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
    fn test_token_errors() {
        assert_eq!(
            get_status(AuthError::Token(TokenError::InvalidToken).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AuthError::Token(TokenError::TokenExpired).into()),
            StatusCode::GONE
        );
    }

    #[test]
    fn test_auth_error_statuses() {
        assert_eq!(
            get_status(AuthError::EmailNotVerified.into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AuthError::UserAlreadyExists.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AuthError::UserNotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AuthError::AlreadyVerified.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(
                AuthError::Delivery(crate::services::email::EmailError::InvalidAddress(
                    "x".into()
                ))
                .into()
            ),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_repository_conflict_is_409_and_hides_database_errors() {
        assert_eq!(
            get_status(RepositoryError::Conflict("slug already taken".into()).into()),
            StatusCode::CONFLICT
        );
        let (status, message) =
            AppError::from(RepositoryError::DataCorruption("bad row".into())).status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Internal server error");
    }

    #[test]
    fn test_scope_errors() {
        assert_eq!(
            get_status(ScopeError::Unauthorized.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(ScopeError::UnknownShop.into()),
            StatusCode::NOT_FOUND
        );
    }
}

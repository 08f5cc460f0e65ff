//! Authentication error types.

use thiserror::Error;

use rounds_core::tokens::TokenError;

use crate::db::RepositoryError;
use crate::services::email::EmailError;
use crate::services::tokens::TokenServiceError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] rounds_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Login attempted before the email was verified.
    #[error("email address has not been verified")]
    EmailNotVerified,

    /// Verification requested for an account that is already verified.
    #[error("email address is already verified")]
    AlreadyVerified,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Display name missing.
    #[error("name is required")]
    MissingName,

    /// Token missing, used or expired.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Mail could not be delivered.
    #[error("email delivery failed: {0}")]
    Delivery(#[from] EmailError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl From<TokenServiceError> for AuthError {
    fn from(err: TokenServiceError) -> Self {
        match err {
            TokenServiceError::Token(e) => Self::Token(e),
            TokenServiceError::Repository(e) => Self::Repository(e),
        }
    }
}

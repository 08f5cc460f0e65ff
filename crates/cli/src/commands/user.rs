//! Owner account maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Mark an account verified when the mail never arrived
//! rounds-cli user verify -e owner@example.com
//! ```

use rounds_core::Email;
use rounds_storefront::db::{RepositoryError, TokenRepository};
use rounds_storefront::services::TokenService;

use super::{CommandError, connect};

/// Mark an owner's email as verified without a token and drop any
/// verification links still outstanding.
///
/// # Errors
///
/// Returns an error for malformed or unknown emails.
pub async fn verify(email: &str) -> Result<(), CommandError> {
    let email = Email::parse(email).map_err(|e| CommandError::InvalidEmail(e.to_string()))?;
    let pool = connect().await?;

    TokenService::new(TokenRepository::new(&pool))
        .verify_without_token(email.as_str())
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => CommandError::UnknownUser(email.to_string()),
            other => CommandError::Repository(other),
        })?;

    tracing::info!(email = %email, "Account marked verified");
    Ok(())
}

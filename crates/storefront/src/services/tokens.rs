//! Email verification and password reset tokens.
//!
//! Issuing a token replaces any token the email already holds for that
//! purpose. Lookups apply the lifetime rules from [`rounds_core::tokens`]:
//! expired rows are deleted on read and reported as
//! [`TokenError::TokenExpired`]; everything else that is not live is
//! [`TokenError::InvalidToken`].

use std::future::Future;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use rand::RngCore;
use thiserror::Error;
use tracing::instrument;

use rounds_core::tokens::{TokenCheck, TokenError, TokenPurpose, TokenRecord};

use crate::db::RepositoryError;

/// Random bytes per token (256 bits).
const TOKEN_BYTES: usize = 32;

/// Persistence for single-use tokens, one table per purpose.
pub trait TokenStore: Send + Sync {
    /// Delete every token of `purpose` for the record's email, then insert it.
    fn replace(
        &self,
        purpose: TokenPurpose,
        record: &TokenRecord,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Look a token up by its value.
    fn find(
        &self,
        purpose: TokenPurpose,
        token: &str,
    ) -> impl Future<Output = Result<Option<TokenRecord>, RepositoryError>> + Send;

    /// Delete a token. Deleting a missing token is not an error.
    fn delete(
        &self,
        purpose: TokenPurpose,
        token: &str,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Mark the token's email verified and delete the token in one atomic
    /// step. Returns `false` if the token was gone by the time it ran.
    fn consume_verification(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Mark `email` verified and delete all of its verification tokens in
    /// one atomic step. Returns `false` if no account has this email.
    fn verify_account(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Delete every token of `purpose` that expired before `now`.
    fn purge_expired(
        &self,
        purpose: TokenPurpose,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, RepositoryError>> + Send;
}

/// Errors from token operations.
#[derive(Debug, Error)]
pub enum TokenServiceError {
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Generate a fresh URL-safe token.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Token issuance and verification on top of a [`TokenStore`].
pub struct TokenService<T> {
    store: T,
}

impl<T: TokenStore> TokenService<T> {
    #[must_use]
    pub const fn new(store: T) -> Self {
        Self { store }
    }

    /// Issue a new token for `email`, invalidating any previous one.
    ///
    /// # Errors
    ///
    /// Returns a repository error if the token cannot be stored.
    #[instrument(skip(self), fields(purpose = %purpose))]
    pub async fn issue(
        &self,
        purpose: TokenPurpose,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<String, RepositoryError> {
        let record = TokenRecord {
            email: email.to_owned(),
            token: generate_token(),
            expires_at: purpose.expires_at(now),
            created_at: now,
        };
        self.store.replace(purpose, &record).await?;
        Ok(record.token)
    }

    /// Find a live token, deleting it first if it has expired.
    async fn live(
        &self,
        purpose: TokenPurpose,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenRecord, TokenServiceError> {
        let found = self.store.find(purpose, token).await?;
        match TokenCheck::classify(found, now) {
            TokenCheck::Live(record) => Ok(record),
            TokenCheck::Expired(record) => {
                self.store.delete(purpose, &record.token).await?;
                Err(TokenError::TokenExpired.into())
            }
            TokenCheck::Missing => Err(TokenError::InvalidToken.into()),
        }
    }

    /// Verify an email verification token: marks the email verified and
    /// consumes the token. Returns the verified email.
    ///
    /// # Errors
    ///
    /// `InvalidToken` if unknown or already used, `TokenExpired` if expired.
    #[instrument(skip(self, token))]
    pub async fn verify_email(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<String, TokenServiceError> {
        let record = self.live(TokenPurpose::EmailVerification, token, now).await?;
        if !self.store.consume_verification(&record.token).await? {
            return Err(TokenError::InvalidToken.into());
        }
        Ok(record.email)
    }

    /// Mark an account verified without a token. Outstanding verification
    /// links for the email stop working.
    ///
    /// # Errors
    ///
    /// `RepositoryError::NotFound` if no account has this email.
    #[instrument(skip(self))]
    pub async fn verify_without_token(&self, email: &str) -> Result<(), RepositoryError> {
        if self.store.verify_account(email).await? {
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    /// Check a password reset token and return its email. The token stays
    /// valid until [`Self::consume_reset`] is called.
    ///
    /// # Errors
    ///
    /// `InvalidToken` if unknown, `TokenExpired` if expired.
    #[instrument(skip(self, token))]
    pub async fn verify_reset(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<String, TokenServiceError> {
        let record = self.live(TokenPurpose::PasswordReset, token, now).await?;
        Ok(record.email)
    }

    /// Delete a password reset token after the password has been changed.
    ///
    /// # Errors
    ///
    /// Returns a repository error if the delete fails.
    pub async fn consume_reset(&self, token: &str) -> Result<(), RepositoryError> {
        self.store.delete(TokenPurpose::PasswordReset, token).await
    }

    /// Delete expired tokens of every purpose. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns a repository error if a delete fails.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut removed = 0;
        for purpose in [TokenPurpose::EmailVerification, TokenPurpose::PasswordReset] {
            removed += self.store.purge_expired(purpose, now).await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::testing::MemoryStore;

    #[test]
    fn test_generated_tokens_are_url_safe_and_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(
            a.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[tokio::test]
    async fn test_new_token_invalidates_previous() {
        let store = MemoryStore::default();
        store.add_user("owner@example.com", "Owner", "hash");
        let tokens = TokenService::new(store.clone());
        let now = Utc::now();

        let first = tokens
            .issue(TokenPurpose::EmailVerification, "owner@example.com", now)
            .await
            .unwrap();
        let second = tokens
            .issue(TokenPurpose::EmailVerification, "owner@example.com", now)
            .await
            .unwrap();

        let err = tokens.verify_email(&first, now).await.unwrap_err();
        assert!(matches!(
            err,
            TokenServiceError::Token(TokenError::InvalidToken)
        ));
        assert_eq!(
            tokens.verify_email(&second, now).await.unwrap(),
            "owner@example.com"
        );
    }

    #[tokio::test]
    async fn test_expired_token_is_removed() {
        let store = MemoryStore::default();
        store.add_user("owner@example.com", "Owner", "hash");
        let tokens = TokenService::new(store.clone());
        let issued = Utc::now() - Duration::hours(25);

        let token = tokens
            .issue(TokenPurpose::EmailVerification, "owner@example.com", issued)
            .await
            .unwrap();

        let now = Utc::now();
        let err = tokens.verify_email(&token, now).await.unwrap_err();
        assert!(matches!(
            err,
            TokenServiceError::Token(TokenError::TokenExpired)
        ));

        let err = tokens.verify_email(&token, now).await.unwrap_err();
        assert!(matches!(
            err,
            TokenServiceError::Token(TokenError::InvalidToken)
        ));
        assert!(!store.is_verified("owner@example.com"));
    }

    #[tokio::test]
    async fn test_verification_is_single_use() {
        let store = MemoryStore::default();
        store.add_user("owner@example.com", "Owner", "hash");
        let tokens = TokenService::new(store.clone());
        let now = Utc::now();

        let token = tokens
            .issue(TokenPurpose::EmailVerification, "owner@example.com", now)
            .await
            .unwrap();
        tokens.verify_email(&token, now).await.unwrap();
        assert!(store.is_verified("owner@example.com"));

        assert!(tokens.verify_email(&token, now).await.is_err());
    }

    #[tokio::test]
    async fn test_verify_without_token_drops_outstanding_links() {
        let store = MemoryStore::default();
        store.add_user("owner@example.com", "Owner", "hash");
        let tokens = TokenService::new(store.clone());
        let now = Utc::now();

        let link = tokens
            .issue(TokenPurpose::EmailVerification, "owner@example.com", now)
            .await
            .unwrap();
        let reset = tokens
            .issue(TokenPurpose::PasswordReset, "owner@example.com", now)
            .await
            .unwrap();

        tokens
            .verify_without_token("owner@example.com")
            .await
            .unwrap();
        assert!(store.is_verified("owner@example.com"));
        assert_eq!(store.token_count(TokenPurpose::EmailVerification), 0);
        assert!(tokens.verify_email(&link, now).await.is_err());
        assert!(tokens.verify_reset(&reset, now).await.is_ok());

        assert!(matches!(
            tokens.verify_without_token("nobody@example.com").await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_reset_token_survives_verify_until_consumed() {
        let store = MemoryStore::default();
        let tokens = TokenService::new(store.clone());
        let now = Utc::now();

        let token = tokens
            .issue(TokenPurpose::PasswordReset, "owner@example.com", now)
            .await
            .unwrap();

        assert_eq!(
            tokens.verify_reset(&token, now).await.unwrap(),
            "owner@example.com"
        );
        assert!(tokens.verify_reset(&token, now).await.is_ok());

        tokens.consume_reset(&token).await.unwrap();
        assert!(tokens.verify_reset(&token, now).await.is_err());
    }

    #[tokio::test]
    async fn test_reset_token_expires_after_an_hour() {
        let store = MemoryStore::default();
        let tokens = TokenService::new(store.clone());
        let issued = Utc::now();

        let token = tokens
            .issue(TokenPurpose::PasswordReset, "owner@example.com", issued)
            .await
            .unwrap();

        let later = issued + Duration::minutes(61);
        assert!(matches!(
            tokens.verify_reset(&token, later).await,
            Err(TokenServiceError::Token(TokenError::TokenExpired))
        ));
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = MemoryStore::default();
        let tokens = TokenService::new(store.clone());
        let long_ago = Utc::now() - Duration::days(3);

        tokens
            .issue(TokenPurpose::EmailVerification, "a@example.com", long_ago)
            .await
            .unwrap();
        tokens
            .issue(TokenPurpose::PasswordReset, "b@example.com", long_ago)
            .await
            .unwrap();
        tokens
            .issue(TokenPurpose::PasswordReset, "c@example.com", Utc::now())
            .await
            .unwrap();

        assert_eq!(tokens.purge_expired(Utc::now()).await.unwrap(), 2);
    }
}

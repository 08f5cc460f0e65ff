//! Authentication service.
//!
//! Password accounts for shop owners with email verification and password
//! reset. Storage, tokens and mail delivery are traits so the flows can be
//! exercised against in-memory stores.

mod error;

pub use error::AuthError;

use std::future::Future;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use tracing::instrument;

use rounds_core::tokens::TokenPurpose;
use rounds_core::{Email, UserId};

use crate::db::RepositoryError;
use crate::models::User;
use crate::services::email::{EmailKind, EmailMessage, EmailSender};
use crate::services::tokens::{TokenService, TokenStore};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Persistence for owner accounts.
pub trait UserStore: Send + Sync {
    fn find_by_email(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// The user and their password hash, if both exist.
    fn find_with_password(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Option<(User, String)>, RepositoryError>> + Send;

    /// Create an unverified user. `Conflict` if the email is taken.
    fn create(
        &self,
        email: &Email,
        name: &str,
        password_hash: &str,
    ) -> impl Future<Output = Result<User, RepositoryError>> + Send;

    fn set_password(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Authentication service.
///
/// Handles registration, verification, login and password reset.
pub struct AuthService<'a, U, T, M> {
    users: U,
    tokens: TokenService<T>,
    mailer: &'a M,
    base_url: &'a str,
}

impl<'a, U, T, M> AuthService<'a, U, T, M>
where
    U: UserStore,
    T: TokenStore,
    M: EmailSender,
{
    /// Create a new authentication service. `base_url` has no trailing slash
    /// and prefixes the links placed in outgoing mail.
    #[must_use]
    pub const fn new(users: U, tokens: T, mailer: &'a M, base_url: &'a str) -> Self {
        Self {
            users,
            tokens: TokenService::new(tokens),
            mailer,
            base_url,
        }
    }

    /// Register a new user and send the verification email.
    ///
    /// Mail delivery failure is logged; the account still exists and the
    /// owner can ask for a new link.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, password, name))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::MissingName);
        }

        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(&email, name, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        if let Err(e) = self.send_verification(&user, now).await {
            tracing::warn!(error = %e, user_id = %user.id, "Failed to send verification email");
        }

        Ok(user)
    }

    /// Verify an email address. A welcome email is attempted afterwards.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if the token is unknown, used or expired.
    #[instrument(skip(self, token))]
    pub async fn verify_email(&self, token: &str, now: DateTime<Utc>) -> Result<Email, AuthError> {
        let email = self.tokens.verify_email(token, now).await?;
        let email = Email::parse(&email)?;

        match self.users.find_by_email(&email).await {
            Ok(Some(user)) => {
                let message = EmailMessage {
                    to: user.email.to_string(),
                    kind: EmailKind::Welcome {
                        name: user.name.clone(),
                        dashboard_url: format!("{}/", self.base_url),
                    },
                };
                if let Err(e) = self.mailer.send(message).await {
                    tracing::warn!(error = %e, user_id = %user.id, "Failed to send welcome email");
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to load user for welcome email"),
        }

        tracing::info!(email = %email, "Email verified");
        Ok(email)
    }

    /// Issue a fresh verification token and mail it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` for unknown emails,
    /// `AuthError::AlreadyVerified` for verified accounts and
    /// `AuthError::Delivery` when the mail cannot be sent.
    #[instrument(skip(self))]
    pub async fn resend_verification(&self, email: &str, now: DateTime<Utc>) -> Result<(), AuthError> {
        let email = Email::parse(email)?;
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if user.email_verified {
            return Err(AuthError::AlreadyVerified);
        }

        self.send_verification(&user, now).await
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::EmailNotVerified` if the password is right but the
    /// email has not been verified.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .find_with_password(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        if !user.email_verified {
            return Err(AuthError::EmailNotVerified);
        }

        Ok(user)
    }

    /// Start a password reset. Never reports whether the account exists;
    /// failures are only logged.
    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str, now: DateTime<Utc>) {
        let Ok(email) = Email::parse(email) else {
            return;
        };

        let user = match self.users.find_by_email(&email).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::debug!("Password reset requested for unknown email");
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to look up user for password reset");
                return;
            }
        };

        let token = match self
            .tokens
            .issue(TokenPurpose::PasswordReset, user.email.as_str(), now)
            .await
        {
            Ok(token) => token,
            Err(e) => {
                tracing::error!(error = %e, user_id = %user.id, "Failed to issue reset token");
                return;
            }
        };

        let message = EmailMessage {
            to: user.email.to_string(),
            kind: EmailKind::PasswordReset {
                name: user.name.clone(),
                link: format!("{}/auth/reset-password?token={token}", self.base_url),
            },
        };
        if let Err(e) = self.mailer.send(message).await {
            tracing::warn!(error = %e, user_id = %user.id, "Failed to send password reset email");
        }
    }

    /// Set a new password using a reset token. The token is deleted only
    /// after the new hash has been stored.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword`, `AuthError::Token` or
    /// `AuthError::UserNotFound`.
    #[instrument(skip(self, token, password))]
    pub async fn reset_password(
        &self,
        token: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        validate_password(password)?;

        let email = self.tokens.verify_reset(token, now).await?;
        let email = Email::parse(&email)?;
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let password_hash = hash_password(password)?;
        self.users
            .set_password(user.id, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })?;

        self.tokens.consume_reset(token).await?;

        tracing::info!(user_id = %user.id, "Password reset");
        Ok(())
    }

    async fn send_verification(&self, user: &User, now: DateTime<Utc>) -> Result<(), AuthError> {
        let token = self
            .tokens
            .issue(TokenPurpose::EmailVerification, user.email.as_str(), now)
            .await?;

        let message = EmailMessage {
            to: user.email.to_string(),
            kind: EmailKind::Verification {
                name: user.name.clone(),
                link: format!("{}/auth/verify?token={token}", self.base_url),
            },
        };
        self.mailer.send(message).await?;
        Ok(())
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rounds_core::tokens::TokenError;

    use super::*;
    use crate::testing::{MemoryStore, RecordingMailer};

    const BASE: &str = "https://rounds.test";

    fn service<'a>(
        store: &MemoryStore,
        mailer: &'a RecordingMailer,
    ) -> AuthService<'a, MemoryStore, MemoryStore, RecordingMailer> {
        AuthService::new(store.clone(), store.clone(), mailer, BASE)
    }

    fn token_from_link(link: &str) -> &str {
        link.split("token=").nth(1).unwrap()
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("secret1").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("secret1", &hash).is_ok());
        assert!(matches!(
            verify_password("secret2", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_password_length_rule() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[tokio::test]
    async fn test_register_sends_verification_link() {
        let store = MemoryStore::default();
        let mailer = RecordingMailer::default();
        let auth = service(&store, &mailer);

        let user = auth
            .register("Owner@Example.com", "secret1", "Owner", Utc::now())
            .await
            .unwrap();
        assert_eq!(user.email.as_str(), "owner@example.com");
        assert!(!user.email_verified);

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert!(matches!(
            &sent[0].kind,
            EmailKind::Verification { link, .. } if link.starts_with("https://rounds.test/auth/verify?token=")
        ));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_bad_input() {
        let store = MemoryStore::default();
        let mailer = RecordingMailer::default();
        let auth = service(&store, &mailer);
        let now = Utc::now();

        auth.register("a@example.com", "secret1", "A", now)
            .await
            .unwrap();
        assert!(matches!(
            auth.register("A@example.com", "secret1", "A", now).await,
            Err(AuthError::UserAlreadyExists)
        ));
        assert!(matches!(
            auth.register("b@example.com", "short", "B", now).await,
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            auth.register("not-an-email", "secret1", "C", now).await,
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            auth.register("d@example.com", "secret1", "  ", now).await,
            Err(AuthError::MissingName)
        ));
    }

    #[tokio::test]
    async fn test_register_survives_mail_failure() {
        let store = MemoryStore::default();
        let mailer = RecordingMailer::failing();
        let auth = service(&store, &mailer);

        assert!(
            auth.register("a@example.com", "secret1", "A", Utc::now())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_login_requires_verified_email() {
        let store = MemoryStore::default();
        let mailer = RecordingMailer::default();
        let auth = service(&store, &mailer);
        let now = Utc::now();

        auth.register("a@example.com", "secret1", "A", now)
            .await
            .unwrap();
        assert!(matches!(
            auth.login("a@example.com", "secret1").await,
            Err(AuthError::EmailNotVerified)
        ));
        assert!(matches!(
            auth.login("a@example.com", "wrong-password").await,
            Err(AuthError::InvalidCredentials)
        ));

        let link = match &mailer.sent()[0].kind {
            EmailKind::Verification { link, .. } => link.clone(),
            other => panic!("unexpected mail {other:?}"),
        };
        auth.verify_email(token_from_link(&link), now).await.unwrap();

        let user = auth.login("a@example.com", "secret1").await.unwrap();
        assert!(user.email_verified);
        assert!(matches!(
            mailer.sent().last().map(|m| &m.kind),
            Some(EmailKind::Welcome { .. })
        ));
    }

    #[tokio::test]
    async fn test_resend_verification_rules() {
        let store = MemoryStore::default();
        let mailer = RecordingMailer::default();
        let auth = service(&store, &mailer);
        let now = Utc::now();

        assert!(matches!(
            auth.resend_verification("nobody@example.com", now).await,
            Err(AuthError::UserNotFound)
        ));

        auth.register("a@example.com", "secret1", "A", now)
            .await
            .unwrap();
        auth.resend_verification("a@example.com", now).await.unwrap();
        assert_eq!(mailer.sent().len(), 2);

        mailer.set_failing(true);
        assert!(matches!(
            auth.resend_verification("a@example.com", now).await,
            Err(AuthError::Delivery(_))
        ));

        store.set_verified("a@example.com");
        assert!(matches!(
            auth.resend_verification("a@example.com", now).await,
            Err(AuthError::AlreadyVerified)
        ));
    }

    #[tokio::test]
    async fn test_forgot_password_is_silent_for_unknown_email() {
        let store = MemoryStore::default();
        let mailer = RecordingMailer::default();
        let auth = service(&store, &mailer);

        auth.forgot_password("nobody@example.com", Utc::now()).await;
        auth.forgot_password("garbage", Utc::now()).await;
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_reset_password_changes_hash_and_consumes_token() {
        let store = MemoryStore::default();
        let mailer = RecordingMailer::default();
        let auth = service(&store, &mailer);
        let now = Utc::now();

        auth.register("a@example.com", "secret1", "A", now)
            .await
            .unwrap();
        store.set_verified("a@example.com");

        auth.forgot_password("a@example.com", now).await;
        let link = match &mailer.sent().last().unwrap().kind {
            EmailKind::PasswordReset { link, .. } => link.clone(),
            other => panic!("unexpected mail {other:?}"),
        };
        let token = token_from_link(&link);

        assert!(matches!(
            auth.reset_password(token, "tiny", now).await,
            Err(AuthError::WeakPassword(_))
        ));

        auth.reset_password(token, "new-secret", now).await.unwrap();
        assert!(auth.login("a@example.com", "new-secret").await.is_ok());
        assert!(matches!(
            auth.login("a@example.com", "secret1").await,
            Err(AuthError::InvalidCredentials)
        ));

        assert!(matches!(
            auth.reset_password(token, "another-secret", now).await,
            Err(AuthError::Token(TokenError::InvalidToken))
        ));
    }
}

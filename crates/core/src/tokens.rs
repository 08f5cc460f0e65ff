//! Single-use email tokens: verification and password reset.
//!
//! A token for an email is in one of four states: absent, live, expired or
//! consumed. Consumed and absent look the same from outside (the row is gone).
//! Storage and generation live in the storefront; this module holds the
//! lifetime rules so every store applies them identically.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// What a token is for. Each purpose has its own table and lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    EmailVerification,
    PasswordReset,
}

impl TokenPurpose {
    /// How long a freshly issued token stays valid.
    #[must_use]
    pub fn ttl(self) -> Duration {
        match self {
            Self::EmailVerification => Duration::hours(24),
            Self::PasswordReset => Duration::hours(1),
        }
    }

    /// Expiry for a token issued at `now`.
    #[must_use]
    pub fn expires_at(self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.ttl()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmailVerification => "email_verification",
            Self::PasswordReset => "password_reset",
        }
    }
}

impl std::fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored token row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub email: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Whether the token has expired at `now`.
    ///
    /// A token is still valid at the exact instant of its expiry.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Why a token could not be used.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// No such token: never issued, superseded, or already consumed.
    #[error("invalid or unknown token")]
    InvalidToken,
    /// The token existed but its lifetime has passed. It has been removed.
    #[error("token has expired")]
    TokenExpired,
}

/// Outcome of looking a token up, before any side effects are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenCheck {
    /// Live token for this email.
    Live(TokenRecord),
    /// Expired; the caller must delete it and report [`TokenError::TokenExpired`].
    Expired(TokenRecord),
    /// Not found.
    Missing,
}

impl TokenCheck {
    /// Classify a lookup result at `now`.
    #[must_use]
    pub fn classify(record: Option<TokenRecord>, now: DateTime<Utc>) -> Self {
        match record {
            None => Self::Missing,
            Some(r) if r.is_expired_at(now) => Self::Expired(r),
            Some(r) => Self::Live(r),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(expires_at: DateTime<Utc>) -> TokenRecord {
        TokenRecord {
            email: "owner@example.com".into(),
            token: "abc".into(),
            expires_at,
            created_at: expires_at - Duration::hours(1),
        }
    }

    #[test]
    fn test_lifetimes() {
        assert_eq!(TokenPurpose::EmailVerification.ttl(), Duration::hours(24));
        assert_eq!(TokenPurpose::PasswordReset.ttl(), Duration::hours(1));

        let now = Utc::now();
        assert_eq!(
            TokenPurpose::EmailVerification.expires_at(now) - now,
            Duration::hours(24)
        );
    }

    #[test]
    fn test_classify_states() {
        let now = Utc::now();
        assert_eq!(TokenCheck::classify(None, now), TokenCheck::Missing);

        let live = record(now + Duration::minutes(5));
        assert_eq!(
            TokenCheck::classify(Some(live.clone()), now),
            TokenCheck::Live(live)
        );

        let expired = record(now - Duration::seconds(1));
        assert_eq!(
            TokenCheck::classify(Some(expired.clone()), now),
            TokenCheck::Expired(expired)
        );
    }

    #[test]
    fn test_valid_at_exact_expiry() {
        let now = Utc::now();
        assert!(!record(now).is_expired_at(now));
    }
}

//! Cross-crate flow tests for Rounds.
//!
//! The tests in `tests/` drive the storefront services end to end against
//! the in-memory stores from `rounds_storefront::testing`, so they need
//! neither `PostgreSQL` nor SMTP.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p rounds-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `auth_flow` - registration, verification and password reset
//! - `shop_scope` - owner shop scoping across selections
//! - `round_reports` - pricing, stock, purchase list and finance together

use rounds_storefront::services::email::{EmailKind, EmailMessage};

/// Pull the `token` query parameter out of a mailed link.
#[must_use]
pub fn token_from_link(link: &str) -> Option<&str> {
    link.split_once("token=").map(|(_, token)| token)
}

/// The link carried by a verification or password reset message.
#[must_use]
pub fn link_of(message: &EmailMessage) -> Option<&str> {
    match &message.kind {
        EmailKind::Verification { link, .. } | EmailKind::PasswordReset { link, .. } => {
            Some(link.as_str())
        }
        EmailKind::Welcome { .. } => None,
    }
}

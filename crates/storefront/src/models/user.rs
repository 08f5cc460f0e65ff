//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use rounds_core::{Email, UserId};

/// A shop owner account (domain type).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address, stored lowercase.
    pub email: Email,
    /// Display name.
    pub name: String,
    /// Whether the email has been verified.
    pub email_verified: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

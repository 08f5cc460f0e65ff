//! Token maintenance.

use chrono::Utc;

use rounds_storefront::db::TokenRepository;
use rounds_storefront::services::TokenService;

use super::{CommandError, connect};

/// Delete expired verification and password reset tokens.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a delete fails.
pub async fn purge() -> Result<u64, CommandError> {
    let pool = connect().await?;

    let removed = TokenService::new(TokenRepository::new(&pool))
        .purge_expired(Utc::now())
        .await?;

    tracing::info!(removed, "Expired tokens purged");
    Ok(removed)
}

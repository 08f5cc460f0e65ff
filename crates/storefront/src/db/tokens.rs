//! Token tables for email verification and password reset.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use rounds_core::tokens::{TokenPurpose, TokenRecord};

use super::RepositoryError;
use crate::services::tokens::TokenStore;

#[derive(Debug, sqlx::FromRow)]
struct TokenRow {
    email: String,
    token: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<TokenRow> for TokenRecord {
    fn from(row: TokenRow) -> Self {
        Self {
            email: row.email,
            token: row.token,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

const fn table(purpose: TokenPurpose) -> &'static str {
    match purpose {
        TokenPurpose::EmailVerification => "storefront.verification_token",
        TokenPurpose::PasswordReset => "storefront.password_reset_token",
    }
}

/// Repository for the token tables.
#[derive(Clone, Copy)]
pub struct TokenRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TokenRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl TokenStore for TokenRepository<'_> {
    #[instrument(skip(self, record), fields(purpose = %purpose))]
    async fn replace(
        &self,
        purpose: TokenPurpose,
        record: &TokenRecord,
    ) -> Result<(), RepositoryError> {
        let table = table(purpose);
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!("DELETE FROM {table} WHERE email = $1"))
            .bind(&record.email)
            .execute(&mut *tx)
            .await?;

        sqlx::query(&format!(
            "INSERT INTO {table} (email, token, expires_at, created_at) VALUES ($1, $2, $3, $4)"
        ))
        .bind(&record.email)
        .bind(&record.token)
        .bind(record.expires_at)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, "token collision"))?;

        tx.commit().await?;
        Ok(())
    }

    async fn find(
        &self,
        purpose: TokenPurpose,
        token: &str,
    ) -> Result<Option<TokenRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, TokenRow>(&format!(
            "SELECT email, token, expires_at, created_at FROM {} WHERE token = $1",
            table(purpose)
        ))
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(TokenRecord::from))
    }

    async fn delete(&self, purpose: TokenPurpose, token: &str) -> Result<(), RepositoryError> {
        sqlx::query(&format!("DELETE FROM {} WHERE token = $1", table(purpose)))
            .bind(token)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn consume_verification(&self, token: &str) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let email: Option<(String,)> = sqlx::query_as(
            r"
            DELETE FROM storefront.verification_token
            WHERE token = $1
            RETURNING email
            ",
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((email,)) = email else {
            return Ok(false);
        };

        sqlx::query(
            r"
            UPDATE storefront.user
            SET email_verified = TRUE, updated_at = NOW()
            WHERE email = $1
            ",
        )
        .bind(&email)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    #[instrument(skip(self))]
    async fn verify_account(&self, email: &str) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r"
            UPDATE storefront.user
            SET email_verified = TRUE, updated_at = NOW()
            WHERE email = $1
            ",
        )
        .bind(email)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("DELETE FROM storefront.verification_token WHERE email = $1")
            .bind(email)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn purge_expired(
        &self,
        purpose: TokenPurpose,
        now: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE expires_at < $1",
            table(purpose)
        ))
        .bind(now)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

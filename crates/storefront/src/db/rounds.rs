//! Round repository.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use tracing::instrument;

use rounds_core::scope::ShopScope;
use rounds_core::{RoundId, RoundStatus, ShopId};

use super::RepositoryError;
use crate::models::Round;

#[derive(Debug, sqlx::FromRow)]
struct RoundRow {
    id: RoundId,
    shop_id: ShopId,
    name: String,
    opens_at: Option<DateTime<Utc>>,
    closes_at: Option<DateTime<Utc>>,
    shipping_date: Option<NaiveDate>,
    pickup_date: Option<NaiveDate>,
    status: RoundStatus,
    created_at: DateTime<Utc>,
}

impl From<RoundRow> for Round {
    fn from(row: RoundRow) -> Self {
        Self {
            id: row.id,
            shop_id: row.shop_id,
            name: row.name,
            opens_at: row.opens_at,
            closes_at: row.closes_at,
            shipping_date: row.shipping_date,
            pickup_date: row.pickup_date,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

const ROUND_COLUMNS: &str =
    "id, shop_id, name, opens_at, closes_at, shipping_date, pickup_date, status, created_at";

/// Fields for a new round.
#[derive(Debug, Clone)]
pub struct NewRound {
    pub name: String,
    pub opens_at: Option<DateTime<Utc>>,
    pub closes_at: Option<DateTime<Utc>>,
    pub shipping_date: Option<NaiveDate>,
    pub pickup_date: Option<NaiveDate>,
}

/// Repository for rounds.
#[derive(Clone, Copy)]
pub struct RoundRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RoundRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Rounds of every shop in `scope`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, scope: &ShopScope) -> Result<Vec<Round>, RepositoryError> {
        if scope.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, RoundRow>(&format!(
            r"
            SELECT {ROUND_COLUMNS} FROM storefront.round
            WHERE shop_id = ANY($1)
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(scope.as_i32_vec())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Round::from).collect())
    }

    /// Get a round by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: RoundId) -> Result<Option<Round>, RepositoryError> {
        let row = sqlx::query_as::<_, RoundRow>(&format!(
            "SELECT {ROUND_COLUMNS} FROM storefront.round WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Round::from))
    }

    /// Get a round only if its shop is in `scope`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_in_scope(
        &self,
        id: RoundId,
        scope: &ShopScope,
    ) -> Result<Option<Round>, RepositoryError> {
        Ok(self.get(id).await?.filter(|r| scope.contains(r.shop_id)))
    }

    /// The shop's current open round: the newest `OPEN` round whose window
    /// contains `now`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn current_open(
        &self,
        shop_id: ShopId,
        now: DateTime<Utc>,
    ) -> Result<Option<Round>, RepositoryError> {
        let row = sqlx::query_as::<_, RoundRow>(&format!(
            r"
            SELECT {ROUND_COLUMNS} FROM storefront.round
            WHERE shop_id = $1
              AND status = 'OPEN'
              AND (opens_at IS NULL OR opens_at <= $2)
              AND (closes_at IS NULL OR closes_at > $2)
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "
        ))
        .bind(shop_id)
        .bind(now)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Round::from))
    }

    /// Create a round in `shop_id`. New rounds start `OPEN`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    #[instrument(skip(self, round), fields(shop_id = %shop_id))]
    pub async fn create(&self, shop_id: ShopId, round: &NewRound) -> Result<Round, RepositoryError> {
        let row = sqlx::query_as::<_, RoundRow>(&format!(
            r"
            INSERT INTO storefront.round
                (shop_id, name, opens_at, closes_at, shipping_date, pickup_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ROUND_COLUMNS}
            "
        ))
        .bind(shop_id)
        .bind(&round.name)
        .bind(round.opens_at)
        .bind(round.closes_at)
        .bind(round.shipping_date)
        .bind(round.pickup_date)
        .fetch_one(self.pool)
        .await?;

        Ok(Round::from(row))
    }

    /// Write back the mutable fields of `round`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the round no longer exists.
    #[instrument(skip(self, round), fields(round_id = %round.id))]
    pub async fn update(&self, round: &Round) -> Result<Round, RepositoryError> {
        let row = sqlx::query_as::<_, RoundRow>(&format!(
            r"
            UPDATE storefront.round
            SET name = $2, opens_at = $3, closes_at = $4, shipping_date = $5,
                pickup_date = $6, status = $7
            WHERE id = $1
            RETURNING {ROUND_COLUMNS}
            "
        ))
        .bind(round.id)
        .bind(&round.name)
        .bind(round.opens_at)
        .bind(round.closes_at)
        .bind(round.shipping_date)
        .bind(round.pickup_date)
        .bind(round.status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(Round::from(row))
    }
}

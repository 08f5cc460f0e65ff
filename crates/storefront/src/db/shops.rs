//! Shop repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use rounds_core::pricing::ShippingRate;
use rounds_core::scope::ShopScope;
use rounds_core::{ShopId, Slug, UserId};

use super::RepositoryError;
use crate::models::{PaymentInfo, Shop};
use crate::services::scope::OwnedShops;

#[derive(Debug, sqlx::FromRow)]
struct ShopRow {
    id: ShopId,
    owner_id: UserId,
    name: String,
    slug: String,
    description: Option<String>,
    is_active: bool,
    bank_name: Option<String>,
    account_name: Option<String>,
    account_number: Option<String>,
    promptpay_id: Option<String>,
    shipping_rates: Json<Vec<ShippingRate>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ShopRow> for Shop {
    type Error = RepositoryError;

    fn try_from(row: ShopRow) -> Result<Self, Self::Error> {
        let slug = Slug::parse(&row.slug).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid slug in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            slug,
            description: row.description,
            is_active: row.is_active,
            payment: PaymentInfo {
                bank_name: row.bank_name,
                account_name: row.account_name,
                account_number: row.account_number,
                promptpay_id: row.promptpay_id,
            },
            shipping_rates: row.shipping_rates.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SHOP_COLUMNS: &str = "id, owner_id, name, slug, description, is_active, bank_name, \
     account_name, account_number, promptpay_id, shipping_rates, created_at, updated_at";

/// Fields for a new shop.
#[derive(Debug, Clone)]
pub struct NewShop {
    pub name: String,
    pub slug: Slug,
    pub description: Option<String>,
    pub payment: PaymentInfo,
    pub shipping_rates: Vec<ShippingRate>,
}

/// Repository for shops.
#[derive(Clone, Copy)]
pub struct ShopRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ShopRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Shops visible in `scope`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, scope: &ShopScope) -> Result<Vec<Shop>, RepositoryError> {
        if scope.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, ShopRow>(&format!(
            "SELECT {SHOP_COLUMNS} FROM storefront.shop WHERE id = ANY($1) ORDER BY created_at DESC"
        ))
        .bind(scope.as_i32_vec())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Shop::try_from).collect()
    }

    /// Get a shop by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ShopId) -> Result<Option<Shop>, RepositoryError> {
        let row = sqlx::query_as::<_, ShopRow>(&format!(
            "SELECT {SHOP_COLUMNS} FROM storefront.shop WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Shop::try_from).transpose()
    }

    /// Get a shop by its public slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Shop>, RepositoryError> {
        let row = sqlx::query_as::<_, ShopRow>(&format!(
            "SELECT {SHOP_COLUMNS} FROM storefront.shop WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        row.map(Shop::try_from).transpose()
    }

    /// Create a shop for `owner`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    #[instrument(skip(self, shop), fields(slug = %shop.slug))]
    pub async fn create(&self, owner: UserId, shop: &NewShop) -> Result<Shop, RepositoryError> {
        let row = sqlx::query_as::<_, ShopRow>(&format!(
            r"
            INSERT INTO storefront.shop
                (owner_id, name, slug, description, bank_name, account_name,
                 account_number, promptpay_id, shipping_rates)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {SHOP_COLUMNS}
            "
        ))
        .bind(owner)
        .bind(&shop.name)
        .bind(shop.slug.as_str())
        .bind(&shop.description)
        .bind(&shop.payment.bank_name)
        .bind(&shop.payment.account_name)
        .bind(&shop.payment.account_number)
        .bind(&shop.payment.promptpay_id)
        .bind(Json(&shop.shipping_rates))
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, "slug already taken"))?;

        Shop::try_from(row)
    }

    /// Write back the mutable fields of `shop`. The slug is immutable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the shop no longer exists.
    #[instrument(skip(self, shop), fields(shop_id = %shop.id))]
    pub async fn update(&self, shop: &Shop) -> Result<Shop, RepositoryError> {
        let row = sqlx::query_as::<_, ShopRow>(&format!(
            r"
            UPDATE storefront.shop
            SET name = $2, description = $3, is_active = $4, bank_name = $5,
                account_name = $6, account_number = $7, promptpay_id = $8,
                shipping_rates = $9, updated_at = NOW()
            WHERE id = $1
            RETURNING {SHOP_COLUMNS}
            "
        ))
        .bind(shop.id)
        .bind(&shop.name)
        .bind(&shop.description)
        .bind(shop.is_active)
        .bind(&shop.payment.bank_name)
        .bind(&shop.payment.account_name)
        .bind(&shop.payment.account_number)
        .bind(&shop.payment.promptpay_id)
        .bind(Json(&shop.shipping_rates))
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Shop::try_from(row)
    }
}

impl OwnedShops for ShopRepository<'_> {
    async fn owned_shop_ids(&self, owner: UserId) -> Result<Vec<ShopId>, RepositoryError> {
        let ids: Vec<(ShopId,)> =
            sqlx::query_as("SELECT id FROM storefront.shop WHERE owner_id = $1 ORDER BY id")
                .bind(owner)
                .fetch_all(self.pool)
                .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }
}

//! Product repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use rounds_core::scope::ShopScope;
use rounds_core::{Money, ProductId, ShopId};

use super::RepositoryError;
use crate::models::{Product, ProductOption};

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    shop_id: ShopId,
    name: String,
    description: Option<String>,
    price: Money,
    cost_price: Option<Money>,
    is_available: bool,
    round_limit: Option<i32>,
    image_urls: Vec<String>,
    options: Json<Vec<ProductOption>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            shop_id: row.shop_id,
            name: row.name,
            description: row.description,
            price: row.price,
            cost_price: row.cost_price,
            is_available: row.is_available,
            round_limit: row.round_limit,
            image_urls: row.image_urls,
            options: row.options.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const PRODUCT_COLUMNS: &str = "id, shop_id, name, description, price, cost_price, is_available, \
     round_limit, image_urls, options, created_at, updated_at";

/// Fields for a new product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub cost_price: Option<Money>,
    pub is_available: bool,
    pub round_limit: Option<i32>,
    pub image_urls: Vec<String>,
    pub options: Vec<ProductOption>,
}

/// Repository for products.
#[derive(Clone, Copy)]
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Products of every shop in `scope`, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, scope: &ShopScope) -> Result<Vec<Product>, RepositoryError> {
        if scope.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE shop_id = ANY($1) ORDER BY name, id"
        ))
        .bind(scope.as_i32_vec())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Products of one shop, by name. `available_only` hides products the
    /// owner switched off.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_shop(
        &self,
        shop_id: ShopId,
        available_only: bool,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS} FROM storefront.product
            WHERE shop_id = $1 AND (is_available OR NOT $2)
            ORDER BY name, id
            "
        ))
        .bind(shop_id)
        .bind(available_only)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Create a product in `shop_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    #[instrument(skip(self, product), fields(shop_id = %shop_id))]
    pub async fn create(
        &self,
        shop_id: ShopId,
        product: &NewProduct,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO storefront.product
                (shop_id, name, description, price, cost_price, is_available,
                 round_limit, image_urls, options)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(shop_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.cost_price)
        .bind(product.is_available)
        .bind(product.round_limit)
        .bind(&product.image_urls)
        .bind(Json(&product.options))
        .fetch_one(self.pool)
        .await?;

        Ok(Product::from(row))
    }

    /// Write back the mutable fields of `product`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product no longer exists.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn update(&self, product: &Product) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE storefront.product
            SET name = $2, description = $3, price = $4, cost_price = $5,
                is_available = $6, round_limit = $7, image_urls = $8, options = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.cost_price)
        .bind(product.is_available)
        .bind(product.round_limit)
        .bind(&product.image_urls)
        .bind(Json(&product.options))
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(Product::from(row))
    }

    /// Delete a product. Order items keep their snapshot and lose the link.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

//! Read-only queries behind the round purchase list, stock and finance views.
//!
//! These return raw inputs; grouping and arithmetic happen in
//! [`rounds_core::inventory`] and [`rounds_core::finance`].

use std::collections::HashMap;

use sqlx::PgPool;
use tracing::instrument;

use rounds_core::finance::PaidOrderTotals;
use rounds_core::inventory::PurchaseLine;
use rounds_core::scope::ShopScope;
use rounds_core::{Money, OrderStatus, ProductId, RoundId};

use super::RepositoryError;
use crate::services::reports::ReportStore;

#[derive(Debug, sqlx::FromRow)]
struct PurchaseLineRow {
    product_name: Option<String>,
    quantity: Option<i64>,
    cost_price: Option<Money>,
}

#[derive(Debug, sqlx::FromRow)]
struct PaidTotalsRow {
    subtotal: Money,
    shipping_fee: Money,
}

fn paid_statuses() -> Vec<&'static str> {
    OrderStatus::PAID.iter().map(|s| s.as_str()).collect()
}

/// Repository for round reports.
#[derive(Clone, Copy)]
pub struct ReportRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReportRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Order items per product in the round, counted as rows regardless of
    /// order status or quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn sold_counts(
        &self,
        round_id: RoundId,
    ) -> Result<HashMap<ProductId, i64>, RepositoryError> {
        let rows: Vec<(ProductId, i64)> = sqlx::query_as(
            r"
            SELECT oi.product_id, COUNT(*) AS sold
            FROM storefront.order_item oi
            JOIN storefront.customer_order o ON o.id = oi.order_id
            WHERE o.round_id = $1 AND oi.product_id IS NOT NULL
            GROUP BY oi.product_id
            ",
        )
        .bind(round_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }
}

impl ReportStore for ReportRepository<'_> {
    #[instrument(skip(self, scope))]
    async fn purchase_lines(
        &self,
        round_id: RoundId,
        scope: &ShopScope,
    ) -> Result<Vec<PurchaseLine>, RepositoryError> {
        if scope.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, PurchaseLineRow>(
            r"
            SELECT oi.product_name, oi.quantity::BIGINT AS quantity, p.cost_price
            FROM storefront.order_item oi
            JOIN storefront.customer_order o ON o.id = oi.order_id
            LEFT JOIN storefront.product p ON p.id = oi.product_id
            WHERE o.round_id = $1
              AND o.shop_id = ANY($2)
              AND o.status::TEXT = ANY($3)
            ORDER BY oi.id
            ",
        )
        .bind(round_id)
        .bind(scope.as_i32_vec())
        .bind(paid_statuses())
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PurchaseLine {
                product_name: row.product_name,
                quantity: row.quantity,
                cost_price: row.cost_price,
            })
            .collect())
    }

    #[instrument(skip(self, scope))]
    async fn paid_order_totals(
        &self,
        round_id: RoundId,
        scope: &ShopScope,
    ) -> Result<Vec<PaidOrderTotals>, RepositoryError> {
        if scope.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, PaidTotalsRow>(
            r"
            SELECT subtotal, shipping_fee
            FROM storefront.customer_order
            WHERE round_id = $1
              AND shop_id = ANY($2)
              AND status::TEXT = ANY($3)
            ",
        )
        .bind(round_id)
        .bind(scope.as_i32_vec())
        .bind(paid_statuses())
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PaidOrderTotals {
                subtotal: row.subtotal,
                shipping_fee: row.shipping_fee,
            })
            .collect())
    }
}

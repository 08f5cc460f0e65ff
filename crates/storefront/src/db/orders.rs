//! Order repository.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;
use uuid::Uuid;

use rounds_core::scope::ShopScope;
use rounds_core::{
    Fulfillment, Money, OrderId, OrderItemId, OrderStatus, ProductId, RoundId, ShopId,
};

use super::RepositoryError;
use crate::models::{Order, OrderItem};
use crate::services::orders::NewOrder;

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    tracking_code: Uuid,
    round_id: RoundId,
    shop_id: ShopId,
    status: OrderStatus,
    customer_name: String,
    customer_phone: String,
    customer_email: Option<String>,
    customer_address: Option<String>,
    fulfillment: Fulfillment,
    subtotal: Money,
    shipping_fee: Money,
    total: Money,
    slip_url: Option<String>,
    paid_at: Option<DateTime<Utc>>,
    tracking_number: Option<String>,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            tracking_code: row.tracking_code,
            round_id: row.round_id,
            shop_id: row.shop_id,
            status: row.status,
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            customer_email: row.customer_email,
            customer_address: row.customer_address,
            fulfillment: row.fulfillment,
            subtotal: row.subtotal,
            shipping_fee: row.shipping_fee,
            total: row.total,
            slip_url: row.slip_url,
            paid_at: row.paid_at,
            tracking_number: row.tracking_number,
            note: row.note,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    product_id: Option<ProductId>,
    product_name: String,
    selected_options: Json<BTreeMap<String, String>>,
    quantity: i32,
    unit_price: Money,
    line_total: Money,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            selected_options: row.selected_options.0,
            quantity: row.quantity,
            unit_price: row.unit_price,
            line_total: row.line_total,
        }
    }
}

const ORDER_COLUMNS: &str = "id, tracking_code, round_id, shop_id, status, customer_name, \
     customer_phone, customer_email, customer_address, fulfillment, subtotal, shipping_fee, \
     total, slip_url, paid_at, tracking_number, note, created_at, updated_at";

/// Optional filters for the owner order list.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    pub round_id: Option<RoundId>,
    pub status: Option<OrderStatus>,
}

/// Repository for orders and their items.
#[derive(Clone, Copy)]
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order and its items in one transaction. The order starts
    /// `PENDING` with a fresh tracking code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any insert fails.
    #[instrument(skip(self, order), fields(shop_id = %order.shop_id, round_id = %order.round_id))]
    pub async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO storefront.customer_order
                (tracking_code, round_id, shop_id, customer_name, customer_phone,
                 customer_email, customer_address, fulfillment, subtotal,
                 shipping_fee, total, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(Uuid::new_v4())
        .bind(order.round_id)
        .bind(order.shop_id)
        .bind(&order.customer_name)
        .bind(&order.customer_phone)
        .bind(&order.customer_email)
        .bind(&order.customer_address)
        .bind(order.fulfillment)
        .bind(order.totals.subtotal)
        .bind(order.totals.shipping_fee)
        .bind(order.totals.total)
        .bind(&order.note)
        .fetch_one(&mut *tx)
        .await?;

        for item in &order.items {
            sqlx::query(
                r"
                INSERT INTO storefront.order_item
                    (order_id, product_id, product_name, selected_options, quantity,
                     unit_price, line_total)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(row.id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(Json(&item.selected_options))
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.line_total)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(order_id = %row.id, total = %row.total, "Order placed");
        Ok(Order::from(row))
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.customer_order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Order::from))
    }

    /// Get an order only if its shop is in `scope`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_in_scope(
        &self,
        id: OrderId,
        scope: &ShopScope,
    ) -> Result<Option<Order>, RepositoryError> {
        Ok(self.get(id).await?.filter(|o| scope.contains(o.shop_id)))
    }

    /// Get an order by its public tracking code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_code(&self, code: Uuid) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.customer_order WHERE tracking_code = $1"
        ))
        .bind(code)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Order::from))
    }

    /// Line items of an order, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT id, product_id, product_name, selected_options, quantity,
                   unit_price, line_total
            FROM storefront.order_item
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(OrderItem::from).collect())
    }

    /// Orders in `scope`, newest first, narrowed by `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        scope: &ShopScope,
        filter: OrderFilter,
    ) -> Result<Vec<Order>, RepositoryError> {
        if scope.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM storefront.customer_order
            WHERE shop_id = ANY($1)
              AND ($2::INTEGER IS NULL OR round_id = $2)
              AND ($3::storefront.order_status IS NULL OR status = $3)
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(scope.as_i32_vec())
        .bind(filter.round_id)
        .bind(filter.status)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// Attach a payment slip and move the order to `PAID_WAITING`.
    ///
    /// Returns `None` when no `PENDING` order has this code; the status
    /// check and the update are one statement.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    #[instrument(skip(self, slip_url))]
    pub async fn mark_slip_uploaded(
        &self,
        code: Uuid,
        slip_url: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE storefront.customer_order
            SET slip_url = $2, paid_at = $3, status = 'PAID_WAITING', updated_at = NOW()
            WHERE tracking_code = $1 AND status = 'PENDING'
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(code)
        .bind(slip_url)
        .bind(now)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Order::from))
    }

    /// Write back the owner-editable fields: status, tracking number, note.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order no longer exists.
    #[instrument(skip(self, order), fields(order_id = %order.id, status = %order.status))]
    pub async fn update(&self, order: &Order) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE storefront.customer_order
            SET status = $2, tracking_number = $3, note = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(order.id)
        .bind(order.status)
        .bind(&order.tracking_number)
        .bind(&order.note)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(Order::from(row))
    }
}

//! Order domain types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use rounds_core::{
    Fulfillment, Money, OrderId, OrderItemId, OrderStatus, ProductId, RoundId, ShopId,
};

/// A customer order (domain type).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    /// Public handle used in tracking URLs.
    pub tracking_code: Uuid,
    pub round_id: RoundId,
    pub shop_id: ShopId,
    pub status: OrderStatus,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub customer_address: Option<String>,
    pub fulfillment: Fulfillment,
    pub subtotal: Money,
    pub shipping_fee: Money,
    pub total: Money,
    pub slip_url: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub tracking_number: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of an order, with the product name and price captured at
/// placement time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    /// `None` once the product has been deleted.
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub selected_options: BTreeMap<String, String>,
    pub quantity: i32,
    pub unit_price: Money,
    pub line_total: Money,
}

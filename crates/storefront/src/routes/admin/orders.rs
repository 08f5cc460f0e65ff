//! Order management for owners.
//!
//! Owners may move an order to any status; nothing here enforces a
//! transition graph.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Deserialize;

use rounds_core::{OrderId, OrderStatus, RoundId};

use super::{not_found, nullable, optional};
use crate::db::OrderRepository;
use crate::db::orders::OrderFilter;
use crate::error::Result;
use crate::middleware::RequireShopScope;
use crate::models::Order;
use crate::routes::orders::OrderWithItems;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list))
        .route("/orders/{id}", get(show).patch(update))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuery {
    #[serde(alias = "round_id")]
    pub round_id: Option<RoundId>,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    pub status: Option<OrderStatus>,
    #[serde(default, deserialize_with = "nullable")]
    pub tracking_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub note: Option<Option<String>>,
}

impl UpdateOrderRequest {
    fn apply(self, order: &mut Order) {
        if let Some(status) = self.status {
            order.status = status;
        }
        if let Some(tracking_number) = self.tracking_number {
            order.tracking_number = optional(tracking_number);
        }
        if let Some(note) = self.note {
            order.note = optional(note);
        }
    }
}

/// `GET /api/admin/orders?roundId=&status=`
pub async fn list(
    State(state): State<AppState>,
    RequireShopScope { scope, .. }: RequireShopScope,
    Query(query): Query<OrderQuery>,
) -> Result<Json<Vec<Order>>> {
    let filter = OrderFilter {
        round_id: query.round_id,
        status: query.status,
    };
    Ok(Json(
        OrderRepository::new(state.pool())
            .list(&scope, filter)
            .await?,
    ))
}

/// `GET /api/admin/orders/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireShopScope { scope, .. }: RequireShopScope,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderWithItems>> {
    let orders = OrderRepository::new(state.pool());
    let order = orders
        .get_in_scope(id, &scope)
        .await?
        .ok_or_else(|| not_found("Order"))?;
    let items = orders.items(order.id).await?;
    Ok(Json(OrderWithItems { order, items }))
}

/// `PATCH /api/admin/orders/{id}`
pub async fn update(
    State(state): State<AppState>,
    RequireShopScope { scope, .. }: RequireShopScope,
    Path(id): Path<OrderId>,
    Json(body): Json<UpdateOrderRequest>,
) -> Result<Json<Order>> {
    let orders = OrderRepository::new(state.pool());
    let mut order = orders
        .get_in_scope(id, &scope)
        .await?
        .ok_or_else(|| not_found("Order"))?;

    let previous = order.status;
    body.apply(&mut order);
    let order = orders.update(&order).await?;
    if previous != order.status {
        tracing::info!(order_id = %order.id, from = %previous, to = %order.status, "Order status changed");
    }

    Ok(Json(order))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rounds_core::{Fulfillment, Money, ShopId};
    use uuid::Uuid;

    use super::*;

    fn order(status: OrderStatus) -> Order {
        Order {
            id: OrderId::new(9),
            tracking_code: Uuid::new_v4(),
            round_id: RoundId::new(1),
            shop_id: ShopId::new(1),
            status,
            customer_name: "Ploy".into(),
            customer_phone: "0812345678".into(),
            customer_email: None,
            customer_address: Some("Bangkok".into()),
            fulfillment: Fulfillment::Delivery,
            subtotal: Money::from_minor(10_000),
            shipping_fee: Money::ZERO,
            total: Money::from_minor(10_000),
            slip_url: None,
            paid_at: None,
            tracking_number: None,
            note: Some("ring bell".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_any_status_may_be_set() {
        let mut o = order(OrderStatus::Cancelled);
        let patch: UpdateOrderRequest =
            serde_json::from_str(r#"{"status": "PENDING", "trackingNumber": "TH123"}"#).unwrap();
        patch.apply(&mut o);
        assert_eq!(o.status, OrderStatus::Pending);
        assert_eq!(o.tracking_number.as_deref(), Some("TH123"));
        assert_eq!(o.note.as_deref(), Some("ring bell"));
    }

    #[test]
    fn test_null_note_clears_it() {
        let mut o = order(OrderStatus::Confirmed);
        let patch: UpdateOrderRequest = serde_json::from_str(r#"{"note": null}"#).unwrap();
        patch.apply(&mut o);
        assert_eq!(o.note, None);
        assert_eq!(o.status, OrderStatus::Confirmed);
    }
}

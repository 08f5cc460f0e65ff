//! Status enums for rounds and orders.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// Customers create orders as `Pending`; uploading a payment slip moves them
/// to `PaidWaiting`; everything after that is set by the shop owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.order_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    PaidWaiting,
    Confirmed,
    Shipped,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Statuses whose line items count as purchased: the slip has been
    /// uploaded or the owner has moved the order further along.
    pub const PAID: [Self; 4] = [
        Self::PaidWaiting,
        Self::Confirmed,
        Self::Shipped,
        Self::Completed,
    ];

    /// Whether this order counts towards purchase lists and revenue.
    #[must_use]
    pub fn is_paid(self) -> bool {
        Self::PAID.contains(&self)
    }

    /// The wire/database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::PaidWaiting => "PAID_WAITING",
            Self::Confirmed => "CONFIRMED",
            Self::Shipped => "SHIPPED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PAID_WAITING" => Ok(Self::PaidWaiting),
            "CONFIRMED" => Ok(Self::Confirmed),
            "SHIPPED" => Ok(Self::Shipped),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELLED" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Round status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.round_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundStatus {
    /// Accepting orders (subject to the open/close window).
    #[default]
    Open,
    /// No longer accepting orders.
    Closed,
}

/// How the customer receives the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.fulfillment", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Fulfillment {
    /// Shipped to the customer's address; shipping fee applies.
    #[default]
    Delivery,
    /// Collected on the round's pickup date; no shipping fee.
    Pickup,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_paid_statuses() {
        assert!(!OrderStatus::Pending.is_paid());
        assert!(OrderStatus::PaidWaiting.is_paid());
        assert!(OrderStatus::Confirmed.is_paid());
        assert!(OrderStatus::Shipped.is_paid());
        assert!(OrderStatus::Completed.is_paid());
        assert!(!OrderStatus::Cancelled.is_paid());
    }

    #[test]
    fn test_order_status_wire_format() {
        let json = serde_json::to_string(&OrderStatus::PaidWaiting).unwrap();
        assert_eq!(json, "\"PAID_WAITING\"");
        let parsed: OrderStatus = serde_json::from_str("\"SHIPPED\"").unwrap();
        assert_eq!(parsed, OrderStatus::Shipped);
    }

    #[test]
    fn test_order_status_from_str_matches_as_str() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::PaidWaiting,
            OrderStatus::Confirmed,
            OrderStatus::Shipped,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("paid".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_round_status_and_fulfillment_serde() {
        assert_eq!(serde_json::to_string(&RoundStatus::Open).unwrap(), "\"OPEN\"");
        assert_eq!(
            serde_json::from_str::<Fulfillment>("\"PICKUP\"").unwrap(),
            Fulfillment::Pickup
        );
    }
}

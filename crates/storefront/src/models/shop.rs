//! Shop domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rounds_core::pricing::ShippingRate;
use rounds_core::{ShopId, Slug, UserId};

/// Where customers send money.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub bank_name: Option<String>,
    pub account_name: Option<String>,
    pub account_number: Option<String>,
    /// Mobile number or national id registered with `PromptPay`.
    pub promptpay_id: Option<String>,
}

/// A shop (domain type).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    pub id: ShopId,
    pub owner_id: UserId,
    pub name: String,
    pub slug: Slug,
    pub description: Option<String>,
    pub is_active: bool,
    pub payment: PaymentInfo,
    /// Shipping tiers sorted by `min_items`.
    pub shipping_rates: Vec<ShippingRate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

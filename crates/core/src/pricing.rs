//! Order pricing: line totals, shipping tiers and order totals.

use serde::{Deserialize, Serialize};

use crate::types::{Fulfillment, Money};

/// One tier of a shop's shipping table.
///
/// The fee applies to orders with at least `min_items` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRate {
    pub min_items: i64,
    pub fee: Money,
}

/// Errors from validating a shipping-rate table.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShippingRateError {
    #[error("shipping tier min_items must be at least 1")]
    MinItemsTooLow,
    #[error("shipping fee cannot be negative")]
    NegativeFee,
    #[error("shipping fee is too large")]
    FeeTooLarge,
    #[error("duplicate shipping tier for {0} items")]
    DuplicateTier(i64),
}

/// Validate a shipping table and return it sorted by `min_items`.
///
/// # Errors
///
/// Returns an error for tiers below one item, negative or oversized fees, or
/// two tiers with the same `min_items`.
pub fn normalize_shipping_rates(
    mut rates: Vec<ShippingRate>,
) -> Result<Vec<ShippingRate>, ShippingRateError> {
    rates.sort_by_key(|r| r.min_items);
    for (i, rate) in rates.iter().enumerate() {
        if rate.min_items < 1 {
            return Err(ShippingRateError::MinItemsTooLow);
        }
        if rate.fee.is_negative() {
            return Err(ShippingRateError::NegativeFee);
        }
        if !rate.fee.fits_storage() {
            return Err(ShippingRateError::FeeTooLarge);
        }
        if i > 0 && rates.get(i - 1).is_some_and(|prev| prev.min_items == rate.min_items) {
            return Err(ShippingRateError::DuplicateTier(rate.min_items));
        }
    }
    Ok(rates)
}

/// Shipping fee for an order of `item_count` items.
///
/// Pickup orders ship for free. Delivery orders pay the fee of the highest
/// tier whose `min_items` does not exceed the item count, or nothing when no
/// tier applies.
#[must_use]
pub fn shipping_fee_for(rates: &[ShippingRate], fulfillment: Fulfillment, item_count: i64) -> Money {
    match fulfillment {
        Fulfillment::Pickup => Money::ZERO,
        Fulfillment::Delivery => rates
            .iter()
            .filter(|r| r.min_items <= item_count)
            .max_by_key(|r| r.min_items)
            .map_or(Money::ZERO, |r| r.fee),
    }
}

/// A priced order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub quantity: i64,
    pub unit_price: Money,
}

impl PricedLine {
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// Totals of an order at placement time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub item_count: i64,
    pub subtotal: Money,
    pub shipping_fee: Money,
    pub total: Money,
}

/// Price an order from its lines, the shop's shipping table and the
/// fulfillment method.
#[must_use]
pub fn price_order(
    lines: &[PricedLine],
    rates: &[ShippingRate],
    fulfillment: Fulfillment,
) -> OrderTotals {
    let item_count = lines.iter().map(|l| l.quantity).sum();
    let subtotal: Money = lines.iter().map(PricedLine::line_total).sum();
    let shipping_fee = shipping_fee_for(rates, fulfillment, item_count);

    OrderTotals {
        item_count,
        subtotal,
        shipping_fee,
        total: subtotal + shipping_fee,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn rates() -> Vec<ShippingRate> {
        vec![
            ShippingRate {
                min_items: 1,
                fee: Money::from_minor(5_000),
            },
            ShippingRate {
                min_items: 3,
                fee: Money::from_minor(8_000),
            },
            ShippingRate {
                min_items: 10,
                fee: Money::ZERO,
            },
        ]
    }

    #[test]
    fn test_highest_matching_tier_applies() {
        let rates = rates();
        assert_eq!(
            shipping_fee_for(&rates, Fulfillment::Delivery, 1),
            Money::from_minor(5_000)
        );
        assert_eq!(
            shipping_fee_for(&rates, Fulfillment::Delivery, 4),
            Money::from_minor(8_000)
        );
        assert_eq!(shipping_fee_for(&rates, Fulfillment::Delivery, 12), Money::ZERO);
    }

    #[test]
    fn test_no_tier_or_pickup_is_free() {
        assert_eq!(shipping_fee_for(&[], Fulfillment::Delivery, 5), Money::ZERO);
        assert_eq!(shipping_fee_for(&rates(), Fulfillment::Pickup, 5), Money::ZERO);
        assert_eq!(shipping_fee_for(&rates(), Fulfillment::Delivery, 0), Money::ZERO);
    }

    #[test]
    fn test_price_order_totals() {
        let lines = [
            PricedLine {
                quantity: 2,
                unit_price: Money::from_minor(15_000),
            },
            PricedLine {
                quantity: 1,
                unit_price: Money::from_minor(9_950),
            },
        ];
        let totals = price_order(&lines, &rates(), Fulfillment::Delivery);
        assert_eq!(totals.item_count, 3);
        assert_eq!(totals.subtotal, Money::from_minor(39_950));
        assert_eq!(totals.shipping_fee, Money::from_minor(8_000));
        assert_eq!(totals.total, Money::from_minor(47_950));
    }

    #[test]
    fn test_normalize_sorts_and_validates() {
        let mut unsorted = rates();
        unsorted.reverse();
        let sorted = normalize_shipping_rates(unsorted).unwrap();
        assert_eq!(sorted.first().unwrap().min_items, 1);

        let dup = vec![
            ShippingRate {
                min_items: 2,
                fee: Money::ZERO,
            },
            ShippingRate {
                min_items: 2,
                fee: Money::from_minor(100),
            },
        ];
        assert_eq!(
            normalize_shipping_rates(dup),
            Err(ShippingRateError::DuplicateTier(2))
        );

        let negative = vec![ShippingRate {
            min_items: 1,
            fee: Money::from_minor(-1),
        }];
        assert_eq!(
            normalize_shipping_rates(negative),
            Err(ShippingRateError::NegativeFee)
        );

        let huge = vec![ShippingRate {
            min_items: 1,
            fee: Money::from_minor(1_000_000_000_000),
        }];
        assert_eq!(
            normalize_shipping_rates(huge),
            Err(ShippingRateError::FeeTooLarge)
        );
    }

    #[test]
    fn test_shipping_rate_json_shape() {
        let rate: ShippingRate = serde_json::from_str(r#"{"min_items": 2, "fee": 40}"#).unwrap();
        assert_eq!(rate.min_items, 2);
        assert_eq!(rate.fee, Money::from_minor(4_000));
    }
}

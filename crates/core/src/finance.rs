//! Round finance summary.

use serde::Serialize;

use crate::inventory::PurchaseRow;
use crate::types::Money;

/// Money totals of one paid order, as loaded for the finance summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaidOrderTotals {
    pub subtotal: Money,
    pub shipping_fee: Money,
}

/// Revenue and cost figures for a round, over paid orders only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceSummary {
    pub order_count: i64,
    pub product_revenue: Money,
    pub shipping_collected: Money,
    pub total_revenue: Money,
    pub cost_of_goods: Money,
    pub gross_profit: Money,
}

impl FinanceSummary {
    /// Build the summary from paid orders and the round's purchase list.
    ///
    /// Cost of goods uses the purchase list's representative unit costs, so
    /// it matches what the owner sees on the purchase report.
    #[must_use]
    pub fn compute(orders: &[PaidOrderTotals], purchases: &[PurchaseRow]) -> Self {
        let product_revenue: Money = orders.iter().map(|o| o.subtotal).sum();
        let shipping_collected: Money = orders.iter().map(|o| o.shipping_fee).sum();
        let cost_of_goods: Money = purchases.iter().map(PurchaseRow::total_cost).sum();

        Self {
            order_count: i64::try_from(orders.len()).unwrap_or(i64::MAX),
            product_revenue,
            shipping_collected,
            total_revenue: product_revenue + shipping_collected,
            cost_of_goods,
            gross_profit: product_revenue - cost_of_goods,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_figures() {
        let orders = [
            PaidOrderTotals {
                subtotal: Money::from_minor(30_000),
                shipping_fee: Money::from_minor(5_000),
            },
            PaidOrderTotals {
                subtotal: Money::from_minor(10_000),
                shipping_fee: Money::ZERO,
            },
        ];
        let purchases = [
            PurchaseRow {
                name: "Tee".into(),
                total_quantity: 3,
                unit_cost: Money::from_minor(6_000),
            },
            PurchaseRow {
                name: "Mug".into(),
                total_quantity: 1,
                unit_cost: Money::ZERO,
            },
        ];

        let summary = FinanceSummary::compute(&orders, &purchases);
        assert_eq!(summary.order_count, 2);
        assert_eq!(summary.product_revenue, Money::from_minor(40_000));
        assert_eq!(summary.shipping_collected, Money::from_minor(5_000));
        assert_eq!(summary.total_revenue, Money::from_minor(45_000));
        assert_eq!(summary.cost_of_goods, Money::from_minor(18_000));
        assert_eq!(summary.gross_profit, Money::from_minor(22_000));
    }

    #[test]
    fn test_empty_round_is_all_zero() {
        assert_eq!(FinanceSummary::compute(&[], &[]), FinanceSummary::default());
    }
}

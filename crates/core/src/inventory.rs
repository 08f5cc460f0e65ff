//! Per-round inventory: purchase lists and remaining stock.
//!
//! Both are recomputed from order items on every read. Nothing here keeps a
//! running counter.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use crate::types::Money;

/// Name used for line items whose snapshotted product name is missing.
pub const UNNAMED_ITEM: &str = "Unnamed item";

/// One order line as loaded for purchase aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseLine {
    /// Product name captured when the order was placed.
    pub product_name: Option<String>,
    /// Ordered quantity; `None` is counted as zero.
    pub quantity: Option<i64>,
    /// Cost price of the referenced product, if the product still exists
    /// and has one.
    pub cost_price: Option<Money>,
}

/// One row of a round's purchase (packing) list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRow {
    pub name: String,
    pub total_quantity: i64,
    pub unit_cost: Money,
}

impl PurchaseRow {
    /// `total_quantity × unit_cost`.
    #[must_use]
    pub fn total_cost(&self) -> Money {
        self.unit_cost.times(self.total_quantity)
    }
}

/// Group paid order lines into a purchase list.
///
/// Lines are grouped by snapshotted product name, not product id, so renamed
/// or deleted products still land on the list under the name the customer saw.
/// The unit cost of a group is the cost price carried by the first line of
/// that group (zero when absent); later lines never change it.
///
/// The result is sorted by [`compare_names`].
#[must_use]
pub fn aggregate_purchases(lines: impl IntoIterator<Item = PurchaseLine>) -> Vec<PurchaseRow> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut rows: Vec<PurchaseRow> = Vec::new();

    for line in lines {
        let name = line
            .product_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| UNNAMED_ITEM.to_owned());
        let quantity = line.quantity.unwrap_or(0);

        if let Some(row) = index.get(&name).and_then(|&i| rows.get_mut(i)) {
            row.total_quantity += quantity;
        } else {
            index.insert(name.clone(), rows.len());
            rows.push(PurchaseRow {
                name,
                total_quantity: quantity,
                unit_cost: line.cost_price.unwrap_or(Money::ZERO),
            });
        }
    }

    rows.sort_by(|a, b| compare_names(&a.name, &b.name));
    rows
}

/// Collation used for product names in reports.
///
/// Case-insensitive first so "apple" and "Banana" sort naturally, then the
/// raw strings as a tie-break so the order is total and deterministic.
#[must_use]
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

/// Stock position of one product within one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    /// Order items for this product in the round.
    pub sold_count: i64,
    /// `limit - sold_count`, or `None` when the product has no per-round
    /// limit. Not clamped: oversold products go negative.
    pub remaining: Option<i64>,
    pub is_in_stock: bool,
}

/// Compute a product's stock for a round from its per-round limit and the
/// number of order items already placed.
#[must_use]
pub fn compute_stock(round_limit: Option<i32>, sold_count: i64) -> StockLevel {
    match round_limit {
        Some(limit) => {
            let remaining = i64::from(limit) - sold_count;
            StockLevel {
                sold_count,
                remaining: Some(remaining),
                is_in_stock: remaining > 0,
            }
        }
        None => StockLevel {
            sold_count,
            remaining: None,
            is_in_stock: true,
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn line(name: Option<&str>, quantity: Option<i64>, cost: Option<i64>) -> PurchaseLine {
        PurchaseLine {
            product_name: name.map(str::to_owned),
            quantity,
            cost_price: cost.map(Money::from_minor),
        }
    }

    #[test]
    fn test_same_name_quantities_sum() {
        let rows = aggregate_purchases(vec![
            line(Some("Item A"), Some(3), Some(1_000)),
            line(Some("Item A"), Some(5), Some(1_000)),
        ]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Item A");
        assert_eq!(rows[0].total_quantity, 8);
        assert_eq!(rows[0].unit_cost, Money::from_minor(1_000));
    }

    #[test]
    fn test_sorted_by_name_regardless_of_input_order() {
        let rows = aggregate_purchases(vec![
            line(Some("cherry"), Some(1), None),
            line(Some("Banana"), Some(1), None),
            line(Some("apple"), Some(1), None),
        ]);
        let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["apple", "Banana", "cherry"]);
    }

    #[test]
    fn test_missing_name_uses_placeholder() {
        let rows = aggregate_purchases(vec![
            line(None, Some(2), None),
            line(Some("  "), Some(1), None),
        ]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, UNNAMED_ITEM);
        assert_eq!(rows[0].total_quantity, 3);
    }

    #[test]
    fn test_missing_quantity_and_cost_count_as_zero() {
        let rows = aggregate_purchases(vec![
            line(Some("Mug"), None, None),
            line(Some("Mug"), Some(4), None),
        ]);
        assert_eq!(rows[0].total_quantity, 4);
        assert_eq!(rows[0].unit_cost, Money::ZERO);
    }

    #[test]
    fn test_unit_cost_taken_from_first_line_only() {
        let rows = aggregate_purchases(vec![
            line(Some("Tee"), Some(1), Some(15_000)),
            line(Some("Tee"), Some(1), Some(99_900)),
            line(Some("Tee"), Some(1), None),
        ]);
        assert_eq!(rows[0].unit_cost, Money::from_minor(15_000));
        assert_eq!(rows[0].total_cost(), Money::from_minor(45_000));
    }

    #[test]
    fn test_renamed_products_group_separately() {
        let rows = aggregate_purchases(vec![
            line(Some("Old name"), Some(1), None),
            line(Some("New name"), Some(2), None),
        ]);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_compare_names_is_total() {
        assert_eq!(compare_names("a", "A"), Ordering::Less);
        assert_eq!(compare_names("A", "a"), Ordering::Greater);
        assert_eq!(compare_names("same", "same"), Ordering::Equal);
    }

    #[test]
    fn test_stock_with_limit_and_room_left() {
        let stock = compute_stock(Some(10), 4);
        assert_eq!(stock.remaining, Some(6));
        assert!(stock.is_in_stock);
        assert_eq!(stock.sold_count, 4);
    }

    #[test]
    fn test_stock_oversold_goes_negative() {
        let stock = compute_stock(Some(5), 7);
        assert_eq!(stock.remaining, Some(-2));
        assert!(!stock.is_in_stock);
    }

    #[test]
    fn test_stock_exactly_sold_out() {
        let stock = compute_stock(Some(3), 3);
        assert_eq!(stock.remaining, Some(0));
        assert!(!stock.is_in_stock);
    }

    #[test]
    fn test_stock_without_limit_is_always_in_stock() {
        for sold in [0, 1, 10_000] {
            let stock = compute_stock(None, sold);
            assert_eq!(stock.remaining, None);
            assert!(stock.is_in_stock);
        }
    }

    #[test]
    fn test_stock_serializes_null_remaining() {
        let json = serde_json::to_value(compute_stock(None, 2)).unwrap();
        assert_eq!(json["remaining"], serde_json::Value::Null);
        assert_eq!(json["isInStock"], serde_json::Value::Bool(true));
        assert_eq!(json["soldCount"], serde_json::json!(2));
    }
}

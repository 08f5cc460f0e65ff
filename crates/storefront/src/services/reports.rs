//! Round purchase list and finance summary.
//!
//! Only orders in a paid status ([`OrderStatus::PAID`]) belonging to shops
//! in the caller's scope contribute. Stores apply that filter; grouping and
//! arithmetic live in [`rounds_core::inventory`] and [`rounds_core::finance`].
//!
//! [`OrderStatus::PAID`]: rounds_core::OrderStatus::PAID

use std::future::Future;

use tracing::instrument;

use rounds_core::RoundId;
use rounds_core::finance::{FinanceSummary, PaidOrderTotals};
use rounds_core::inventory::{PurchaseLine, PurchaseRow, aggregate_purchases};
use rounds_core::scope::ShopScope;

use crate::db::RepositoryError;

/// Paid order data for a round.
pub trait ReportStore: Send + Sync {
    /// Line items of paid orders in the round placed with shops in `scope`.
    fn purchase_lines(
        &self,
        round_id: RoundId,
        scope: &ShopScope,
    ) -> impl Future<Output = Result<Vec<PurchaseLine>, RepositoryError>> + Send;

    /// Subtotal and shipping of each paid order in the round placed with
    /// shops in `scope`.
    fn paid_order_totals(
        &self,
        round_id: RoundId,
        scope: &ShopScope,
    ) -> impl Future<Output = Result<Vec<PaidOrderTotals>, RepositoryError>> + Send;
}

/// What to buy for the round, grouped by product name.
///
/// # Errors
///
/// Returns the store's error if loading fails.
#[instrument(skip(store, scope))]
pub async fn round_purchases<S: ReportStore>(
    store: &S,
    round_id: RoundId,
    scope: &ShopScope,
) -> Result<Vec<PurchaseRow>, RepositoryError> {
    Ok(aggregate_purchases(store.purchase_lines(round_id, scope).await?))
}

/// Revenue, cost of goods and profit for the round.
///
/// # Errors
///
/// Returns the store's error if loading fails.
#[instrument(skip(store, scope))]
pub async fn round_finance<S: ReportStore>(
    store: &S,
    round_id: RoundId,
    scope: &ShopScope,
) -> Result<FinanceSummary, RepositoryError> {
    let orders = store.paid_order_totals(round_id, scope).await?;
    let purchases = round_purchases(store, round_id, scope).await?;
    Ok(FinanceSummary::compute(&orders, &purchases))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rounds_core::{Money, OrderStatus, ShopId, UserId};

    use super::*;
    use crate::testing::{MemoryStore, SeedLine};

    fn line(name: &str, quantity: i32, cost: i64) -> SeedLine {
        SeedLine {
            product_name: name.into(),
            quantity,
            cost_price: Some(Money::from_minor(cost)),
        }
    }

    #[tokio::test]
    async fn test_unpaid_orders_are_left_out() {
        let store = MemoryStore::default();
        let shop = store.add_shop(UserId::new(100));
        let round = RoundId::new(1);

        for status in [OrderStatus::Pending, OrderStatus::Cancelled] {
            store.add_order(
                shop,
                round,
                status,
                Money::from_minor(9_000),
                Money::ZERO,
                vec![line("Bagel", 9, 500)],
            );
        }
        store.add_order(
            shop,
            round,
            OrderStatus::Confirmed,
            Money::from_minor(2_000),
            Money::from_minor(500),
            vec![line("Bagel", 2, 500)],
        );

        let scope = ShopScope::new([shop]);
        let purchases = round_purchases(&store, round, &scope).await.unwrap();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].total_quantity, 2);

        let summary = round_finance(&store, round, &scope).await.unwrap();
        assert_eq!(summary.order_count, 1);
        assert_eq!(summary.product_revenue, Money::from_minor(2_000));
        assert_eq!(summary.shipping_collected, Money::from_minor(500));
        assert_eq!(summary.cost_of_goods, Money::from_minor(1_000));
    }

    #[tokio::test]
    async fn test_other_rounds_and_empty_scope_are_left_out() {
        let store = MemoryStore::default();
        let shop = store.add_shop(UserId::new(100));
        store.add_order(
            shop,
            RoundId::new(2),
            OrderStatus::Completed,
            Money::from_minor(1_000),
            Money::ZERO,
            vec![line("Bagel", 1, 500)],
        );

        let scope = ShopScope::new([shop]);
        let purchases = round_purchases(&store, RoundId::new(1), &scope).await.unwrap();
        assert!(purchases.is_empty());

        let none = ShopScope::new(Vec::<ShopId>::new());
        let summary = round_finance(&store, RoundId::new(2), &none).await.unwrap();
        assert_eq!(summary, FinanceSummary::default());
    }
}

//! A round from first order to finance summary: placement, stock,
//! purchase list and profit.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, Utc};

use rounds_core::finance::{FinanceSummary, PaidOrderTotals};
use rounds_core::inventory::{PurchaseLine, aggregate_purchases, compute_stock};
use rounds_core::pricing::ShippingRate;
use rounds_core::scope::ShopScope;
use rounds_core::{
    Fulfillment, Money, OrderStatus, ProductId, RoundId, RoundStatus, ShopId, Slug, UserId,
};
use rounds_storefront::models::{PaymentInfo, Product, Round, Shop};
use rounds_storefront::services::orders::{
    LineRequest, NewOrder, OrderError, PlaceOrderRequest, plan_order,
};
use rounds_storefront::services::payment::payment_instructions;
use rounds_storefront::services::reports::{round_finance, round_purchases};
use rounds_storefront::testing::{MemoryStore, SeedLine};

fn shop() -> Shop {
    Shop {
        id: ShopId::new(1),
        owner_id: UserId::new(1),
        name: "Bakery".into(),
        slug: Slug::parse("bakery").unwrap(),
        description: None,
        is_active: true,
        payment: PaymentInfo {
            bank_name: Some("KBank".into()),
            account_name: Some("Bakery Co".into()),
            account_number: Some("123-4-56789-0".into()),
            promptpay_id: Some("081-234-5678".into()),
        },
        shipping_rates: vec![
            ShippingRate {
                min_items: 1,
                fee: Money::from_minor(5_000),
            },
            ShippingRate {
                min_items: 4,
                fee: Money::ZERO,
            },
        ],
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn round() -> Round {
    let now = Utc::now();
    Round {
        id: RoundId::new(7),
        shop_id: ShopId::new(1),
        name: "Week 1".into(),
        opens_at: Some(now - Duration::days(1)),
        closes_at: Some(now + Duration::days(1)),
        shipping_date: None,
        pickup_date: None,
        status: RoundStatus::Open,
        created_at: now,
    }
}

fn product(id: i32, name: &str, price: i64, cost: Option<i64>, limit: Option<i32>) -> Product {
    Product {
        id: ProductId::new(id),
        shop_id: ShopId::new(1),
        name: name.into(),
        description: None,
        price: Money::from_minor(price),
        cost_price: cost.map(Money::from_minor),
        is_available: true,
        round_limit: limit,
        image_urls: Vec::new(),
        options: Vec::new(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn catalog() -> HashMap<ProductId, Product> {
    [
        product(1, "Sourdough", 12_000, Some(4_000), Some(2)),
        product(2, "Croissant", 6_000, Some(2_000), None),
    ]
    .into_iter()
    .map(|p| (p.id, p))
    .collect()
}

fn request(items: &[(i32, i32)], fulfillment: Fulfillment) -> PlaceOrderRequest {
    PlaceOrderRequest {
        round_id: RoundId::new(7),
        customer_name: "Somchai".into(),
        customer_phone: "0899999999".into(),
        customer_email: None,
        customer_address: Some("1 Sukhumvit Rd".into()),
        fulfillment,
        note: None,
        items: items
            .iter()
            .map(|&(id, quantity)| LineRequest {
                product_id: ProductId::new(id),
                quantity,
                options: BTreeMap::new(),
            })
            .collect(),
    }
}

/// Sold counts as the database reports them: one per order item row.
fn sold_counts(orders: &[NewOrder]) -> HashMap<ProductId, i64> {
    let mut sold = HashMap::new();
    for item in orders.iter().flat_map(|o| &o.items) {
        *sold.entry(item.product_id).or_insert(0) += 1;
    }
    sold
}

#[test]
fn test_round_lifecycle() {
    let (shop, round, products) = (shop(), round(), catalog());
    let now = Utc::now();
    let mut placed = Vec::new();

    let first = plan_order(
        &shop,
        &round,
        &products,
        &sold_counts(&placed),
        request(&[(1, 1), (2, 2)], Fulfillment::Delivery),
        now,
    )
    .unwrap();
    assert_eq!(first.totals.item_count, 3);
    assert_eq!(first.totals.subtotal, Money::from_minor(24_000));
    assert_eq!(first.totals.shipping_fee, Money::from_minor(5_000));
    placed.push(first);

    let second = plan_order(
        &shop,
        &round,
        &products,
        &sold_counts(&placed),
        request(&[(1, 3), (2, 1)], Fulfillment::Pickup),
        now,
    )
    .unwrap();
    assert_eq!(second.totals.shipping_fee, Money::ZERO);
    placed.push(second);

    // Two Sourdough rows against a limit of two: sold out.
    let sold = sold_counts(&placed);
    let stock = compute_stock(Some(2), sold[&ProductId::new(1)]);
    assert_eq!(stock.remaining, Some(0));
    assert!(!stock.is_in_stock);
    assert_eq!(
        plan_order(
            &shop,
            &round,
            &products,
            &sold,
            request(&[(1, 1)], Fulfillment::Pickup),
            now,
        ),
        Err(OrderError::OutOfStock("Sourdough".into()))
    );

    // Both orders paid: build the owner's reports.
    let lines = placed.iter().flat_map(|o| &o.items).map(|item| PurchaseLine {
        product_name: Some(item.product_name.clone()),
        quantity: Some(i64::from(item.quantity)),
        cost_price: products[&item.product_id].cost_price,
    });
    let purchases = aggregate_purchases(lines);
    assert_eq!(purchases.len(), 2);
    assert_eq!(purchases[0].name, "Croissant");
    assert_eq!(purchases[0].total_quantity, 3);
    assert_eq!(purchases[1].name, "Sourdough");
    assert_eq!(purchases[1].total_quantity, 4);

    let paid: Vec<PaidOrderTotals> = placed
        .iter()
        .map(|o| PaidOrderTotals {
            subtotal: o.totals.subtotal,
            shipping_fee: o.totals.shipping_fee,
        })
        .collect();
    let summary = FinanceSummary::compute(&paid, &purchases);
    assert_eq!(summary.order_count, 2);
    assert_eq!(summary.product_revenue, Money::from_minor(66_000));
    assert_eq!(summary.shipping_collected, Money::from_minor(5_000));
    assert_eq!(summary.total_revenue, Money::from_minor(71_000));
    assert_eq!(summary.cost_of_goods, Money::from_minor(22_000));
    assert_eq!(summary.gross_profit, Money::from_minor(44_000));
}

#[test]
fn test_payment_instructions_for_placed_order() {
    let (shop, round, products) = (shop(), round(), catalog());
    let order = plan_order(
        &shop,
        &round,
        &products,
        &HashMap::new(),
        request(&[(2, 1)], Fulfillment::Delivery),
        Utc::now(),
    )
    .unwrap();

    let payment = payment_instructions(&shop.payment, order.totals.total, "https://qr.test/");
    assert_eq!(payment.amount, Money::from_minor(11_000));
    assert_eq!(payment.bank_name.as_deref(), Some("KBank"));

    let payload = payment.promptpay_payload.unwrap();
    assert!(payload.starts_with("000201010212"));
    assert!(payload.contains("0113006681234567"));
    assert!(payload.contains("5406110.00"));
    assert!(payment.qr_image_url.is_some());
}

#[test]
fn test_closed_round_rejects_orders() {
    let (shop, products) = (shop(), catalog());
    let mut round = round();
    round.status = RoundStatus::Closed;

    assert_eq!(
        plan_order(
            &shop,
            &round,
            &products,
            &HashMap::new(),
            request(&[(2, 1)], Fulfillment::Pickup),
            Utc::now(),
        ),
        Err(OrderError::RoundClosed)
    );
}

fn seed_line(name: &str, quantity: i32, cost: i64) -> SeedLine {
    SeedLine {
        product_name: name.into(),
        quantity,
        cost_price: Some(Money::from_minor(cost)),
    }
}

#[tokio::test]
async fn test_reports_count_only_paid_orders_in_scope() {
    let store = MemoryStore::default();
    let owner = UserId::new(500);
    let bakery = store.add_shop(owner);
    let cafe = store.add_shop(owner);
    let round = RoundId::new(7);

    let seeded = [
        (bakery, OrderStatus::Pending, 10_000, 1),
        (bakery, OrderStatus::Cancelled, 20_000, 2),
        (bakery, OrderStatus::PaidWaiting, 12_000, 1),
        (bakery, OrderStatus::Shipped, 24_000, 2),
        (cafe, OrderStatus::Confirmed, 36_000, 3),
        (cafe, OrderStatus::Pending, 48_000, 4),
    ];
    for (shop, status, subtotal, loaves) in seeded {
        store.add_order(
            shop,
            round,
            status,
            Money::from_minor(subtotal),
            Money::from_minor(1_000),
            vec![seed_line("Sourdough", loaves, 4_000)],
        );
    }

    // Bakery only: the paid-waiting and shipped orders.
    let bakery_only = ShopScope::new([bakery]);
    let purchases = round_purchases(&store, round, &bakery_only).await.unwrap();
    assert_eq!(purchases.len(), 1);
    assert_eq!(purchases[0].name, "Sourdough");
    assert_eq!(purchases[0].total_quantity, 3);

    let summary = round_finance(&store, round, &bakery_only).await.unwrap();
    assert_eq!(summary.order_count, 2);
    assert_eq!(summary.product_revenue, Money::from_minor(36_000));
    assert_eq!(summary.shipping_collected, Money::from_minor(2_000));
    assert_eq!(summary.cost_of_goods, Money::from_minor(12_000));
    assert_eq!(summary.gross_profit, Money::from_minor(24_000));

    // Both shops: the cafe's confirmed order joins, its pending one does not.
    let both = ShopScope::new([bakery, cafe]);
    let purchases = round_purchases(&store, round, &both).await.unwrap();
    assert_eq!(purchases[0].total_quantity, 6);

    let summary = round_finance(&store, round, &both).await.unwrap();
    assert_eq!(summary.order_count, 3);
    assert_eq!(summary.product_revenue, Money::from_minor(72_000));
    assert_eq!(summary.shipping_collected, Money::from_minor(3_000));
}

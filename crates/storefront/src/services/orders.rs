//! Order placement rules.
//!
//! [`plan_order`] checks a customer's request against the shop, the round
//! and current stock, snapshots names and prices, and prices the order.
//! It does no I/O; the route loads the inputs and stores the result.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use rounds_core::inventory::compute_stock;
use rounds_core::pricing::{OrderTotals, PricedLine, price_order};
use rounds_core::{Fulfillment, Money, ProductId, RoundId, ShopId};

use crate::models::{Product, Round, Shop};

/// Why an order was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("this shop is not accepting orders")]
    ShopInactive,

    #[error("round does not belong to this shop")]
    RoundNotInShop,

    #[error("round is not open for orders")]
    RoundClosed,

    #[error("order has no items")]
    Empty,

    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("product {0} is not sold by this shop")]
    UnknownProduct(ProductId),

    #[error("{0} is not available")]
    Unavailable(String),

    #[error("{0} is out of stock")]
    OutOfStock(String),

    #[error("invalid options for {0}")]
    InvalidOptions(String),

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("order total is too large")]
    TotalTooLarge,
}

/// One requested line.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: i32,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

/// Public order request body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub round_id: RoundId,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub customer_address: Option<String>,
    pub fulfillment: Fulfillment,
    pub note: Option<String>,
    pub items: Vec<LineRequest>,
}

/// A line ready to insert, with the product snapshot taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub selected_options: BTreeMap<String, String>,
    pub quantity: i32,
    pub unit_price: Money,
    pub line_total: Money,
}

/// An order ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub shop_id: ShopId,
    pub round_id: RoundId,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub customer_address: Option<String>,
    pub fulfillment: Fulfillment,
    pub note: Option<String>,
    pub totals: OrderTotals,
    pub items: Vec<NewOrderItem>,
}

fn required(value: &str, field: &'static str) -> Result<String, OrderError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(OrderError::MissingField(field));
    }
    Ok(value.to_owned())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Validate and price an order.
///
/// `products` holds the shop's products by id and `sold` the per-product
/// sold counts for the round; products absent from `sold` have sold none.
///
/// # Errors
///
/// Returns the first rule the request breaks.
pub fn plan_order(
    shop: &Shop,
    round: &Round,
    products: &HashMap<ProductId, Product>,
    sold: &HashMap<ProductId, i64>,
    request: PlaceOrderRequest,
    now: DateTime<Utc>,
) -> Result<NewOrder, OrderError> {
    if !shop.is_active {
        return Err(OrderError::ShopInactive);
    }
    if round.shop_id != shop.id || round.id != request.round_id {
        return Err(OrderError::RoundNotInShop);
    }
    if !round.accepts_orders_at(now) {
        return Err(OrderError::RoundClosed);
    }
    if request.items.is_empty() {
        return Err(OrderError::Empty);
    }

    let customer_name = required(&request.customer_name, "customer name")?;
    let customer_phone = required(&request.customer_phone, "customer phone")?;
    let customer_address = optional(request.customer_address);
    if request.fulfillment == Fulfillment::Delivery && customer_address.is_none() {
        return Err(OrderError::MissingField("delivery address"));
    }

    let mut items = Vec::with_capacity(request.items.len());
    for line in request.items {
        if line.quantity < 1 {
            return Err(OrderError::InvalidQuantity);
        }
        let product = products
            .get(&line.product_id)
            .filter(|p| p.shop_id == shop.id)
            .ok_or(OrderError::UnknownProduct(line.product_id))?;
        if !product.is_available {
            return Err(OrderError::Unavailable(product.name.clone()));
        }
        let sold_count = sold.get(&product.id).copied().unwrap_or_default();
        // Stock counts order lines, not units: any remaining line admits the
        // whole requested quantity.
        if !compute_stock(product.round_limit, sold_count).is_in_stock {
            return Err(OrderError::OutOfStock(product.name.clone()));
        }
        if !product.accepts_selection(&line.options) {
            return Err(OrderError::InvalidOptions(product.name.clone()));
        }

        let priced = PricedLine {
            quantity: i64::from(line.quantity),
            unit_price: product.price,
        };
        items.push(NewOrderItem {
            product_id: product.id,
            product_name: product.name.clone(),
            selected_options: line.options,
            quantity: line.quantity,
            unit_price: product.price,
            line_total: priced.line_total(),
        });
    }

    let priced: Vec<PricedLine> = items
        .iter()
        .map(|item| PricedLine {
            quantity: i64::from(item.quantity),
            unit_price: item.unit_price,
        })
        .collect();
    let totals = price_order(&priced, &shop.shipping_rates, request.fulfillment);
    // Every stored amount is at most the total.
    if !totals.total.fits_storage() {
        return Err(OrderError::TotalTooLarge);
    }

    Ok(NewOrder {
        shop_id: shop.id,
        round_id: round.id,
        customer_name,
        customer_phone,
        customer_email: optional(request.customer_email),
        customer_address,
        fulfillment: request.fulfillment,
        note: optional(request.note),
        totals,
        items,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rounds_core::pricing::ShippingRate;
    use rounds_core::{RoundStatus, Slug, UserId};

    use super::*;
    use crate::models::{PaymentInfo, ProductOption};

    fn shop() -> Shop {
        Shop {
            id: ShopId::new(1),
            owner_id: UserId::new(1),
            name: "Bakery".into(),
            slug: Slug::parse("bakery").unwrap(),
            description: None,
            is_active: true,
            payment: PaymentInfo::default(),
            shipping_rates: vec![
                ShippingRate {
                    min_items: 1,
                    fee: Money::from_minor(5_000),
                },
                ShippingRate {
                    min_items: 5,
                    fee: Money::ZERO,
                },
            ],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn round() -> Round {
        Round {
            id: RoundId::new(7),
            shop_id: ShopId::new(1),
            name: "Week 1".into(),
            opens_at: None,
            closes_at: None,
            shipping_date: None,
            pickup_date: None,
            status: RoundStatus::Open,
            created_at: Utc::now(),
        }
    }

    fn product(id: i32, price: i64, limit: Option<i32>) -> Product {
        Product {
            id: ProductId::new(id),
            shop_id: ShopId::new(1),
            name: format!("Product {id}"),
            description: None,
            price: Money::from_minor(price),
            cost_price: None,
            is_available: true,
            round_limit: limit,
            image_urls: vec![],
            options: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn catalog(products: Vec<Product>) -> HashMap<ProductId, Product> {
        products.into_iter().map(|p| (p.id, p)).collect()
    }

    fn request(items: Vec<(i32, i32)>, fulfillment: Fulfillment) -> PlaceOrderRequest {
        PlaceOrderRequest {
            round_id: RoundId::new(7),
            customer_name: " Nok ".into(),
            customer_phone: "0812345678".into(),
            customer_email: Some(String::new()),
            customer_address: Some("1 Sukhumvit".into()),
            fulfillment,
            note: None,
            items: items
                .into_iter()
                .map(|(id, quantity)| LineRequest {
                    product_id: ProductId::new(id),
                    quantity,
                    options: BTreeMap::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_delivery_order_is_priced_with_shipping() {
        let products = catalog(vec![product(1, 12_000, None), product(2, 4_550, None)]);
        let order = plan_order(
            &shop(),
            &round(),
            &products,
            &HashMap::new(),
            request(vec![(1, 2), (2, 1)], Fulfillment::Delivery),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(order.customer_name, "Nok");
        assert_eq!(order.customer_email, None);
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[0].line_total, Money::from_minor(24_000));
        assert_eq!(order.totals.subtotal, Money::from_minor(28_550));
        assert_eq!(order.totals.shipping_fee, Money::from_minor(5_000));
        assert_eq!(order.totals.total, Money::from_minor(33_550));
    }

    #[test]
    fn test_pickup_has_no_shipping_fee() {
        let products = catalog(vec![product(1, 10_000, None)]);
        let order = plan_order(
            &shop(),
            &round(),
            &products,
            &HashMap::new(),
            request(vec![(1, 1)], Fulfillment::Pickup),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(order.totals.shipping_fee, Money::ZERO);
        assert_eq!(order.totals.total, Money::from_minor(10_000));
    }

    #[test]
    fn test_out_of_stock_product_is_refused() {
        let products = catalog(vec![product(1, 10_000, Some(3))]);
        let sold = HashMap::from([(ProductId::new(1), 3)]);
        let err = plan_order(
            &shop(),
            &round(),
            &products,
            &sold,
            request(vec![(1, 1)], Fulfillment::Pickup),
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, OrderError::OutOfStock("Product 1".into()));
    }

    #[test]
    fn test_last_remaining_line_takes_any_quantity() {
        let products = catalog(vec![product(1, 10_000, Some(3))]);
        let sold = HashMap::from([(ProductId::new(1), 2)]);
        let order = plan_order(
            &shop(),
            &round(),
            &products,
            &sold,
            request(vec![(1, 5)], Fulfillment::Pickup),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(order.items[0].quantity, 5);
        assert_eq!(order.totals.subtotal, Money::from_minor(50_000));
    }

    #[test]
    fn test_total_beyond_column_range_is_refused() {
        let products = catalog(vec![product(1, 999_999_999_999, None)]);
        let plan = |quantity| {
            plan_order(
                &shop(),
                &round(),
                &products,
                &HashMap::new(),
                request(vec![(1, quantity)], Fulfillment::Pickup),
                Utc::now(),
            )
        };
        assert!(plan(1).is_ok());
        assert_eq!(plan(2).unwrap_err(), OrderError::TotalTooLarge);
    }

    #[test]
    fn test_request_rules() {
        let products = catalog(vec![product(1, 10_000, None)]);
        let plan = |req| {
            plan_order(&shop(), &round(), &products, &HashMap::new(), req, Utc::now())
        };

        assert_eq!(
            plan(request(vec![], Fulfillment::Pickup)).unwrap_err(),
            OrderError::Empty
        );
        assert_eq!(
            plan(request(vec![(1, 0)], Fulfillment::Pickup)).unwrap_err(),
            OrderError::InvalidQuantity
        );
        assert_eq!(
            plan(request(vec![(9, 1)], Fulfillment::Pickup)).unwrap_err(),
            OrderError::UnknownProduct(ProductId::new(9))
        );

        let mut no_address = request(vec![(1, 1)], Fulfillment::Delivery);
        no_address.customer_address = Some("  ".into());
        assert_eq!(
            plan(no_address).unwrap_err(),
            OrderError::MissingField("delivery address")
        );
    }

    #[test]
    fn test_closed_round_and_inactive_shop() {
        let products = catalog(vec![product(1, 10_000, None)]);
        let mut closed = round();
        closed.status = RoundStatus::Closed;
        assert_eq!(
            plan_order(
                &shop(),
                &closed,
                &products,
                &HashMap::new(),
                request(vec![(1, 1)], Fulfillment::Pickup),
                Utc::now(),
            )
            .unwrap_err(),
            OrderError::RoundClosed
        );

        let mut inactive = shop();
        inactive.is_active = false;
        assert_eq!(
            plan_order(
                &inactive,
                &round(),
                &products,
                &HashMap::new(),
                request(vec![(1, 1)], Fulfillment::Pickup),
                Utc::now(),
            )
            .unwrap_err(),
            OrderError::ShopInactive
        );
    }

    #[test]
    fn test_options_must_match_product() {
        let mut tee = product(1, 25_000, None);
        tee.options = vec![ProductOption {
            name: "Size".into(),
            choices: vec!["S".into(), "M".into()],
        }];
        let products = catalog(vec![tee]);

        let mut req = request(vec![(1, 1)], Fulfillment::Pickup);
        assert_eq!(
            plan_order(&shop(), &round(), &products, &HashMap::new(), req.clone(), Utc::now())
                .unwrap_err(),
            OrderError::InvalidOptions("Product 1".into())
        );

        req.items[0].options.insert("Size".into(), "M".into());
        let order =
            plan_order(&shop(), &round(), &products, &HashMap::new(), req, Utc::now()).unwrap();
        assert_eq!(order.items[0].selected_options["Size"], "M");
    }
}

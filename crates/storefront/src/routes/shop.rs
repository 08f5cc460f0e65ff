//! Public shop page.
//!
//! The same data backs the HTML page at `/s/{slug}` and the JSON at
//! `/api/shops/{slug}`. Stock is attached for the shop's current open round.

use std::sync::Arc;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use serde::Serialize;

use rounds_core::inventory::{StockLevel, compute_stock};
use rounds_core::pricing::ShippingRate;
use rounds_core::{Money, ProductId};

use crate::db::{ProductRepository, ReportRepository, RoundRepository, ShopRepository};
use crate::error::{AppError, Result};
use crate::models::{Product, ProductOption, Round, Shop};
use crate::state::AppState;

/// Shop fields safe to show customers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicShop {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub shipping_rates: Vec<ShippingRate>,
}

/// A product as customers see it. Cost price is never included.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProduct {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub image_urls: Vec<String>,
    pub options: Vec<ProductOption>,
    /// Stock for the open round; absent when no round is open.
    pub stock: Option<StockLevel>,
}

impl PublicProduct {
    fn new(product: Product, stock: Option<StockLevel>) -> Self {
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price,
            image_urls: product.image_urls,
            options: product.options,
            stock,
        }
    }

    /// Whether customers can add this product right now.
    #[must_use]
    pub fn can_order(&self) -> bool {
        self.stock.is_some_and(|s| s.is_in_stock)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ShopPage {
    pub shop: PublicShop,
    pub round: Option<Round>,
    pub products: Vec<PublicProduct>,
}

#[derive(Template, WebTemplate)]
#[template(path = "shop.html")]
pub struct ShopTemplate {
    pub page: ShopPage,
}

/// Look up an active shop by slug through the cache.
///
/// # Errors
///
/// `AppError::NotFound` for unknown or inactive shops.
pub async fn load_public_shop(state: &AppState, slug: &str) -> Result<Arc<Shop>> {
    let shops = ShopRepository::new(state.pool());
    state
        .shop_cache()
        .get_or_load(slug, || shops.get_by_slug(slug))
        .await?
        .filter(|shop| shop.is_active)
        .ok_or_else(|| AppError::NotFound("Shop not found".to_owned()))
}

async fn shop_page(state: &AppState, slug: &str) -> Result<ShopPage> {
    let shop = load_public_shop(state, slug).await?;

    let round = RoundRepository::new(state.pool())
        .current_open(shop.id, Utc::now())
        .await?;
    let products = ProductRepository::new(state.pool())
        .list_for_shop(shop.id, true)
        .await?;

    let products = if let Some(round) = &round {
        let sold = ReportRepository::new(state.pool())
            .sold_counts(round.id)
            .await?;
        products
            .into_iter()
            .map(|p| {
                let stock = compute_stock(p.round_limit, sold.get(&p.id).copied().unwrap_or(0));
                PublicProduct::new(p, Some(stock))
            })
            .collect()
    } else {
        products
            .into_iter()
            .map(|p| PublicProduct::new(p, None))
            .collect()
    };

    Ok(ShopPage {
        shop: PublicShop {
            name: shop.name.clone(),
            slug: shop.slug.to_string(),
            description: shop.description.clone(),
            shipping_rates: shop.shipping_rates.clone(),
        },
        round,
        products,
    })
}

/// `GET /s/{slug}`
pub async fn page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<ShopTemplate> {
    Ok(ShopTemplate {
        page: shop_page(&state, &slug).await?,
    })
}

/// `GET /api/shops/{slug}`
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ShopPage>> {
    Ok(Json(shop_page(&state, &slug).await?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Utc;
    use rounds_core::ShopId;

    use super::*;

    fn product(limit: Option<i32>) -> Product {
        Product {
            id: ProductId::new(7),
            shop_id: ShopId::new(1),
            name: "Tote".into(),
            description: None,
            price: Money::from_minor(19_000),
            cost_price: Some(Money::from_minor(8_000)),
            is_available: true,
            round_limit: limit,
            image_urls: vec![],
            options: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_public_product_hides_cost_price() {
        let json = serde_json::to_value(PublicProduct::new(product(None), None)).unwrap();
        assert!(json.get("costPrice").is_none());
        assert_eq!(json["stock"], serde_json::Value::Null);
    }

    #[test]
    fn test_can_order_requires_open_round_and_stock() {
        assert!(!PublicProduct::new(product(None), None).can_order());
        assert!(PublicProduct::new(product(None), Some(compute_stock(None, 3))).can_order());
        assert!(!PublicProduct::new(product(Some(2)), Some(compute_stock(Some(2), 2))).can_order());
    }

    #[test]
    fn test_shop_template_lists_products() {
        let page = ShopPage {
            shop: PublicShop {
                name: "Bakery <Bee>".into(),
                slug: "bakery-bee".into(),
                description: None,
                shipping_rates: vec![],
            },
            round: None,
            products: vec![PublicProduct::new(product(None), None)],
        };
        let html = ShopTemplate { page }.render().unwrap();
        assert!(html.contains("Tote"));
        assert!(html.contains("Bakery &#60;Bee&#62;") || html.contains("Bakery &lt;Bee&gt;"));
    }
}

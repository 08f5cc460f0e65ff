//! Product management.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
};
use serde::Deserialize;

use rounds_core::{Money, ProductId, ShopId};

use super::{bad_request, not_found, nullable, optional, required};
use crate::db::ProductRepository;
use crate::db::products::NewProduct;
use crate::error::Result;
use crate::middleware::RequireShopScope;
use crate::models::{Product, ProductOption};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list).post(create))
        .route("/products/{id}", patch(update).delete(delete))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub shop_id: Option<ShopId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub shop_id: ShopId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub cost_price: Option<Money>,
    #[serde(default = "default_available")]
    pub is_available: bool,
    pub round_limit: Option<i32>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub options: Vec<ProductOption>,
}

const fn default_available() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub price: Option<Money>,
    #[serde(default, deserialize_with = "nullable")]
    pub cost_price: Option<Option<Money>>,
    pub is_available: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub round_limit: Option<Option<i32>>,
    pub image_urls: Option<Vec<String>>,
    pub options: Option<Vec<ProductOption>>,
}

fn check_price(price: Money, field: &str) -> Result<Money> {
    if price.is_negative() {
        return Err(bad_request(format!("{field} cannot be negative")));
    }
    if !price.fits_storage() {
        return Err(bad_request(format!("{field} is too large")));
    }
    Ok(price.rounded())
}

fn check_limit(limit: Option<i32>) -> Result<Option<i32>> {
    match limit {
        Some(n) if n < 0 => Err(bad_request("round limit cannot be negative")),
        other => Ok(other),
    }
}

/// Trim option names and choices; every option needs a name and at least
/// one choice, and names must be unique.
fn clean_options(options: Vec<ProductOption>) -> Result<Vec<ProductOption>> {
    let mut cleaned: Vec<ProductOption> = Vec::with_capacity(options.len());
    for option in options {
        let name = required(&option.name, "option name")?;
        let choices: Vec<String> = option
            .choices
            .iter()
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty())
            .collect();
        if choices.is_empty() {
            return Err(bad_request(format!("option {name} needs at least one choice")));
        }
        if cleaned.iter().any(|o| o.name == name) {
            return Err(bad_request(format!("duplicate option {name}")));
        }
        cleaned.push(ProductOption { name, choices });
    }
    Ok(cleaned)
}

impl UpdateProductRequest {
    fn apply(self, product: &mut Product) -> Result<()> {
        if let Some(name) = self.name {
            product.name = required(&name, "name")?;
        }
        if let Some(description) = self.description {
            product.description = optional(description);
        }
        if let Some(price) = self.price {
            product.price = check_price(price, "price")?;
        }
        if let Some(cost_price) = self.cost_price {
            product.cost_price = cost_price.map(|c| check_price(c, "cost price")).transpose()?;
        }
        if let Some(is_available) = self.is_available {
            product.is_available = is_available;
        }
        if let Some(limit) = self.round_limit {
            product.round_limit = check_limit(limit)?;
        }
        if let Some(image_urls) = self.image_urls {
            product.image_urls = image_urls;
        }
        if let Some(options) = self.options {
            product.options = clean_options(options)?;
        }
        Ok(())
    }
}

async fn product_in_scope(
    products: &ProductRepository<'_>,
    id: ProductId,
    scope: &rounds_core::scope::ShopScope,
) -> Result<Product> {
    products
        .get(id)
        .await?
        .filter(|p| scope.contains(p.shop_id))
        .ok_or_else(|| not_found("Product"))
}

/// `GET /api/admin/products?shopId=`
pub async fn list(
    State(state): State<AppState>,
    RequireShopScope { scope, .. }: RequireShopScope,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>> {
    let mut products = ProductRepository::new(state.pool()).list(&scope).await?;
    if let Some(shop_id) = query.shop_id {
        products.retain(|p| p.shop_id == shop_id);
    }
    Ok(Json(products))
}

/// `POST /api/admin/products`
pub async fn create(
    State(state): State<AppState>,
    RequireShopScope { scope, .. }: RequireShopScope,
    Json(body): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    if !scope.contains(body.shop_id) {
        return Err(not_found("Shop"));
    }

    let new_product = NewProduct {
        name: required(&body.name, "name")?,
        description: optional(body.description),
        price: check_price(body.price, "price")?,
        cost_price: body
            .cost_price
            .map(|c| check_price(c, "cost price"))
            .transpose()?,
        is_available: body.is_available,
        round_limit: check_limit(body.round_limit)?,
        image_urls: body.image_urls,
        options: clean_options(body.options)?,
    };

    let product = ProductRepository::new(state.pool())
        .create(body.shop_id, &new_product)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// `PATCH /api/admin/products/{id}`
pub async fn update(
    State(state): State<AppState>,
    RequireShopScope { scope, .. }: RequireShopScope,
    Path(id): Path<ProductId>,
    Json(body): Json<UpdateProductRequest>,
) -> Result<Json<Product>> {
    let products = ProductRepository::new(state.pool());
    let mut product = product_in_scope(&products, id, &scope).await?;

    body.apply(&mut product)?;
    Ok(Json(products.update(&product).await?))
}

/// `DELETE /api/admin/products/{id}`
pub async fn delete(
    State(state): State<AppState>,
    RequireShopScope { scope, .. }: RequireShopScope,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    let products = ProductRepository::new(state.pool());
    let product = product_in_scope(&products, id, &scope).await?;

    products.delete(product.id).await?;
    tracing::info!(product_id = %product.id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

//! Shop management.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;

use rounds_core::pricing::{ShippingRate, normalize_shipping_rates};
use rounds_core::{ShopId, Slug};

use super::{bad_request, not_found, nullable, optional, required};
use crate::db::ShopRepository;
use crate::db::shops::NewShop;
use crate::error::Result;
use crate::middleware::RequireShopScope;
use crate::models::{PaymentInfo, Shop};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/shops", get(list).post(create))
        .route("/shops/{id}", get(show).patch(update))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShopRequest {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    #[serde(default)]
    pub payment: PaymentInfo,
    #[serde(default)]
    pub shipping_rates: Vec<ShippingRate>,
}

/// Partial update. The slug cannot be changed.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateShopRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub payment: Option<PaymentInfo>,
    pub shipping_rates: Option<Vec<ShippingRate>>,
}

fn clean_payment(payment: PaymentInfo) -> PaymentInfo {
    PaymentInfo {
        bank_name: optional(payment.bank_name),
        account_name: optional(payment.account_name),
        account_number: optional(payment.account_number),
        promptpay_id: optional(payment.promptpay_id),
    }
}

impl UpdateShopRequest {
    fn apply(self, shop: &mut Shop) -> Result<()> {
        if let Some(name) = self.name {
            shop.name = required(&name, "name")?;
        }
        if let Some(description) = self.description {
            shop.description = optional(description);
        }
        if let Some(is_active) = self.is_active {
            shop.is_active = is_active;
        }
        if let Some(payment) = self.payment {
            shop.payment = clean_payment(payment);
        }
        if let Some(rates) = self.shipping_rates {
            shop.shipping_rates = normalize_shipping_rates(rates).map_err(bad_request)?;
        }
        Ok(())
    }
}

/// `GET /api/admin/shops`
pub async fn list(
    State(state): State<AppState>,
    RequireShopScope { scope, .. }: RequireShopScope,
) -> Result<Json<Vec<Shop>>> {
    Ok(Json(ShopRepository::new(state.pool()).list(&scope).await?))
}

/// `POST /api/admin/shops`
pub async fn create(
    State(state): State<AppState>,
    RequireShopScope { user, .. }: RequireShopScope,
    Json(body): Json<CreateShopRequest>,
) -> Result<(StatusCode, Json<Shop>)> {
    let new_shop = NewShop {
        name: required(&body.name, "name")?,
        slug: Slug::parse(body.slug.trim()).map_err(bad_request)?,
        description: optional(body.description),
        payment: clean_payment(body.payment),
        shipping_rates: normalize_shipping_rates(body.shipping_rates).map_err(bad_request)?,
    };

    let shop = ShopRepository::new(state.pool())
        .create(user.id, &new_shop)
        .await?;
    tracing::info!(shop_id = %shop.id, slug = %shop.slug, owner_id = %user.id, "Shop created");

    Ok((StatusCode::CREATED, Json(shop)))
}

/// `GET /api/admin/shops/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireShopScope { scope, .. }: RequireShopScope,
    Path(id): Path<ShopId>,
) -> Result<Json<Shop>> {
    if !scope.contains(id) {
        return Err(not_found("Shop"));
    }
    ShopRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Shop"))
}

/// `PATCH /api/admin/shops/{id}`
pub async fn update(
    State(state): State<AppState>,
    RequireShopScope { scope, .. }: RequireShopScope,
    Path(id): Path<ShopId>,
    Json(body): Json<UpdateShopRequest>,
) -> Result<Json<Shop>> {
    if !scope.contains(id) {
        return Err(not_found("Shop"));
    }
    let shops = ShopRepository::new(state.pool());
    let mut shop = shops.get(id).await?.ok_or_else(|| not_found("Shop"))?;

    body.apply(&mut shop)?;
    let shop = shops.update(&shop).await?;
    state.shop_cache().invalidate(shop.slug.as_str()).await;

    Ok(Json(shop))
}

//! The owner's selected-shop preference.

use axum::{Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use rounds_core::scope::{ShopScope, ShopSelection};
use rounds_core::{ShopId, Slug};

use crate::db::ShopRepository;
use crate::error::Result;
use crate::middleware::RequireShopScope;
use crate::models::CurrentUser;
use crate::services::scope::{OwnedShops, PreferenceStore, SessionPreferences, select_shop};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/selection", get(show).put(update))
}

/// An owned shop as listed in the shop switcher.
#[derive(Debug, Serialize)]
pub struct ShopChoice {
    pub id: ShopId,
    pub name: String,
    pub slug: Slug,
}

#[derive(Debug, Serialize)]
pub struct SelectionResponse {
    /// The stored preference, `"all"` when none is stored.
    pub selection: ShopSelection,
    /// Shops the next owner request will be scoped to.
    pub scope: ShopScope,
    /// Every shop the owner holds.
    pub shops: Vec<ShopChoice>,
}

#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    pub selection: ShopSelection,
}

async fn respond(
    state: &AppState,
    user: &CurrentUser,
    selection: ShopSelection,
    scope: ShopScope,
) -> Result<Json<SelectionResponse>> {
    let shops = ShopRepository::new(state.pool());
    let owned = shops.owned_shop_ids(user.id).await?;
    let shops = shops
        .list(&ShopScope::new(owned))
        .await?
        .into_iter()
        .map(|shop| ShopChoice {
            id: shop.id,
            name: shop.name,
            slug: shop.slug,
        })
        .collect();

    Ok(Json(SelectionResponse {
        selection,
        scope,
        shops,
    }))
}

/// `GET /api/admin/selection`
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireShopScope { user, scope }: RequireShopScope,
) -> Result<Json<SelectionResponse>> {
    let selection = SessionPreferences::new(&session)
        .selection()
        .await?
        .unwrap_or_default();
    respond(&state, &user, selection, scope).await
}

/// `PUT /api/admin/selection`
///
/// Naming a shop the owner does not hold answers 404 and keeps the old
/// preference.
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireShopScope { user, .. }: RequireShopScope,
    Json(body): Json<SelectionRequest>,
) -> Result<Json<SelectionResponse>> {
    let scope = select_shop(
        Some(&user),
        &ShopRepository::new(state.pool()),
        &SessionPreferences::new(&session),
        body.selection,
    )
    .await?;
    tracing::info!(user_id = %user.id, selection = %body.selection.to_preference(), "Shop selection changed");

    respond(&state, &user, body.selection, scope).await
}

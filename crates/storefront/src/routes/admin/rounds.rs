//! Round management and the per-round reports: purchase list, stock and
//! finance summary.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use rounds_core::finance::FinanceSummary;
use rounds_core::inventory::{PurchaseRow, StockLevel, compute_stock};
use rounds_core::scope::ShopScope;
use rounds_core::{ProductId, RoundId, RoundStatus, ShopId};

use super::{bad_request, not_found, nullable, required};
use crate::db::rounds::NewRound;
use crate::db::{ProductRepository, ReportRepository, RoundRepository};
use crate::error::Result;
use crate::middleware::RequireShopScope;
use crate::models::Round;
use crate::services::reports::{round_finance, round_purchases};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rounds", get(list).post(create))
        .route("/rounds/{id}", patch(update))
        .route("/rounds/{id}/purchases", get(purchases))
        .route("/rounds/{id}/stock", get(stock))
        .route("/rounds/{id}/finance", get(finance))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoundRequest {
    pub shop_id: ShopId,
    pub name: String,
    pub opens_at: Option<DateTime<Utc>>,
    pub closes_at: Option<DateTime<Utc>>,
    pub shipping_date: Option<NaiveDate>,
    pub pickup_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoundRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub opens_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub closes_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub shipping_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable")]
    pub pickup_date: Option<Option<NaiveDate>>,
    pub status: Option<RoundStatus>,
}

/// Stock of one product in a round.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStock {
    pub product_id: ProductId,
    pub name: String,
    pub round_limit: Option<i32>,
    #[serde(flatten)]
    pub stock: StockLevel,
}

fn check_window(opens_at: Option<DateTime<Utc>>, closes_at: Option<DateTime<Utc>>) -> Result<()> {
    if let (Some(opens), Some(closes)) = (opens_at, closes_at)
        && closes <= opens
    {
        return Err(bad_request("closing time must be after opening time"));
    }
    Ok(())
}

impl UpdateRoundRequest {
    fn apply(self, round: &mut Round) -> Result<()> {
        if let Some(name) = self.name {
            round.name = required(&name, "name")?;
        }
        if let Some(opens_at) = self.opens_at {
            round.opens_at = opens_at;
        }
        if let Some(closes_at) = self.closes_at {
            round.closes_at = closes_at;
        }
        if let Some(shipping_date) = self.shipping_date {
            round.shipping_date = shipping_date;
        }
        if let Some(pickup_date) = self.pickup_date {
            round.pickup_date = pickup_date;
        }
        if let Some(status) = self.status {
            round.status = status;
        }
        check_window(round.opens_at, round.closes_at)
    }
}

async fn round_in_scope(state: &AppState, id: RoundId, scope: &ShopScope) -> Result<Round> {
    RoundRepository::new(state.pool())
        .get_in_scope(id, scope)
        .await?
        .ok_or_else(|| not_found("Round"))
}

/// `GET /api/admin/rounds`
pub async fn list(
    State(state): State<AppState>,
    RequireShopScope { scope, .. }: RequireShopScope,
) -> Result<Json<Vec<Round>>> {
    Ok(Json(RoundRepository::new(state.pool()).list(&scope).await?))
}

/// `POST /api/admin/rounds`
pub async fn create(
    State(state): State<AppState>,
    RequireShopScope { scope, .. }: RequireShopScope,
    Json(body): Json<CreateRoundRequest>,
) -> Result<(StatusCode, Json<Round>)> {
    if !scope.contains(body.shop_id) {
        return Err(not_found("Shop"));
    }
    check_window(body.opens_at, body.closes_at)?;

    let new_round = NewRound {
        name: required(&body.name, "name")?,
        opens_at: body.opens_at,
        closes_at: body.closes_at,
        shipping_date: body.shipping_date,
        pickup_date: body.pickup_date,
    };
    let round = RoundRepository::new(state.pool())
        .create(body.shop_id, &new_round)
        .await?;
    tracing::info!(round_id = %round.id, shop_id = %round.shop_id, "Round created");

    Ok((StatusCode::CREATED, Json(round)))
}

/// `PATCH /api/admin/rounds/{id}`
pub async fn update(
    State(state): State<AppState>,
    RequireShopScope { scope, .. }: RequireShopScope,
    Path(id): Path<RoundId>,
    Json(body): Json<UpdateRoundRequest>,
) -> Result<Json<Round>> {
    let mut round = round_in_scope(&state, id, &scope).await?;
    body.apply(&mut round)?;
    Ok(Json(RoundRepository::new(state.pool()).update(&round).await?))
}

/// `GET /api/admin/rounds/{id}/purchases`
///
/// What to buy for the round: paid line items grouped by product name.
pub async fn purchases(
    State(state): State<AppState>,
    RequireShopScope { scope, .. }: RequireShopScope,
    Path(id): Path<RoundId>,
) -> Result<Json<Vec<PurchaseRow>>> {
    let round = round_in_scope(&state, id, &scope).await?;
    let reports = ReportRepository::new(state.pool());
    Ok(Json(round_purchases(&reports, round.id, &scope).await?))
}

/// `GET /api/admin/rounds/{id}/stock`
pub async fn stock(
    State(state): State<AppState>,
    RequireShopScope { scope, .. }: RequireShopScope,
    Path(id): Path<RoundId>,
) -> Result<Json<Vec<ProductStock>>> {
    let round = round_in_scope(&state, id, &scope).await?;
    let products = ProductRepository::new(state.pool())
        .list_for_shop(round.shop_id, false)
        .await?;
    let sold = ReportRepository::new(state.pool())
        .sold_counts(round.id)
        .await?;

    Ok(Json(
        products
            .into_iter()
            .map(|p| ProductStock {
                stock: compute_stock(p.round_limit, sold.get(&p.id).copied().unwrap_or(0)),
                product_id: p.id,
                name: p.name,
                round_limit: p.round_limit,
            })
            .collect(),
    ))
}

/// `GET /api/admin/rounds/{id}/finance`
pub async fn finance(
    State(state): State<AppState>,
    RequireShopScope { scope, .. }: RequireShopScope,
    Path(id): Path<RoundId>,
) -> Result<Json<FinanceSummary>> {
    let round = round_in_scope(&state, id, &scope).await?;
    let reports = ReportRepository::new(state.pool());
    Ok(Json(round_finance(&reports, round.id, &scope).await?))
}

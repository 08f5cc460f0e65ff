//! Public order routes: placement, tracking, slip upload and payment details.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use rounds_core::OrderStatus;
use rounds_core::pricing::OrderTotals;

use super::shop::load_public_shop;
use crate::db::{OrderRepository, ProductRepository, ReportRepository, RoundRepository, ShopRepository};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::{Order, OrderItem};
use crate::services::UploadKind;
use crate::services::orders::{OrderError, PlaceOrderRequest, plan_order};
use crate::services::payment::{PaymentInstructions, payment_instructions};
use crate::state::AppState;

/// Multipart field carrying the payment slip image.
pub const SLIP_FIELD: &str = "slip";

/// Response to a successful order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    pub tracking_code: Uuid,
    pub status: OrderStatus,
    pub totals: OrderTotals,
    pub payment: PaymentInstructions,
}

/// An order with its line items.
#[derive(Debug, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

async fn order_by_code(state: &AppState, code: Uuid) -> Result<Order> {
    OrderRepository::new(state.pool())
        .get_by_code(code)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_owned()))
}

/// `POST /api/shops/{slug}/orders`
pub async fn place(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<PlacedOrder>)> {
    let shop = load_public_shop(&state, &slug).await?;

    let round = RoundRepository::new(state.pool())
        .get(request.round_id)
        .await?
        .ok_or(OrderError::RoundNotInShop)?;

    let products: HashMap<_, _> = ProductRepository::new(state.pool())
        .list_for_shop(shop.id, false)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    let sold = ReportRepository::new(state.pool())
        .sold_counts(round.id)
        .await?;

    let new_order = plan_order(&shop, &round, &products, &sold, request, Utc::now())?;
    let order = OrderRepository::new(state.pool()).create(&new_order).await?;

    add_breadcrumb(
        "order",
        "Order placed",
        &[
            ("shop", shop.slug.as_str()),
            ("tracking_code", &order.tracking_code.to_string()),
        ],
    );

    let payment = payment_instructions(
        &shop.payment,
        order.total,
        &state.config().qr_image_base_url,
    );

    Ok((
        StatusCode::CREATED,
        Json(PlacedOrder {
            tracking_code: order.tracking_code,
            status: order.status,
            totals: new_order.totals,
            payment,
        }),
    ))
}

/// `GET /api/orders/{code}`
pub async fn track(
    State(state): State<AppState>,
    Path(code): Path<Uuid>,
) -> Result<Json<OrderWithItems>> {
    let order = order_by_code(&state, code).await?;
    let items = OrderRepository::new(state.pool()).items(order.id).await?;
    Ok(Json(OrderWithItems { order, items }))
}

/// `POST /api/orders/{code}/slip`
///
/// Accepts the slip only while the order is `PENDING`.
pub async fn upload_slip(
    State(state): State<AppState>,
    Path(code): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<Order>> {
    let order = order_by_code(&state, code).await?;
    if order.status != OrderStatus::Pending {
        return Err(AppError::BadRequest(
            "This order is not waiting for payment".to_owned(),
        ));
    }

    let mut slip = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid upload: {e}")))?
    {
        if field.name() != Some(SLIP_FIELD) {
            continue;
        }
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid upload: {e}")))?;
        slip = Some((content_type, bytes));
        break;
    }
    let (content_type, bytes) =
        slip.ok_or_else(|| AppError::BadRequest("A payment slip image is required".to_owned()))?;

    let slip_url = state
        .uploads()
        .store_image(UploadKind::PaymentSlip, content_type.as_deref(), &bytes)
        .await?;

    // Another upload may have won the race since the status check above.
    let order = match OrderRepository::new(state.pool())
        .mark_slip_uploaded(code, &slip_url, Utc::now())
        .await
    {
        Ok(Some(order)) => order,
        marked => {
            state.uploads().discard(&slip_url).await;
            return Err(marked.err().map_or_else(
                || AppError::BadRequest("This order is not waiting for payment".to_owned()),
                AppError::from,
            ));
        }
    };

    tracing::info!(order_id = %order.id, "Payment slip uploaded");
    Ok(Json(order))
}

/// `GET /api/orders/{code}/payment`
pub async fn payment(
    State(state): State<AppState>,
    Path(code): Path<Uuid>,
) -> Result<Json<PaymentInstructions>> {
    let order = order_by_code(&state, code).await?;
    let shop = ShopRepository::new(state.pool())
        .get(order.shop_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Shop not found".to_owned()))?;

    Ok(Json(payment_instructions(
        &shop.payment,
        order.total,
        &state.config().qr_image_base_url,
    )))
}

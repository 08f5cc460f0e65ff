//! Product image uploads.

use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    routing::post,
};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::services::UploadKind;
use crate::state::AppState;

/// Multipart field carrying the image.
pub const FILE_FIELD: &str = "file";

pub fn router() -> Router<AppState> {
    Router::new().route("/uploads", post(upload))
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// `POST /api/admin/uploads`
pub async fn upload(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid upload: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid upload: {e}")))?;

        let url = state
            .uploads()
            .store_image(UploadKind::ProductImage, content_type.as_deref(), &bytes)
            .await?;
        tracing::info!(user_id = %user.id, url = %url, "Product image uploaded");

        return Ok((StatusCode::CREATED, Json(UploadResponse { url })));
    }

    Err(AppError::BadRequest("An image file is required".to_owned()))
}

//! Owner dashboard API.
//!
//! Every handler here takes [`RequireShopScope`](crate::middleware::RequireShopScope)
//! and only reads or writes rows whose shop is in the resolved scope. Rows
//! outside the scope answer 404, the same as rows that do not exist.

pub mod orders;
pub mod products;
pub mod rounds;
pub mod selection;
pub mod shops;
pub mod uploads;

use std::fmt::Display;

use axum::Router;
use serde::{Deserialize, Deserializer};

use crate::error::AppError;
use crate::state::AppState;

/// Build the complete owner API router, mounted at `/api/admin`.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(shops::router())
        .merge(products::router())
        .merge(rounds::router())
        .merge(orders::router())
        .merge(selection::router())
        .merge(uploads::router())
}

fn bad_request(err: impl Display) -> AppError {
    AppError::BadRequest(err.to_string())
}

fn not_found(what: &str) -> AppError {
    AppError::NotFound(format!("{what} not found"))
}

/// Trim a required text field.
fn required(value: &str, field: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(value.to_owned())
}

/// Trim an optional text field; blank becomes `None`.
fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Deserialize a PATCH field that may be absent, `null`, or a value.
///
/// Absent stays `None` (leave unchanged); `null` becomes `Some(None)`
/// (clear the field).
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

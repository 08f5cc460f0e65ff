//! Shop scope extractor for owner routes.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use rounds_core::scope::ShopScope;

use super::auth::RequireAuth;
use crate::db::ShopRepository;
use crate::error::AppError;
use crate::models::CurrentUser;
use crate::services::scope::{SessionPreferences, resolve_accessible_shops};
use crate::state::AppState;

/// The signed-in owner and the shops this request may touch.
///
/// Rejects with 401 when nobody is signed in. An owner without shops gets
/// an empty scope.
pub struct RequireShopScope {
    pub user: CurrentUser,
    pub scope: ShopScope,
}

impl FromRequestParts<AppState> for RequireShopScope {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AppError::Internal("session layer missing".to_owned()))?;

        let shops = ShopRepository::new(state.pool());
        let preferences = SessionPreferences::new(session);
        let scope = resolve_accessible_shops(Some(&user), &shops, &preferences).await?;

        Ok(Self { user, scope })
    }
}

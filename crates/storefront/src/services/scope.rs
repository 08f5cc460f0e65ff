//! Shop scope resolution for owner routes.
//!
//! Loads the shops an owner holds and narrows them by the "selected shop"
//! preference. The pure rule is [`rounds_core::scope::resolve_shop_scope`];
//! this module supplies the I/O around it.

use std::future::Future;

use thiserror::Error;
use tower_sessions::Session;
use tracing::instrument;

use rounds_core::scope::{ShopScope, ShopSelection, resolve_shop_scope};
use rounds_core::{ShopId, UserId};

use crate::db::RepositoryError;
use crate::models::{CurrentUser, session_keys};

/// Errors from scope resolution.
#[derive(Debug, Error)]
pub enum ScopeError {
    /// No authenticated owner.
    #[error("authentication required")]
    Unauthorized,

    /// The requested shop is not owned by the caller.
    #[error("shop not found")]
    UnknownShop,

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Where the selected-shop preference is kept.
pub trait PreferenceStore: Send + Sync {
    fn selection(&self) -> impl Future<Output = Result<Option<ShopSelection>, ScopeError>> + Send;

    fn set_selection(
        &self,
        selection: ShopSelection,
    ) -> impl Future<Output = Result<(), ScopeError>> + Send;
}

/// Which shops an owner holds.
pub trait OwnedShops: Send + Sync {
    fn owned_shop_ids(
        &self,
        owner: UserId,
    ) -> impl Future<Output = Result<Vec<ShopId>, RepositoryError>> + Send;
}

/// Preference stored in the owner's session.
pub struct SessionPreferences<'a> {
    session: &'a Session,
}

impl<'a> SessionPreferences<'a> {
    #[must_use]
    pub const fn new(session: &'a Session) -> Self {
        Self { session }
    }
}

impl PreferenceStore for SessionPreferences<'_> {
    async fn selection(&self) -> Result<Option<ShopSelection>, ScopeError> {
        let raw: Option<String> = self.session.get(session_keys::SELECTED_SHOP).await?;
        Ok(raw.as_deref().map(ShopSelection::from_preference))
    }

    async fn set_selection(&self, selection: ShopSelection) -> Result<(), ScopeError> {
        self.session
            .insert(session_keys::SELECTED_SHOP, selection.to_preference())
            .await?;
        Ok(())
    }
}

/// Resolve the shops the caller may act on for this request.
///
/// # Errors
///
/// `ScopeError::Unauthorized` without an identity; storage errors otherwise.
/// An owner with no shops gets an empty scope, not an error.
#[instrument(skip_all, fields(user_id))]
pub async fn resolve_accessible_shops<S, P>(
    identity: Option<&CurrentUser>,
    shops: &S,
    preferences: &P,
) -> Result<ShopScope, ScopeError>
where
    S: OwnedShops,
    P: PreferenceStore,
{
    let user = identity.ok_or(ScopeError::Unauthorized)?;
    tracing::Span::current().record("user_id", user.id.as_i32());

    let owned = shops.owned_shop_ids(user.id).await?;
    let selection = preferences.selection().await?;
    Ok(resolve_shop_scope(&owned, selection))
}

/// Store a new selection. Unlike reads, writes naming a shop the caller
/// does not own are rejected.
///
/// # Errors
///
/// `ScopeError::UnknownShop` for shops outside the caller's ownership.
pub async fn select_shop<S, P>(
    identity: Option<&CurrentUser>,
    shops: &S,
    preferences: &P,
    selection: ShopSelection,
) -> Result<ShopScope, ScopeError>
where
    S: OwnedShops,
    P: PreferenceStore,
{
    let user = identity.ok_or(ScopeError::Unauthorized)?;
    let owned = shops.owned_shop_ids(user.id).await?;

    if let ShopSelection::Shop(id) = selection
        && !owned.contains(&id)
    {
        return Err(ScopeError::UnknownShop);
    }

    preferences.set_selection(selection).await?;
    Ok(resolve_shop_scope(&owned, Some(selection)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{MemoryPreferences, MemoryStore};

    fn owner(store: &MemoryStore) -> CurrentUser {
        let user = store.add_user("owner@example.com", "Owner", "hash");
        CurrentUser::from(&user)
    }

    #[tokio::test]
    async fn test_no_identity_is_unauthorized() {
        let store = MemoryStore::default();
        let prefs = MemoryPreferences::default();
        assert!(matches!(
            resolve_accessible_shops(None, &store, &prefs).await,
            Err(ScopeError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_no_preference_returns_owned_set() {
        let store = MemoryStore::default();
        let user = owner(&store);
        let a = store.add_shop(user.id);
        let b = store.add_shop(user.id);

        let scope = resolve_accessible_shops(Some(&user), &store, &MemoryPreferences::default())
            .await
            .unwrap();
        assert_eq!(scope, ShopScope::new([a, b]));
    }

    #[tokio::test]
    async fn test_owner_without_shops_gets_empty_scope() {
        let store = MemoryStore::default();
        let user = owner(&store);

        let scope = resolve_accessible_shops(Some(&user), &store, &MemoryPreferences::default())
            .await
            .unwrap();
        assert!(scope.is_empty());
    }

    #[tokio::test]
    async fn test_foreign_preference_falls_back_to_owned_set() {
        let store = MemoryStore::default();
        let user = owner(&store);
        let other = CurrentUser::from(&store.add_user("other@example.com", "Other", "hash"));
        let mine = store.add_shop(user.id);
        let theirs = store.add_shop(other.id);

        let prefs = MemoryPreferences::with(ShopSelection::Shop(theirs));
        let scope = resolve_accessible_shops(Some(&user), &store, &prefs)
            .await
            .unwrap();
        assert_eq!(scope, ShopScope::new([mine]));
    }

    #[tokio::test]
    async fn test_select_shop_narrows_and_rejects_foreign() {
        let store = MemoryStore::default();
        let user = owner(&store);
        let other = CurrentUser::from(&store.add_user("other@example.com", "Other", "hash"));
        let a = store.add_shop(user.id);
        store.add_shop(user.id);
        let theirs = store.add_shop(other.id);
        let prefs = MemoryPreferences::default();

        let scope = select_shop(Some(&user), &store, &prefs, ShopSelection::Shop(a))
            .await
            .unwrap();
        assert_eq!(scope, ShopScope::new([a]));
        assert_eq!(prefs.current(), Some(ShopSelection::Shop(a)));

        assert!(matches!(
            select_shop(Some(&user), &store, &prefs, ShopSelection::Shop(theirs)).await,
            Err(ScopeError::UnknownShop)
        ));
        assert_eq!(prefs.current(), Some(ShopSelection::Shop(a)));

        let scope = select_shop(Some(&user), &store, &prefs, ShopSelection::All)
            .await
            .unwrap();
        assert_eq!(scope.len(), 2);
    }
}

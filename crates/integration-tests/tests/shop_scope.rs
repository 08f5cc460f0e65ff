//! Shop scoping for owners holding several shops.

#![allow(clippy::unwrap_used)]

use rounds_core::scope::{ShopScope, ShopSelection};
use rounds_storefront::models::CurrentUser;
use rounds_storefront::services::scope::{ScopeError, resolve_accessible_shops, select_shop};
use rounds_storefront::testing::{MemoryPreferences, MemoryStore};

fn owner(store: &MemoryStore, email: &str) -> CurrentUser {
    CurrentUser::from(&store.add_user(email, "Owner", "hash"))
}

#[tokio::test]
async fn test_owners_never_see_each_others_shops() {
    let store = MemoryStore::default();
    let alice = owner(&store, "alice@example.com");
    let bob = owner(&store, "bob@example.com");
    let alice_shops = [store.add_shop(alice.id), store.add_shop(alice.id)];
    let bob_shop = store.add_shop(bob.id);

    let alice_prefs = MemoryPreferences::default();
    let bob_prefs = MemoryPreferences::default();

    let scope = resolve_accessible_shops(Some(&alice), &store, &alice_prefs)
        .await
        .unwrap();
    assert_eq!(scope, ShopScope::new(alice_shops));
    assert!(!scope.contains(bob_shop));

    let scope = resolve_accessible_shops(Some(&bob), &store, &bob_prefs)
        .await
        .unwrap();
    assert_eq!(scope, ShopScope::new([bob_shop]));

    // A stale or forged selection pointing at another owner's shop reads
    // as "all of mine" and is refused when written.
    let forged = MemoryPreferences::with(ShopSelection::Shop(bob_shop));
    let scope = resolve_accessible_shops(Some(&alice), &store, &forged)
        .await
        .unwrap();
    assert_eq!(scope, ShopScope::new(alice_shops));
    assert!(matches!(
        select_shop(Some(&alice), &store, &alice_prefs, ShopSelection::Shop(bob_shop)).await,
        Err(ScopeError::UnknownShop)
    ));
}

#[tokio::test]
async fn test_switching_between_one_shop_and_all() {
    let store = MemoryStore::default();
    let user = owner(&store, "owner@example.com");
    let first = store.add_shop(user.id);
    let second = store.add_shop(user.id);
    let prefs = MemoryPreferences::default();

    select_shop(Some(&user), &store, &prefs, ShopSelection::Shop(second))
        .await
        .unwrap();
    let scope = resolve_accessible_shops(Some(&user), &store, &prefs)
        .await
        .unwrap();
    assert_eq!(scope, ShopScope::new([second]));
    assert!(!scope.contains(first));

    select_shop(Some(&user), &store, &prefs, ShopSelection::All)
        .await
        .unwrap();
    let scope = resolve_accessible_shops(Some(&user), &store, &prefs)
        .await
        .unwrap();
    assert_eq!(scope, ShopScope::new([first, second]));
}

#[tokio::test]
async fn test_new_shop_joins_the_all_scope() {
    let store = MemoryStore::default();
    let user = owner(&store, "owner@example.com");
    let prefs = MemoryPreferences::with(ShopSelection::All);

    let scope = resolve_accessible_shops(Some(&user), &store, &prefs)
        .await
        .unwrap();
    assert!(scope.is_empty());

    let shop = store.add_shop(user.id);
    let scope = resolve_accessible_shops(Some(&user), &store, &prefs)
        .await
        .unwrap();
    assert_eq!(scope, ShopScope::new([shop]));
}

//! Shop scope: which shops an authenticated owner is currently acting on.
//!
//! Owners can own many shops and may narrow the dashboard to one of them.
//! The narrowing is a stored preference ([`ShopSelection`]); the resolver
//! honors it only when it names a shop the owner actually owns.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::ShopId;

/// Sentinel preference value meaning "every shop I own".
pub const ALL_SHOPS: &str = "all";

/// A persisted "selected shop" preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShopSelection {
    /// Show every owned shop.
    #[default]
    All,
    /// Narrow to a single shop.
    Shop(ShopId),
}

impl ShopSelection {
    /// Parse a stored preference value.
    ///
    /// `"all"` (any case) and anything unparseable map to [`ShopSelection::All`];
    /// a stale or garbled preference must never lock an owner out.
    #[must_use]
    pub fn from_preference(value: &str) -> Self {
        let value = value.trim();
        if value.eq_ignore_ascii_case(ALL_SHOPS) {
            return Self::All;
        }
        value.parse::<ShopId>().map_or(Self::All, Self::Shop)
    }

    /// The value to persist for this preference.
    #[must_use]
    pub fn to_preference(self) -> String {
        match self {
            Self::All => ALL_SHOPS.to_owned(),
            Self::Shop(id) => id.to_string(),
        }
    }
}

impl Serialize for ShopSelection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_preference())
    }
}

impl<'de> Deserialize<'de> for ShopSelection {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Id(i32),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Id(id) => Self::Shop(ShopId::new(id)),
            Raw::Text(text) => Self::from_preference(&text),
        })
    }
}

/// The set of shops an owner may view or act on for the current request.
///
/// An empty scope means "authenticated but owns nothing": callers show an
/// empty dashboard rather than failing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ShopScope {
    shop_ids: BTreeSet<ShopId>,
}

impl ShopScope {
    /// Build a scope from an explicit set of shop ids.
    #[must_use]
    pub fn new(shop_ids: impl IntoIterator<Item = ShopId>) -> Self {
        Self {
            shop_ids: shop_ids.into_iter().collect(),
        }
    }

    /// Whether the given shop is in scope.
    #[must_use]
    pub fn contains(&self, shop_id: ShopId) -> bool {
        self.shop_ids.contains(&shop_id)
    }

    /// Whether the scope has no shops.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shop_ids.is_empty()
    }

    /// Number of shops in scope.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shop_ids.len()
    }

    /// Iterate over the shop ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = ShopId> + '_ {
        self.shop_ids.iter().copied()
    }

    /// Shop ids as raw integers, for `= ANY($n)` query parameters.
    #[must_use]
    pub fn as_i32_vec(&self) -> Vec<i32> {
        self.shop_ids.iter().map(ShopId::as_i32).collect()
    }
}

/// Resolve the owner's accessible shops from the shops they own and their
/// stored selection.
///
/// - No selection, or [`ShopSelection::All`]: every owned shop.
/// - A selection naming an owned shop: just that shop.
/// - A selection naming any other shop: every owned shop (silent fallback).
#[must_use]
pub fn resolve_shop_scope(owned: &[ShopId], selection: Option<ShopSelection>) -> ShopScope {
    match selection {
        Some(ShopSelection::Shop(selected)) if owned.contains(&selected) => {
            ShopScope::new([selected])
        }
        _ => ShopScope::new(owned.iter().copied()),
    }
}

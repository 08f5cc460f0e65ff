//! Public shop lookups by slug, cached for a minute.
//!
//! Only shop rows are cached. Stock and rounds are always read fresh.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use crate::db::RepositoryError;
use crate::models::Shop;

/// Slug to shop cache.
#[derive(Clone)]
pub struct ShopCache {
    cache: Cache<String, Arc<Shop>>,
}

impl Default for ShopCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl ShopCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    /// Return the cached shop for `slug`, or run `load` and cache a hit.
    /// Misses are not cached so a newly created shop shows up immediately.
    ///
    /// # Errors
    ///
    /// Propagates the loader's error.
    pub async fn get_or_load<F, Fut>(
        &self,
        slug: &str,
        load: F,
    ) -> Result<Option<Arc<Shop>>, RepositoryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<Shop>, RepositoryError>>,
    {
        if let Some(shop) = self.cache.get(slug).await {
            debug!(slug, "Shop cache hit");
            return Ok(Some(shop));
        }

        let Some(shop) = load().await? else {
            return Ok(None);
        };
        let shop = Arc::new(shop);
        self.cache.insert(slug.to_owned(), Arc::clone(&shop)).await;
        Ok(Some(shop))
    }

    /// Drop the entry for `slug` after the shop changes.
    pub async fn invalidate(&self, slug: &str) {
        self.cache.invalidate(slug).await;
    }
}

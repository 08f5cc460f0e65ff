//! Application state shared across handlers.

use std::sync::Arc;

use lettre::transport::smtp::Error as SmtpError;
use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::services::{Mailer, ShopCache, UploadStorage};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    mailer: Mailer,
    uploads: UploadStorage,
    shops: ShopCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if SMTP is configured but the relay is unusable.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, SmtpError> {
        let mailer = Mailer::from_config(config.email.as_ref())?;
        let uploads = UploadStorage::new(config.upload_dir.clone(), config.max_upload_bytes);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                mailer,
                uploads,
                shops: ShopCache::default(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn mailer(&self) -> &Mailer {
        &self.inner.mailer
    }

    #[must_use]
    pub fn uploads(&self) -> &UploadStorage {
        &self.inner.uploads
    }

    /// Public shop lookups by slug.
    #[must_use]
    pub fn shop_cache(&self) -> &ShopCache {
        &self.inner.shops
    }
}

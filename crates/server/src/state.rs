//! Application state shared across handlers.

use crate::ratelimit::RateLimitState;
use crate::sweep::Sweeper;
use std::sync::Arc;
use wisp_core::config::AppConfig;
use wisp_metadata::WishStore;
use wisp_storage::MediaStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Media blob storage backend.
    pub storage: Arc<dyn MediaStore>,
    /// Wish store.
    pub metadata: Arc<dyn WishStore>,
    /// Per-IP creation rate limiting state.
    pub rate_limit: RateLimitState,
    /// Reclamation sweep service.
    pub sweeper: Arc<Sweeper>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Panics
    ///
    /// Panics if the sweep or rate limit configuration is invalid; a server
    /// that would run with a broken sweep should not come up at all.
    pub fn new(
        config: AppConfig,
        storage: Arc<dyn MediaStore>,
        metadata: Arc<dyn WishStore>,
    ) -> Self {
        if let Err(error) = config.cleanup.validate() {
            panic!("Invalid cleanup configuration: {error}");
        }
        if let Err(error) = config.rate_limit.validate() {
            panic!("Invalid rate limit configuration: {error}");
        }

        let rate_limit = RateLimitState::new(&config.rate_limit);
        let sweeper = Arc::new(Sweeper::new(
            metadata.clone(),
            storage.clone(),
            config.cleanup.clone(),
        ));

        Self {
            config: Arc::new(config),
            storage,
            metadata,
            rate_limit,
            sweeper,
        }
    }

    /// Get the cleanup interval for the rate limiter, if enabled.
    ///
    /// Returns None if rate limiting is disabled. A configured interval of
    /// zero falls back to 60 seconds rather than busy-looping.
    pub fn rate_limit_cleanup_interval(&self) -> Option<std::time::Duration> {
        if !self.rate_limit.is_enabled() {
            return None;
        }
        let interval_secs = self.config.rate_limit.cleanup_interval_secs;
        if interval_secs == 0 {
            tracing::warn!("rate_limit.cleanup_interval_secs is 0, using default of 60 seconds");
            Some(std::time::Duration::from_secs(60))
        } else {
            Some(std::time::Duration::from_secs(interval_secs))
        }
    }
}

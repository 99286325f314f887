//! Wish store abstraction and implementations for Wisp.
//!
//! This crate owns the persistence model:
//! - Wish rows and their tombstone state
//! - The view-accounting transaction (the only place views are counted)
//! - Image records attached to wishes
//! - Reclamation queries for the background sweep

pub mod error;
pub mod models;
pub mod postgres;
pub mod repos;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use postgres::PostgresStore;
pub use repos::{ViewOutcome, WishRepo};
pub use store::{SqliteStore, WishStore};

use std::sync::Arc;
use wisp_core::config::MetadataConfig;

/// Create a wish store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn WishStore>> {
    match config {
        MetadataConfig::Sqlite { path } => {
            let store = SqliteStore::new(path).await?;
            Ok(Arc::new(store) as Arc<dyn WishStore>)
        }
        MetadataConfig::Postgres {
            url,
            max_connections,
            statement_timeout_ms,
        } => {
            tracing::info!("Connecting to PostgreSQL using connection URL");
            let store =
                PostgresStore::from_url(url, *max_connections, *statement_timeout_ms).await?;
            Ok(Arc::new(store) as Arc<dyn WishStore>)
        }
    }
}

pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{DocumentStore, StoreError};

use std::sync::Arc;

use crate::config::DatabaseConfig;

/// Connect the configured store: Postgres when a URL is set, otherwise an
/// in-memory store.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    match config.url {
        Some(_) => Ok(Arc::new(PgStore::connect(config).await?)),
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory document store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

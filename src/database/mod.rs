pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

use std::sync::Arc;

use crate::config::{DatabaseConfig, StorageBackend};

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{
    from_document, from_documents, to_document, Collection, DatabaseError, Document, ReplaceOutcome, Store,
};

/// Open the backend selected by configuration.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn Store>, DatabaseError> {
    match config.backend {
        StorageBackend::Postgres => Ok(Arc::new(PgStore::connect(config).await?)),
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on shutdown");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

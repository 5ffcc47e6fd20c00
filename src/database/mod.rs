pub mod manager;
pub mod memory;
pub mod models;
pub mod repository;
pub mod store;

use std::sync::Arc;

pub use manager::{DatabaseError, DatabaseManager};
pub use store::{AccountStore, ItemStore, RevocationStore, StoreError};

use crate::config::{DatabaseConfig, StorageBackend};
use memory::{MemoryAccountStore, MemoryItemStore, MemoryRevocationStore};
use repository::{PgAccountRepository, PgItemRepository, PgRevocationRepository};

/// The store handles the services are built from
#[derive(Clone)]
pub struct Stores {
    pub accounts: Arc<dyn AccountStore>,
    pub items: Arc<dyn ItemStore>,
    pub revocations: Arc<dyn RevocationStore>,
    database: Option<DatabaseManager>,
}

impl Stores {
    /// Open the backend selected by configuration, running migrations when enabled.
    pub async fn open(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        match config.backend {
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                Ok(Self::memory())
            }
            StorageBackend::Postgres => {
                let database = DatabaseManager::connect(config).await?;
                if config.run_migrations {
                    database.migrate().await?;
                }
                Ok(Self::postgres(database))
            }
        }
    }

    pub fn memory() -> Self {
        Self {
            accounts: Arc::new(MemoryAccountStore::new()),
            items: Arc::new(MemoryItemStore::new()),
            revocations: Arc::new(MemoryRevocationStore::new()),
            database: None,
        }
    }

    pub fn postgres(database: DatabaseManager) -> Self {
        let pool = database.pool().clone();
        Self {
            accounts: Arc::new(PgAccountRepository::new(pool.clone())),
            items: Arc::new(PgItemRepository::new(pool.clone())),
            revocations: Arc::new(PgRevocationRepository::new(pool)),
            database: Some(database),
        }
    }

    pub fn backend(&self) -> StorageBackend {
        if self.database.is_some() {
            StorageBackend::Postgres
        } else {
            StorageBackend::Memory
        }
    }

    pub async fn health_check(&self) -> Result<(), StoreError> {
        match &self.database {
            Some(database) => database.health_check().await,
            None => Ok(()),
        }
    }

    pub async fn close(&self) {
        if let Some(database) = &self.database {
            database.close().await;
        }
    }
}

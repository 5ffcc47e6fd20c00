use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::models::{Account, AccountId, Item, ItemChanges, ItemId, NewAccount, NewItem};

/// Errors surfaced by any store backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict(db_err.constraint().unwrap_or("unique").to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::Sqlx(other),
        }
    }
}

/// Credential store: accounts keyed by id and unique username
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new account. Fails with `StoreError::Conflict` on a taken username.
    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError>;
}

/// Item store: to-do items keyed by id, listed by owner
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn insert(&self, item: NewItem) -> Result<Item, StoreError>;

    async fn find_by_id(&self, id: ItemId) -> Result<Option<Item>, StoreError>;

    /// All items of one owner, ascending by id.
    async fn list_by_owner(&self, owner_id: AccountId) -> Result<Vec<Item>, StoreError>;

    /// Write the supplied fields and `updated_at`. Returns false when the row no longer exists.
    async fn update_fields(
        &self,
        id: ItemId,
        changes: &ItemChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Returns false when the row no longer exists.
    async fn delete(&self, id: ItemId) -> Result<bool, StoreError>;
}

/// Revocation markers for logged-out tokens, keyed by token id
#[async_trait]
pub trait RevocationStore: Send + Sync {
    async fn revoke(&self, token_id: Uuid, expires_at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn is_revoked(&self, token_id: Uuid) -> Result<bool, StoreError>;
}

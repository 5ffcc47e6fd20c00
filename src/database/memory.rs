//! In-process store backend.
//!
//! Used by the test suite and for running the server without Postgres.
//! Nothing here survives a restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{Account, AccountId, Item, ItemChanges, ItemId, NewAccount, NewItem};
use super::store::{AccountStore, ItemStore, RevocationStore, StoreError};

#[derive(Default)]
pub struct MemoryAccountStore {
    next_id: AtomicI64,
    by_username: RwLock<HashMap<String, Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.by_username.read().await.len()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut accounts = self.by_username.write().await;
        if accounts.contains_key(&account.username) {
            return Err(StoreError::Conflict("accounts_username_key".to_string()));
        }

        let row = Account {
            id: AccountId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
            username: account.username,
            password_hash: account.password_hash,
            created_at: account.created_at,
        };
        accounts.insert(row.username.clone(), row.clone());
        Ok(row)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.by_username.read().await.get(username).cloned())
    }
}

#[derive(Default)]
pub struct MemoryItemStore {
    next_id: AtomicI64,
    // BTreeMap keeps listing in id order
    items: RwLock<BTreeMap<ItemId, Item>>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn insert(&self, item: NewItem) -> Result<Item, StoreError> {
        let row = Item {
            id: ItemId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
            owner_id: item.owner_id,
            name: item.name,
            description: item.description,
            completed: false,
            created_at: item.created_at,
            updated_at: item.created_at,
        };
        self.items.write().await.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        Ok(self.items.read().await.get(&id).cloned())
    }

    async fn list_by_owner(&self, owner_id: AccountId) -> Result<Vec<Item>, StoreError> {
        Ok(self
            .items
            .read()
            .await
            .values()
            .filter(|item| item.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn update_fields(
        &self,
        id: ItemId,
        changes: &ItemChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        match self.items.write().await.get_mut(&id) {
            Some(item) => {
                changes.apply_to(item, updated_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: ItemId) -> Result<bool, StoreError> {
        Ok(self.items.write().await.remove(&id).is_some())
    }
}

#[derive(Default)]
pub struct MemoryRevocationStore {
    revoked: RwLock<HashMap<Uuid, DateTime<Utc>>>,
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.revoked.read().await.len()
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn revoke(&self, token_id: Uuid, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut revoked = self.revoked.write().await;
        revoked.retain(|_, exp| *exp >= now);
        revoked.insert(token_id, expires_at);
        Ok(())
    }

    async fn is_revoked(&self, token_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.revoked.read().await.contains_key(&token_id))
    }
}

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::database::models::{AccountId, Item, ItemChanges, ItemId, NewItem};
use crate::database::{ItemStore, StoreError};

#[derive(Debug, Error)]
pub enum ItemError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Business outcome of an update or delete. Callers must check it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Applied,
    NotFound,
    /// The item belongs to another account
    Forbidden,
}

impl Mutation {
    pub fn succeeded(&self) -> bool {
        matches!(self, Mutation::Applied)
    }
}

enum Ownership {
    Owned,
    Denied(Mutation),
}

/// Per-account to-do items with owner checks on every mutation
pub struct ItemService {
    items: Arc<dyn ItemStore>,
}

impl ItemService {
    pub fn new(items: Arc<dyn ItemStore>) -> Self {
        Self { items }
    }

    pub async fn create(
        &self,
        owner_id: AccountId,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<ItemId, ItemError> {
        let item = self
            .items
            .insert(NewItem {
                owner_id,
                name: name.into(),
                description: description.into(),
                created_at: Utc::now(),
            })
            .await?;

        info!(item_id = %item.id, owner_id = %owner_id, "Item created");
        Ok(item.id)
    }

    pub async fn list(&self, owner_id: AccountId) -> Result<Vec<Item>, ItemError> {
        Ok(self.items.list_by_owner(owner_id).await?)
    }

    /// Apply the supplied fields. An empty change set succeeds without writing.
    pub async fn update(
        &self,
        item_id: ItemId,
        owner_id: AccountId,
        changes: ItemChanges,
    ) -> Result<Mutation, ItemError> {
        if let Ownership::Denied(outcome) = self.check_ownership(item_id, owner_id).await? {
            return Ok(outcome);
        }

        if changes.is_empty() {
            return Ok(Mutation::Applied);
        }

        if !self.items.update_fields(item_id, &changes, Utc::now()).await? {
            // Deleted between the ownership check and the write
            return Ok(Mutation::NotFound);
        }

        info!(item_id = %item_id, owner_id = %owner_id, "Item updated");
        Ok(Mutation::Applied)
    }

    /// Remove the item permanently
    pub async fn delete(&self, item_id: ItemId, owner_id: AccountId) -> Result<Mutation, ItemError> {
        if let Ownership::Denied(outcome) = self.check_ownership(item_id, owner_id).await? {
            return Ok(outcome);
        }

        if !self.items.delete(item_id).await? {
            return Ok(Mutation::NotFound);
        }

        info!(item_id = %item_id, owner_id = %owner_id, "Item deleted");
        Ok(Mutation::Applied)
    }

    async fn check_ownership(&self, item_id: ItemId, owner_id: AccountId) -> Result<Ownership, ItemError> {
        match self.items.find_by_id(item_id).await? {
            None => Ok(Ownership::Denied(Mutation::NotFound)),
            Some(item) if item.owner_id != owner_id => {
                debug!(item_id = %item_id, caller = %owner_id, owner = %item.owner_id, "Ownership check failed");
                Ok(Ownership::Denied(Mutation::Forbidden))
            }
            Some(_) => Ok(Ownership::Owned),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryItemStore;

    const ALICE: AccountId = AccountId(1);
    const BOB: AccountId = AccountId(2);

    fn service() -> (ItemService, Arc<MemoryItemStore>) {
        let store = Arc::new(MemoryItemStore::new());
        (ItemService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn create_starts_incomplete_with_equal_timestamps() {
        let (service, store) = service();
        let id = service.create(ALICE, "buy milk", "").await.unwrap();

        let item = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(item.owner_id, ALICE);
        assert!(!item.completed);
        assert_eq!(item.created_at, item.updated_at);
    }

    #[tokio::test]
    async fn list_is_scoped_and_empty_when_nothing_owned() {
        let (service, _) = service();
        service.create(ALICE, "a", "").await.unwrap();

        assert_eq!(service.list(ALICE).await.unwrap().len(), 1);
        assert!(service.list(BOB).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn partial_update_keeps_other_fields() {
        let (service, store) = service();
        let id = service.create(ALICE, "buy milk", "semi-skimmed").await.unwrap();
        let before = store.find_by_id(id).await.unwrap().unwrap();

        let changes = ItemChanges {
            completed: Some(true),
            ..Default::default()
        };
        assert_eq!(service.update(id, ALICE, changes).await.unwrap(), Mutation::Applied);

        let after = store.find_by_id(id).await.unwrap().unwrap();
        assert!(after.completed);
        assert_eq!(after.name, "buy milk");
        assert_eq!(after.description, "semi-skimmed");
        assert!(after.updated_at >= before.updated_at);
        assert_eq!(after.created_at, before.created_at);
    }

    #[tokio::test]
    async fn empty_update_is_a_successful_no_op() {
        let (service, store) = service();
        let id = service.create(ALICE, "a", "b").await.unwrap();
        let before = store.find_by_id(id).await.unwrap().unwrap();

        let outcome = service.update(id, ALICE, ItemChanges::default()).await.unwrap();

        assert!(outcome.succeeded());
        assert_eq!(store.find_by_id(id).await.unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn non_owner_cannot_update_or_delete() {
        let (service, store) = service();
        let id = service.create(ALICE, "mine", "").await.unwrap();
        let before = store.find_by_id(id).await.unwrap().unwrap();

        let changes = ItemChanges {
            name: Some("stolen".to_string()),
            completed: Some(true),
            ..Default::default()
        };
        assert_eq!(service.update(id, BOB, changes).await.unwrap(), Mutation::Forbidden);
        assert_eq!(service.delete(id, BOB).await.unwrap(), Mutation::Forbidden);

        assert_eq!(store.find_by_id(id).await.unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn missing_item_is_not_found() {
        let (service, _) = service();

        let outcome = service.update(ItemId(404), ALICE, ItemChanges::default()).await.unwrap();
        assert_eq!(outcome, Mutation::NotFound);
        assert!(!outcome.succeeded());
        assert_eq!(service.delete(ItemId(404), ALICE).await.unwrap(), Mutation::NotFound);
    }

    #[tokio::test]
    async fn delete_is_terminal() {
        let (service, _) = service();
        let id = service.create(ALICE, "a", "").await.unwrap();

        assert_eq!(service.delete(id, ALICE).await.unwrap(), Mutation::Applied);
        assert!(service.list(ALICE).await.unwrap().is_empty());
        assert_eq!(service.delete(id, ALICE).await.unwrap(), Mutation::NotFound);
        assert_eq!(
            service.update(id, ALICE, ItemChanges::default()).await.unwrap(),
            Mutation::NotFound
        );
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{Account, AccountId, Item, ItemChanges, ItemId, NewAccount, NewItem};
use super::store::{AccountStore, ItemStore, RevocationStore, StoreError};

const ITEM_COLUMNS: &str = "id, owner_id, name, description, completed, created_at, updated_at";

/// `accounts` table
#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountRepository {
    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        let row = sqlx::query_as::<_, Account>(
            "INSERT INTO accounts (username, password_hash, created_at)
             VALUES ($1, $2, $3)
             RETURNING id, username, password_hash, created_at",
        )
        .bind(&account.username)
        .bind(&account.password_hash)
        .bind(account.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query_as::<_, Account>(
            "SELECT id, username, password_hash, created_at
             FROM accounts
             WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}

/// `items` table
#[derive(Clone)]
pub struct PgItemRepository {
    pool: PgPool,
}

impl PgItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ItemStore for PgItemRepository {
    async fn insert(&self, item: NewItem) -> Result<Item, StoreError> {
        let query = format!(
            "INSERT INTO items (owner_id, name, description, completed, created_at, updated_at)
             VALUES ($1, $2, $3, false, $4, $4)
             RETURNING {ITEM_COLUMNS}"
        );

        let row = sqlx::query_as::<_, Item>(&query)
            .bind(item.owner_id)
            .bind(&item.name)
            .bind(&item.description)
            .bind(item.created_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    async fn find_by_id(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        let query = format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1");

        let row = sqlx::query_as::<_, Item>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn list_by_owner(&self, owner_id: AccountId) -> Result<Vec<Item>, StoreError> {
        let query = format!("SELECT {ITEM_COLUMNS} FROM items WHERE owner_id = $1 ORDER BY id");

        let rows = sqlx::query_as::<_, Item>(&query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn update_fields(
        &self,
        id: ItemId,
        changes: &ItemChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        // NULL parameters keep the current column value
        let result = sqlx::query(
            "UPDATE items
             SET name = COALESCE($2, name),
                 description = COALESCE($3, description),
                 completed = COALESCE($4, completed),
                 updated_at = $5
             WHERE id = $1",
        )
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.completed)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id: ItemId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

/// `revoked_tokens` table
#[derive(Clone)]
pub struct PgRevocationRepository {
    pool: PgPool,
}

impl PgRevocationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevocationStore for PgRevocationRepository {
    async fn revoke(&self, token_id: Uuid, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO revoked_tokens (token_id, expires_at)
             VALUES ($1, $2)
             ON CONFLICT (token_id) DO NOTHING",
        )
        .bind(token_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        // Markers past their token's expiry no longer matter
        let purged = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < now()")
            .execute(&self.pool)
            .await?;
        if purged.rows_affected() > 0 {
            tracing::debug!("Purged {} expired revocation markers", purged.rows_affected());
        }

        Ok(())
    }

    async fn is_revoked(&self, token_id: Uuid) -> Result<bool, StoreError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM revoked_tokens WHERE token_id = $1")
            .bind(token_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0 > 0)
    }
}

/// Run against a live database only when `DATABASE_URL` is set.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, StorageBackend};
    use crate::database::DatabaseManager;
    use chrono::Duration;

    async fn pool() -> Option<PgPool> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping Postgres repository test");
            return None;
        };

        let mut config = AppConfig::for_tests().database;
        config.backend = StorageBackend::Postgres;
        config.url = Some(url);

        let database = DatabaseManager::connect(&config).await.unwrap();
        database.migrate().await.unwrap();
        Some(database.pool().clone())
    }

    async fn account(pool: &PgPool) -> Account {
        PgAccountRepository::new(pool.clone())
            .insert(NewAccount {
                username: format!("pg-{}", Uuid::new_v4().simple()),
                password_hash: "$argon2id$placeholder".to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn update_of_completed_keeps_other_columns() {
        let Some(pool) = pool().await else { return };
        let owner = account(&pool).await;
        let items = PgItemRepository::new(pool);

        let item = items
            .insert(NewItem {
                owner_id: owner.id,
                name: "buy milk".to_string(),
                description: "semi-skimmed".to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        assert!(!item.completed);

        let changes = ItemChanges {
            completed: Some(true),
            ..Default::default()
        };
        assert!(items.update_fields(item.id, &changes, Utc::now()).await.unwrap());

        let stored = items.find_by_id(item.id).await.unwrap().unwrap();
        assert!(stored.completed);
        assert_eq!(stored.name, "buy milk");
        assert_eq!(stored.description, "semi-skimmed");
        assert_eq!(stored.owner_id, owner.id);

        assert_eq!(items.list_by_owner(owner.id).await.unwrap().len(), 1);
        assert!(items.delete(item.id).await.unwrap());
        assert!(!items.update_fields(item.id, &changes, Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() {
        let Some(pool) = pool().await else { return };
        let accounts = PgAccountRepository::new(pool.clone());
        let existing = account(&pool).await;

        let err = accounts
            .insert(NewAccount {
                username: existing.username.clone(),
                password_hash: "$argon2id$other".to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)), "got {err:?}");
        let found = accounts.find_by_username(&existing.username).await.unwrap().unwrap();
        assert_eq!(found.id, existing.id);
    }

    #[tokio::test]
    async fn revoked_token_is_remembered() {
        let Some(pool) = pool().await else { return };
        let revocations = PgRevocationRepository::new(pool);
        let token_id = Uuid::new_v4();

        assert!(!revocations.is_revoked(token_id).await.unwrap());
        revocations
            .revoke(token_id, Utc::now() + Duration::minutes(10))
            .await
            .unwrap();
        // Revoking twice is harmless
        revocations
            .revoke(token_id, Utc::now() + Duration::minutes(10))
            .await
            .unwrap();

        assert!(revocations.is_revoked(token_id).await.unwrap());
        assert!(!revocations.is_revoked(Uuid::new_v4()).await.unwrap());
    }
}

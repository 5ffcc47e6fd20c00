use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use super::account::AccountId;

/// Primary key of a to-do item row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct ItemId(pub i64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Item {
    pub id: ItemId,
    pub owner_id: AccountId,
    pub name: String,
    pub description: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewItem {
    pub owner_id: AccountId,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Partial update: only the fields that are `Some` are written.
///
/// Deserializes from a JSON object where a missing or `null` field means
/// "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl ItemChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.completed.is_none()
    }

    /// Apply the supplied fields to an in-memory item.
    pub fn apply_to(&self, item: &mut Item, updated_at: DateTime<Utc>) {
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(description) = &self.description {
            item.description = description.clone();
        }
        if let Some(completed) = self.completed {
            item.completed = completed;
        }
        item.updated_at = updated_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Item {
        let now = Utc::now();
        Item {
            id: ItemId(1),
            owner_id: AccountId(7),
            name: "buy milk".to_string(),
            description: "two litres".to_string(),
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn missing_and_null_fields_are_not_supplied() {
        let changes: ItemChanges = serde_json::from_value(json!({ "completed": true, "name": null })).unwrap();
        assert_eq!(changes.completed, Some(true));
        assert!(changes.name.is_none());
        assert!(changes.description.is_none());

        let empty: ItemChanges = serde_json::from_value(json!({})).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn apply_touches_only_supplied_fields() {
        let mut item = sample();
        let later = item.updated_at + chrono::Duration::seconds(5);
        let changes = ItemChanges {
            completed: Some(true),
            ..Default::default()
        };

        changes.apply_to(&mut item, later);

        assert!(item.completed);
        assert_eq!(item.name, "buy milk");
        assert_eq!(item.description, "two litres");
        assert_eq!(item.updated_at, later);
    }

    #[test]
    fn serializes_ids_as_plain_numbers() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["id"], json!(1));
        assert_eq!(value["owner_id"], json!(7));
    }
}

//! Ordered item records.
//!
//! # Responsibility
//! - Define the read model returned by every engine entry point.
//! - Define insert inputs for single and bulk creation.
//!
//! # Invariants
//! - `index` is non-negative.
//! - `deleted_at` and `deleted_by` are either both set or both unset.
//! - `payload` is opaque to the engine and returned unchanged.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Internal row identity. Monotonic, never reused; used as the ordering
/// tie-breaker when duplicate indices exist.
pub type ItemRowId = i64;

/// Caller-visible item identifier.
pub type ItemPublicId = Uuid;

/// Identifier of the entity that owns an ordered collection.
pub type ParentId = Uuid;

/// One positioned child of a parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedItem {
    pub id: ItemRowId,
    pub public_id: ItemPublicId,
    pub parent_id: ParentId,
    /// Position among active siblings.
    pub index: i64,
    pub payload: String,
    /// Epoch ms of soft deletion.
    pub deleted_at: Option<i64>,
    /// Actor that performed the soft deletion.
    pub deleted_by: Option<String>,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

impl OrderedItem {
    /// Returns whether this item takes part in active ordering.
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Input for a single appended item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub parent_id: ParentId,
    /// Generated when `None`.
    pub public_id: Option<ItemPublicId>,
    pub payload: String,
}

impl NewItem {
    pub fn new(parent_id: ParentId, payload: impl Into<String>) -> Self {
        Self {
            parent_id,
            public_id: None,
            payload: payload.into(),
        }
    }

    /// Uses a caller-provided public id, e.g. when importing records that
    /// already have an external identity.
    pub fn with_public_id(mut self, public_id: ItemPublicId) -> Self {
        self.public_id = Some(public_id);
        self
    }
}

/// One row of a bulk insert batch.
///
/// Rows of the same parent are positioned by ascending `relative_order_key`;
/// rows with equal keys keep their input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkInsertEntry {
    pub parent_id: ParentId,
    pub relative_order_key: i64,
    #[serde(default)]
    pub public_id: Option<ItemPublicId>,
    pub payload: String,
}

impl BulkInsertEntry {
    pub fn new(parent_id: ParentId, relative_order_key: i64, payload: impl Into<String>) -> Self {
        Self {
            parent_id,
            relative_order_key,
            public_id: None,
            payload: payload.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BulkInsertEntry, NewItem, OrderedItem};
    use uuid::Uuid;

    #[test]
    fn item_is_active_until_deleted() {
        let mut item = OrderedItem {
            id: 1,
            public_id: Uuid::new_v4(),
            parent_id: Uuid::new_v4(),
            index: 0,
            payload: "todo".to_string(),
            deleted_at: None,
            deleted_by: None,
            created_at: 0,
            updated_at: 0,
        };
        assert!(item.is_active());

        item.deleted_at = Some(10);
        item.deleted_by = Some("user:1".to_string());
        assert!(!item.is_active());
    }

    #[test]
    fn new_item_keeps_explicit_public_id() {
        let parent = Uuid::new_v4();
        let public_id = Uuid::new_v4();
        let item = NewItem::new(parent, "Backlog").with_public_id(public_id);
        assert_eq!(item.public_id, Some(public_id));
        assert_eq!(item.payload, "Backlog");
    }

    #[test]
    fn bulk_entry_deserializes_without_public_id() {
        let parent = Uuid::new_v4();
        let raw = format!(
            r#"{{"parent_id":"{parent}","relative_order_key":3,"payload":"Done"}}"#
        );
        let entry: BulkInsertEntry = serde_json::from_str(&raw).expect("entry should parse");
        assert_eq!(entry, BulkInsertEntry::new(parent, 3, "Done"));
    }
}

//! Ordered item repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Run each mutation in exactly one IMMEDIATE transaction.
//! - Run the ordering invariant for every affected parent before commit.
//! - Keep SQL details and ordering behavior inside the repository boundary.
//!
//! # Invariants
//! - Any error drops the transaction, which rolls it back; nothing partial
//!   is ever committed.
//! - Records returned from mutations reflect post-healing positions.

use crate::config::{EngineConfig, IndexBoundsPolicy};
use crate::db::migrations::{current_user_version, latest_version};
use crate::error::{OrderError, OrderResult};
use crate::model::item::{BulkInsertEntry, ItemPublicId, NewItem, OrderedItem, ParentId};
use crate::ordering::allocator::append_item;
use crate::ordering::bulk::bulk_insert_entries;
use crate::ordering::compactor::{compact_parent, CompactionReport};
use crate::ordering::invariant::{inspect_parent, maintain_ordering_invariant, ParentOrderReport};
use crate::ordering::records::{
    count_active_items, list_active_items, load_item, load_required_item, locate_active_item,
    parent_exists, parse_uuid, register_parent,
};
use crate::ordering::reorder::reorder_item;
use crate::ordering::soft_delete::{soft_delete_all_in_parent, soft_delete_item};
use log::{debug, error, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::Instant;

/// Repository interface for ordered item operations.
pub trait OrderedItemRepository {
    /// Registers a parent; returns `false` when it already existed.
    fn register_parent(&self, parent_id: ParentId) -> OrderResult<bool>;
    fn parent_exists(&self, parent_id: ParentId) -> OrderResult<bool>;
    /// Appends one item after the parent's last active item.
    fn create_appended(&self, item: &NewItem) -> OrderResult<OrderedItem>;
    /// Moves one active item to `new_index` within its parent.
    fn reorder(&self, public_id: ItemPublicId, new_index: i64) -> OrderResult<OrderedItem>;
    /// Inserts a batch; returns records in input order.
    fn bulk_insert(&self, entries: &[BulkInsertEntry]) -> OrderResult<Vec<OrderedItem>>;
    /// Soft-deletes one item and closes the gap it leaves.
    fn soft_delete(
        &self,
        public_id: ItemPublicId,
        deleted_by: &str,
        deleted_at: i64,
    ) -> OrderResult<OrderedItem>;
    /// Soft-deletes every active item of a parent.
    fn soft_delete_all_by_parent(
        &self,
        parent_id: ParentId,
        deleted_by: &str,
        deleted_at: i64,
    ) -> OrderResult<usize>;
    /// Rewrites the parent's active positions to `0..n-1`.
    fn compact(&self, parent_id: ParentId) -> OrderResult<CompactionReport>;
    /// Read-only ordering diagnostics.
    fn check_parent(&self, parent_id: ParentId) -> OrderResult<ParentOrderReport>;
    fn get_item(
        &self,
        public_id: ItemPublicId,
        include_deleted: bool,
    ) -> OrderResult<Option<OrderedItem>>;
    fn list_active(&self, parent_id: ParentId) -> OrderResult<Vec<OrderedItem>>;
    fn active_count(&self, parent_id: ParentId) -> OrderResult<i64>;
}

/// SQLite-backed ordered item repository.
pub struct SqliteOrderedItemRepository<'conn> {
    conn: &'conn Connection,
    bounds: IndexBoundsPolicy,
}

impl<'conn> SqliteOrderedItemRepository<'conn> {
    /// Creates repository from migrated connection with default settings.
    pub fn try_new(conn: &'conn Connection) -> OrderResult<Self> {
        Self::with_config(conn, &EngineConfig::default())
    }

    /// Creates repository from migrated connection.
    pub fn with_config(conn: &'conn Connection, config: &EngineConfig) -> OrderResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self {
            conn,
            bounds: config.index_bounds,
        })
    }

    fn run_mutation<T>(
        &self,
        event: &'static str,
        body: impl FnOnce(&Transaction<'_>) -> OrderResult<T>,
    ) -> OrderResult<T> {
        let started_at = Instant::now();
        let outcome = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(OrderError::from)
            .and_then(|tx| {
                let value = body(&tx)?;
                tx.commit()?;
                Ok(value)
            });

        match &outcome {
            Ok(_) => debug!(
                "event={} module=repo status=ok duration_ms={}",
                event,
                started_at.elapsed().as_millis()
            ),
            Err(err @ (OrderError::InvariantViolation { .. } | OrderError::Storage(_))) => error!(
                "event={} module=repo status=error duration_ms={} error_code={} error={}",
                event,
                started_at.elapsed().as_millis(),
                err.code(),
                err
            ),
            Err(err) => warn!(
                "event={} module=repo status=rejected duration_ms={} error_code={}",
                event,
                started_at.elapsed().as_millis(),
                err.code()
            ),
        }
        outcome
    }
}

impl OrderedItemRepository for SqliteOrderedItemRepository<'_> {
    fn register_parent(&self, parent_id: ParentId) -> OrderResult<bool> {
        register_parent(self.conn, parent_id)
    }

    fn parent_exists(&self, parent_id: ParentId) -> OrderResult<bool> {
        parent_exists(self.conn, parent_id)
    }

    fn create_appended(&self, item: &NewItem) -> OrderResult<OrderedItem> {
        self.run_mutation("item_create", |tx| {
            let row_id = append_item(tx, item)?;
            maintain_ordering_invariant(tx, item.parent_id)?;
            load_item_by_row_id(tx, row_id)
        })
    }

    fn reorder(&self, public_id: ItemPublicId, new_index: i64) -> OrderResult<OrderedItem> {
        let bounds = self.bounds;
        self.run_mutation("item_reorder", |tx| {
            let location = locate_active_item(tx, public_id)?;
            reorder_item(tx, &location, new_index, bounds)?;
            maintain_ordering_invariant(tx, location.parent_id)?;
            load_required_item(tx, public_id)
        })
    }

    fn bulk_insert(&self, entries: &[BulkInsertEntry]) -> OrderResult<Vec<OrderedItem>> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        self.run_mutation("item_bulk_insert", |tx| {
            let planned = bulk_insert_entries(tx, entries)?;

            let mut parents: Vec<ParentId> = planned.iter().map(|row| row.parent_id).collect();
            parents.sort_unstable();
            parents.dedup();
            for parent_id in parents {
                maintain_ordering_invariant(tx, parent_id)?;
            }

            planned
                .iter()
                .map(|row| load_required_item(tx, row.public_id))
                .collect()
        })
    }

    fn soft_delete(
        &self,
        public_id: ItemPublicId,
        deleted_by: &str,
        deleted_at: i64,
    ) -> OrderResult<OrderedItem> {
        self.run_mutation("item_soft_delete", |tx| {
            let location = locate_active_item(tx, public_id)?;
            soft_delete_item(tx, &location, deleted_by, deleted_at)?;
            maintain_ordering_invariant(tx, location.parent_id)?;
            load_required_item(tx, public_id)
        })
    }

    fn soft_delete_all_by_parent(
        &self,
        parent_id: ParentId,
        deleted_by: &str,
        deleted_at: i64,
    ) -> OrderResult<usize> {
        self.run_mutation("parent_soft_delete_all", |tx| {
            if !parent_exists(tx, parent_id)? {
                return Err(OrderError::ParentNotFound(parent_id));
            }
            let marked = soft_delete_all_in_parent(tx, parent_id, deleted_by, deleted_at)?;
            maintain_ordering_invariant(tx, parent_id)?;
            Ok(marked)
        })
    }

    fn compact(&self, parent_id: ParentId) -> OrderResult<CompactionReport> {
        self.run_mutation("parent_compact", |tx| {
            if !parent_exists(tx, parent_id)? {
                return Err(OrderError::ParentNotFound(parent_id));
            }
            let report = compact_parent(tx, parent_id)?;
            maintain_ordering_invariant(tx, parent_id)?;
            Ok(report)
        })
    }

    fn check_parent(&self, parent_id: ParentId) -> OrderResult<ParentOrderReport> {
        if !parent_exists(self.conn, parent_id)? {
            return Err(OrderError::ParentNotFound(parent_id));
        }
        inspect_parent(self.conn, parent_id)
    }

    fn get_item(
        &self,
        public_id: ItemPublicId,
        include_deleted: bool,
    ) -> OrderResult<Option<OrderedItem>> {
        load_item(self.conn, public_id, include_deleted)
    }

    fn list_active(&self, parent_id: ParentId) -> OrderResult<Vec<OrderedItem>> {
        if !parent_exists(self.conn, parent_id)? {
            return Err(OrderError::ParentNotFound(parent_id));
        }
        list_active_items(self.conn, parent_id)
    }

    fn active_count(&self, parent_id: ParentId) -> OrderResult<i64> {
        count_active_items(self.conn, parent_id)
    }
}

fn load_item_by_row_id(conn: &Connection, row_id: i64) -> OrderResult<OrderedItem> {
    let public_id: String = conn.query_row(
        "SELECT public_id FROM ordered_items WHERE id = ?1;",
        [row_id],
        |row| row.get(0),
    )?;
    let public_id = parse_uuid(&public_id, "ordered_items.public_id")?;
    load_required_item(conn, public_id)
}

fn ensure_connection_ready(conn: &Connection) -> OrderResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(OrderError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}

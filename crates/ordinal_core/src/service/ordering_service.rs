//! Ordering use-case service.
//!
//! # Responsibility
//! - Expose the entry points the domain service calls: append, reorder,
//!   bulk insert, soft delete.
//! - Validate caller input before any transaction is opened.
//!
//! # Invariants
//! - Service APIs never bypass repository transaction boundaries.
//! - Audit actor ids are non-blank and free of whitespace/control characters.

use crate::error::{OrderError, OrderResult};
use crate::model::item::{BulkInsertEntry, ItemPublicId, NewItem, OrderedItem, ParentId};
use crate::ordering::{CompactionReport, ParentOrderReport};
use crate::repo::ordered_repo::OrderedItemRepository;
use once_cell::sync::Lazy;
use regex::Regex;

static ACTOR_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._:@-]{1,128}$").expect("valid actor id regex"));

/// Use-case service wrapper for ordered collection maintenance.
pub struct OrderingService<R: OrderedItemRepository> {
    repo: R,
}

impl<R: OrderedItemRepository> OrderingService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a parent so items can be attached to it. Idempotent.
    pub fn register_parent(&self, parent_id: ParentId) -> OrderResult<bool> {
        self.repo.register_parent(parent_id)
    }

    /// Appends one item at the end of the parent's active items.
    ///
    /// # Contract
    /// - First item of an empty parent gets index `0`.
    /// - Returned record carries a generated public id.
    pub fn create_appended(
        &self,
        parent_id: ParentId,
        payload: impl Into<String>,
    ) -> OrderResult<OrderedItem> {
        self.repo.create_appended(&NewItem::new(parent_id, payload))
    }

    /// Same as [`Self::create_appended`] with a caller-provided public id.
    pub fn create_appended_with_id(
        &self,
        parent_id: ParentId,
        public_id: ItemPublicId,
        payload: impl Into<String>,
    ) -> OrderResult<OrderedItem> {
        self.repo
            .create_appended(&NewItem::new(parent_id, payload).with_public_id(public_id))
    }

    /// Moves one item to `new_index`, shifting the siblings in between.
    ///
    /// Out-of-range targets follow the repository's configured
    /// [`crate::config::IndexBoundsPolicy`].
    pub fn reorder(&self, item_public_id: ItemPublicId, new_index: i64) -> OrderResult<OrderedItem> {
        if new_index < 0 {
            return Err(OrderError::InvalidArgument(format!(
                "target index must be non-negative, got {new_index}"
            )));
        }
        self.repo.reorder(item_public_id, new_index)
    }

    /// Inserts a batch, positioning each parent's rows by relative order key
    /// after its existing items.
    ///
    /// # Contract
    /// - Empty input returns an empty result without touching storage.
    /// - Returned records are in input order.
    pub fn bulk_insert(&self, items: &[BulkInsertEntry]) -> OrderResult<Vec<OrderedItem>> {
        self.repo.bulk_insert(items)
    }

    /// Soft-deletes one item and shifts later siblings down by one.
    pub fn soft_delete(
        &self,
        item_public_id: ItemPublicId,
        who: &str,
        when: i64,
    ) -> OrderResult<OrderedItem> {
        let who = validate_actor(who)?;
        validate_timestamp(when)?;
        self.repo.soft_delete(item_public_id, who, when)
    }

    /// Soft-deletes the whole ordered collection of one parent.
    pub fn soft_delete_all_by_parent(
        &self,
        parent_id: ParentId,
        who: &str,
        when: i64,
    ) -> OrderResult<usize> {
        let who = validate_actor(who)?;
        validate_timestamp(when)?;
        self.repo.soft_delete_all_by_parent(parent_id, who, when)
    }

    /// Rewrites the parent's active positions to `0..n-1`.
    pub fn compact(&self, parent_id: ParentId) -> OrderResult<CompactionReport> {
        self.repo.compact(parent_id)
    }

    /// Reports duplicates and density without mutating anything.
    pub fn check_parent(&self, parent_id: ParentId) -> OrderResult<ParentOrderReport> {
        self.repo.check_parent(parent_id)
    }

    pub fn get_item(
        &self,
        item_public_id: ItemPublicId,
        include_deleted: bool,
    ) -> OrderResult<Option<OrderedItem>> {
        self.repo.get_item(item_public_id, include_deleted)
    }

    pub fn list_active(&self, parent_id: ParentId) -> OrderResult<Vec<OrderedItem>> {
        self.repo.list_active(parent_id)
    }

    pub fn active_count(&self, parent_id: ParentId) -> OrderResult<i64> {
        self.repo.active_count(parent_id)
    }
}

fn validate_actor(who: &str) -> OrderResult<&str> {
    let trimmed = who.trim();
    if !ACTOR_ID_RE.is_match(trimmed) {
        return Err(OrderError::InvalidArgument(format!(
            "actor id must match [A-Za-z0-9._:@-]{{1,128}}, got `{trimmed}`"
        )));
    }
    Ok(trimmed)
}

fn validate_timestamp(when: i64) -> OrderResult<()> {
    if when < 0 {
        return Err(OrderError::InvalidArgument(format!(
            "deletion timestamp must be non-negative epoch ms, got {when}"
        )));
    }
    Ok(())
}

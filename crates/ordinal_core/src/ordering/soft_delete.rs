//! Soft deletion with downward sibling shift.

use super::records::ItemLocation;
use crate::error::{OrderError, OrderResult};
use crate::model::item::ParentId;
use rusqlite::{params, Connection};

/// Marks the located item deleted and closes the gap it leaves.
///
/// Returns the number of siblings shifted down.
pub fn soft_delete_item(
    conn: &Connection,
    location: &ItemLocation,
    deleted_by: &str,
    deleted_at: i64,
) -> OrderResult<usize> {
    let marked = conn.execute(
        "UPDATE ordered_items
         SET deleted_at = ?2,
             deleted_by = ?3,
             updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1
           AND deleted_at IS NULL;",
        params![location.id, deleted_at, deleted_by],
    )?;
    if marked == 0 {
        return Err(OrderError::ItemNotFound(location.public_id));
    }

    let shifted = conn.execute(
        "UPDATE ordered_items
         SET position = position - 1,
             updated_at = (strftime('%s', 'now') * 1000)
         WHERE parent_uuid = ?1
           AND deleted_at IS NULL
           AND position > ?2;",
        params![location.parent_id.to_string(), location.index],
    )?;
    Ok(shifted)
}

/// Marks every active item of the parent deleted. No re-indexing happens
/// because no active items remain.
///
/// Returns the number of items marked.
pub fn soft_delete_all_in_parent(
    conn: &Connection,
    parent_id: ParentId,
    deleted_by: &str,
    deleted_at: i64,
) -> OrderResult<usize> {
    let marked = conn.execute(
        "UPDATE ordered_items
         SET deleted_at = ?2,
             deleted_by = ?3,
             updated_at = (strftime('%s', 'now') * 1000)
         WHERE parent_uuid = ?1
           AND deleted_at IS NULL;",
        params![parent_id.to_string(), deleted_at, deleted_by],
    )?;
    Ok(marked)
}

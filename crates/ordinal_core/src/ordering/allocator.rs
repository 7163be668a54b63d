//! Append index allocation.
//!
//! # Invariants
//! - Must run inside the same write transaction as the insert that consumes
//!   the allocated index.

use super::records::{ensure_parent_exists, ensure_public_ids_unused};
use crate::error::{OrderError, OrderResult};
use crate::model::item::{ItemRowId, NewItem, ParentId};
use rusqlite::{params, Connection};
use uuid::Uuid;

/// Returns `max(active position) + 1` for the parent, or `0` when it has no
/// active items.
pub fn allocate_append_index(conn: &Connection, parent_id: ParentId) -> OrderResult<i64> {
    let last: Option<i64> = conn.query_row(
        "SELECT MAX(position)
         FROM ordered_items
         WHERE parent_uuid = ?1
           AND deleted_at IS NULL;",
        [parent_id.to_string()],
        |row| row.get(0),
    )?;
    match last {
        None => Ok(0),
        Some(last) => last.checked_add(1).ok_or_else(|| {
            OrderError::InvalidArgument(format!(
                "parent {parent_id} has no append index left after position {last}"
            ))
        }),
    }
}

/// Inserts one item after the current last active sibling.
///
/// Returns the internal id of the new row.
pub fn append_item(conn: &Connection, item: &NewItem) -> OrderResult<ItemRowId> {
    ensure_parent_exists(conn, item.parent_id)?;
    if let Some(public_id) = item.public_id {
        ensure_public_ids_unused(conn, &[public_id])?;
    }

    let index = allocate_append_index(conn, item.parent_id)?;
    let public_id = item.public_id.unwrap_or_else(Uuid::new_v4);
    conn.execute(
        "INSERT INTO ordered_items (
            public_id,
            parent_uuid,
            position,
            payload
        ) VALUES (?1, ?2, ?3, ?4);",
        params![
            public_id.to_string(),
            item.parent_id.to_string(),
            index,
            item.payload.as_str(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

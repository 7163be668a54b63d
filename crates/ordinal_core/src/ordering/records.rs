//! Row decoding and lookups shared by the ordering components.
//!
//! # Invariants
//! - Active listings are deterministic: `position ASC, id ASC`.
//! - Lookups run on whatever connection or transaction they are handed;
//!   callers inside a mutation pass the open transaction.

use crate::error::{OrderError, OrderResult};
use crate::model::item::{ItemPublicId, ItemRowId, OrderedItem, ParentId};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

// Stays below SQLITE_MAX_VARIABLE_NUMBER on every supported build.
const MAX_IDS_PER_LOOKUP: usize = 500;

pub(crate) const ITEM_SELECT_SQL: &str = "SELECT
    id,
    public_id,
    parent_uuid,
    position,
    payload,
    deleted_at,
    deleted_by,
    created_at,
    updated_at
FROM ordered_items";

/// Position of one active item as seen inside the current transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemLocation {
    pub id: ItemRowId,
    pub public_id: ItemPublicId,
    pub parent_id: ParentId,
    pub index: i64,
}

/// Loads one item by public id.
pub fn load_item(
    conn: &Connection,
    public_id: ItemPublicId,
    include_deleted: bool,
) -> OrderResult<Option<OrderedItem>> {
    let mut stmt = conn.prepare_cached(&format!(
        "{ITEM_SELECT_SQL}
         WHERE public_id = ?1
           AND (?2 = 1 OR deleted_at IS NULL);"
    ))?;
    let mut rows = stmt.query(params![public_id.to_string(), i64::from(include_deleted)])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_item_row(row)?));
    }
    Ok(None)
}

/// Loads one item by public id, including soft-deleted rows, or fails with
/// `ItemNotFound`.
pub(crate) fn load_required_item(
    conn: &Connection,
    public_id: ItemPublicId,
) -> OrderResult<OrderedItem> {
    load_item(conn, public_id, true)?.ok_or(OrderError::ItemNotFound(public_id))
}

/// Lists active items of one parent in ordering sequence.
pub fn list_active_items(conn: &Connection, parent_id: ParentId) -> OrderResult<Vec<OrderedItem>> {
    let mut stmt = conn.prepare_cached(&format!(
        "{ITEM_SELECT_SQL}
         WHERE parent_uuid = ?1
           AND deleted_at IS NULL
         ORDER BY position ASC, id ASC;"
    ))?;
    let mut rows = stmt.query([parent_id.to_string()])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse_item_row(row)?);
    }
    Ok(items)
}

/// Counts active items of one parent.
pub fn count_active_items(conn: &Connection, parent_id: ParentId) -> OrderResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*)
         FROM ordered_items
         WHERE parent_uuid = ?1
           AND deleted_at IS NULL;",
        [parent_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Resolves an active item to its current location, or `ItemNotFound`.
pub fn locate_active_item(
    conn: &Connection,
    public_id: ItemPublicId,
) -> OrderResult<ItemLocation> {
    let found: Option<(ItemRowId, String, i64)> = conn
        .query_row(
            "SELECT id, parent_uuid, position
             FROM ordered_items
             WHERE public_id = ?1
               AND deleted_at IS NULL;",
            [public_id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;

    let (id, parent_text, index) = found.ok_or(OrderError::ItemNotFound(public_id))?;
    Ok(ItemLocation {
        id,
        public_id,
        parent_id: parse_uuid(&parent_text, "ordered_items.parent_uuid")?,
        index,
    })
}

/// Registers a parent. Returns `false` when it already existed.
pub fn register_parent(conn: &Connection, parent_id: ParentId) -> OrderResult<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO parents (parent_uuid) VALUES (?1);",
        [parent_id.to_string()],
    )?;
    Ok(inserted == 1)
}

pub fn parent_exists(conn: &Connection, parent_id: ParentId) -> OrderResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM parents WHERE parent_uuid = ?1);",
        [parent_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

pub(crate) fn ensure_parent_exists(conn: &Connection, parent_id: ParentId) -> OrderResult<()> {
    if parent_exists(conn, parent_id)? {
        Ok(())
    } else {
        Err(OrderError::ParentNotFound(parent_id))
    }
}

/// Fails with `InvalidArgument` when any of `public_ids` is already stored,
/// active or soft-deleted.
pub(crate) fn ensure_public_ids_unused(
    conn: &Connection,
    public_ids: &[ItemPublicId],
) -> OrderResult<()> {
    for chunk in public_ids.chunks(MAX_IDS_PER_LOOKUP) {
        let placeholders = (1..=chunk.len())
            .map(|slot| format!("?{slot}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT public_id FROM ordered_items WHERE public_id IN ({placeholders}) LIMIT 1;"
        );
        let taken: Option<String> = conn
            .query_row(
                &sql,
                params_from_iter(chunk.iter().map(ToString::to_string)),
                |row| row.get(0),
            )
            .optional()?;
        if let Some(taken) = taken {
            return Err(OrderError::InvalidArgument(format!(
                "public id {taken} is already in use"
            )));
        }
    }
    Ok(())
}

pub(crate) fn parse_item_row(row: &Row<'_>) -> OrderResult<OrderedItem> {
    let public_text: String = row.get("public_id")?;
    let parent_text: String = row.get("parent_uuid")?;

    let index: i64 = row.get("position")?;
    if index < 0 {
        return Err(OrderError::InvalidData(format!(
            "negative position `{index}` in ordered_items.position"
        )));
    }

    let deleted_at: Option<i64> = row.get("deleted_at")?;
    let deleted_by: Option<String> = row.get("deleted_by")?;
    if deleted_at.is_some() != deleted_by.is_some() {
        return Err(OrderError::InvalidData(format!(
            "partial soft-delete markers on ordered item `{public_text}`"
        )));
    }

    Ok(OrderedItem {
        id: row.get("id")?,
        public_id: parse_uuid(&public_text, "ordered_items.public_id")?,
        parent_id: parse_uuid(&parent_text, "ordered_items.parent_uuid")?,
        index,
        payload: row.get("payload")?,
        deleted_at,
        deleted_by,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> OrderResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| OrderError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

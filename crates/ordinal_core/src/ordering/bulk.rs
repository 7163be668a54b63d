//! Batch insertion across one or more parents.
//!
//! # Responsibility
//! - Position each parent's rows after its existing active items, in
//!   ascending `relative_order_key` order.
//! - Write all rows with multi-row INSERT statements inside the caller's
//!   transaction.
//!
//! # Invariants
//! - Rows with equal keys keep their input order.
//! - Empty input performs no reads and no writes.

use super::allocator::allocate_append_index;
use super::records::{ensure_parent_exists, ensure_public_ids_unused};
use crate::error::{OrderError, OrderResult};
use crate::model::item::{BulkInsertEntry, ItemPublicId, ParentId};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

const COLUMNS_PER_ROW: usize = 4;
// Stays below SQLITE_MAX_VARIABLE_NUMBER on every supported build.
const MAX_ROWS_PER_STATEMENT: usize = 200;

/// Final position assigned to one input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRow {
    /// Offset of the row in the caller's input slice.
    pub input_slot: usize,
    pub parent_id: ParentId,
    pub public_id: ItemPublicId,
    pub index: i64,
}

/// Assigns positions given each parent's append base.
///
/// Output is ordered by parent, then by assigned index.
pub fn plan_positions(
    entries: &[BulkInsertEntry],
    bases: &BTreeMap<ParentId, i64>,
    public_ids: &[ItemPublicId],
) -> Vec<PlannedRow> {
    let mut planned = Vec::with_capacity(entries.len());
    for (parent_id, mut slots) in group_by_parent(entries) {
        slots.sort_by_key(|slot| entries[*slot].relative_order_key);
        let base = bases.get(&parent_id).copied().unwrap_or(0);
        for (offset, slot) in slots.into_iter().enumerate() {
            planned.push(PlannedRow {
                input_slot: slot,
                parent_id,
                public_id: public_ids[slot],
                index: base + offset as i64,
            });
        }
    }
    planned
}

/// Inserts the batch and returns the planned rows in input order.
pub fn bulk_insert_entries(
    conn: &Connection,
    entries: &[BulkInsertEntry],
) -> OrderResult<Vec<PlannedRow>> {
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let public_ids = resolve_public_ids(entries)?;
    let supplied: Vec<ItemPublicId> = entries.iter().filter_map(|entry| entry.public_id).collect();
    ensure_public_ids_unused(conn, &supplied)?;

    let mut bases = BTreeMap::new();
    for (parent_id, slots) in group_by_parent(entries) {
        ensure_parent_exists(conn, parent_id)?;
        let base = allocate_append_index(conn, parent_id)?;
        if base.checked_add(slots.len() as i64 - 1).is_none() {
            return Err(OrderError::InvalidArgument(format!(
                "parent {parent_id} cannot fit {} more items after position {base}",
                slots.len()
            )));
        }
        bases.insert(parent_id, base);
    }

    let planned = plan_positions(entries, &bases, &public_ids);
    for chunk in planned.chunks(MAX_ROWS_PER_STATEMENT) {
        insert_chunk(conn, entries, chunk)?;
    }

    let mut in_input_order = planned;
    in_input_order.sort_by_key(|row| row.input_slot);
    Ok(in_input_order)
}

fn group_by_parent(entries: &[BulkInsertEntry]) -> BTreeMap<ParentId, Vec<usize>> {
    let mut groups: BTreeMap<ParentId, Vec<usize>> = BTreeMap::new();
    for (slot, entry) in entries.iter().enumerate() {
        groups.entry(entry.parent_id).or_default().push(slot);
    }
    groups
}

fn resolve_public_ids(entries: &[BulkInsertEntry]) -> OrderResult<Vec<ItemPublicId>> {
    let mut seen = HashSet::with_capacity(entries.len());
    let mut ids = Vec::with_capacity(entries.len());
    for entry in entries {
        let id = entry.public_id.unwrap_or_else(Uuid::new_v4);
        if !seen.insert(id) {
            return Err(OrderError::InvalidArgument(format!(
                "public id {id} appears more than once in bulk insert"
            )));
        }
        ids.push(id);
    }
    Ok(ids)
}

fn insert_chunk(
    conn: &Connection,
    entries: &[BulkInsertEntry],
    chunk: &[PlannedRow],
) -> OrderResult<()> {
    let placeholders = (0..chunk.len())
        .map(|row| {
            let first = row * COLUMNS_PER_ROW + 1;
            format!(
                "(?{}, ?{}, ?{}, ?{})",
                first,
                first + 1,
                first + 2,
                first + 3
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO ordered_items (public_id, parent_uuid, position, payload) VALUES {placeholders};"
    );

    let mut bind_values: Vec<Value> = Vec::with_capacity(chunk.len() * COLUMNS_PER_ROW);
    for row in chunk {
        bind_values.push(Value::Text(row.public_id.to_string()));
        bind_values.push(Value::Text(row.parent_id.to_string()));
        bind_values.push(Value::Integer(row.index));
        bind_values.push(Value::Text(entries[row.input_slot].payload.clone()));
    }

    conn.execute(&sql, params_from_iter(bind_values))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::plan_positions;
    use crate::model::item::BulkInsertEntry;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    #[test]
    fn plan_sorts_each_parent_by_key_after_its_base() {
        let left = Uuid::new_v4();
        let right = Uuid::new_v4();
        let entries = vec![
            BulkInsertEntry::new(left, 2, "X"),
            BulkInsertEntry::new(right, 5, "R"),
            BulkInsertEntry::new(left, 1, "Y"),
        ];
        let ids: Vec<Uuid> = entries.iter().map(|_| Uuid::new_v4()).collect();
        let bases = BTreeMap::from([(left, 0), (right, 4)]);

        let mut planned = plan_positions(&entries, &bases, &ids);
        planned.sort_by_key(|row| row.input_slot);

        assert_eq!(planned[0].index, 1);
        assert_eq!(planned[1].index, 4);
        assert_eq!(planned[2].index, 0);
    }

    #[test]
    fn equal_keys_keep_input_order() {
        let parent = Uuid::new_v4();
        let entries = vec![
            BulkInsertEntry::new(parent, 1, "first"),
            BulkInsertEntry::new(parent, 0, "zero"),
            BulkInsertEntry::new(parent, 1, "second"),
        ];
        let ids: Vec<Uuid> = entries.iter().map(|_| Uuid::new_v4()).collect();
        let bases = BTreeMap::from([(parent, 10)]);

        let planned = plan_positions(&entries, &bases, &ids);
        let slots: Vec<(usize, i64)> = planned
            .iter()
            .map(|row| (row.input_slot, row.index))
            .collect();
        assert_eq!(slots, vec![(1, 10), (0, 11), (2, 12)]);
    }
}

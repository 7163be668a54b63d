//! Dense re-indexing of one parent.
//!
//! # Invariants
//! - After a run, active positions of the parent are exactly `0..n-1`.
//! - Relative order follows `(position, id)`, so duplicates resolve
//!   deterministically in insertion order.
//! - A second run rewrites nothing.

use crate::error::OrderResult;
use crate::model::item::ParentId;
use rusqlite::Connection;

/// Outcome of one compaction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionReport {
    pub parent_id: ParentId,
    pub active_count: i64,
    /// Rows whose position actually changed.
    pub rewritten: usize,
}

/// Rewrites active positions of `parent_id` to `0..n-1`.
pub fn compact_parent(conn: &Connection, parent_id: ParentId) -> OrderResult<CompactionReport> {
    let parent = parent_id.to_string();
    let rewritten = conn.execute(
        "UPDATE ordered_items
         SET position = ranked.dense_position,
             updated_at = (strftime('%s', 'now') * 1000)
         FROM (
             SELECT
                 id,
                 ROW_NUMBER() OVER (ORDER BY position ASC, id ASC) - 1 AS dense_position
             FROM ordered_items
             WHERE parent_uuid = ?1
               AND deleted_at IS NULL
         ) AS ranked
         WHERE ordered_items.id = ranked.id
           AND ordered_items.position <> ranked.dense_position;",
        [parent.as_str()],
    )?;

    let active_count = conn.query_row(
        "SELECT COUNT(*)
         FROM ordered_items
         WHERE parent_uuid = ?1
           AND deleted_at IS NULL;",
        [parent.as_str()],
        |row| row.get(0),
    )?;

    Ok(CompactionReport {
        parent_id,
        active_count,
        rewritten,
    })
}

#[cfg(test)]
mod tests {
    use super::compact_parent;
    use crate::db::open_db_in_memory;
    use crate::model::item::NewItem;
    use crate::ordering::allocator::append_item;
    use crate::ordering::records::{list_active_items, register_parent};
    use uuid::Uuid;

    #[test]
    fn compaction_breaks_ties_by_row_id_and_is_idempotent() {
        let conn = open_db_in_memory().expect("db should open");
        let parent = Uuid::new_v4();
        register_parent(&conn, parent).expect("parent should register");
        for name in ["a", "b", "c", "d"] {
            append_item(&conn, &NewItem::new(parent, name)).expect("append");
        }
        conn.execute_batch(
            "UPDATE ordered_items SET position = 7 WHERE payload IN ('a', 'c');
             UPDATE ordered_items SET position = 3 WHERE payload = 'd';",
        )
        .expect("scramble positions");

        let first = compact_parent(&conn, parent).expect("first compaction");
        assert_eq!(first.active_count, 4);
        assert!(first.rewritten > 0);

        let order: Vec<(String, i64)> = list_active_items(&conn, parent)
            .expect("list")
            .into_iter()
            .map(|item| (item.payload, item.index))
            .collect();
        assert_eq!(
            order,
            vec![
                ("b".to_string(), 0),
                ("d".to_string(), 1),
                ("a".to_string(), 2),
                ("c".to_string(), 3),
            ]
        );

        let second = compact_parent(&conn, parent).expect("second compaction");
        assert_eq!(second.rewritten, 0);
        let again: Vec<(String, i64)> = list_active_items(&conn, parent)
            .expect("list")
            .into_iter()
            .map(|item| (item.payload, item.index))
            .collect();
        assert_eq!(again, order);
    }
}

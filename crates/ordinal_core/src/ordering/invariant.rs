//! Post-mutation ordering invariant: detect duplicates, heal once, escalate.
//!
//! # Responsibility
//! - Provide the single routine every mutating entry point runs for each
//!   affected parent before commit.
//! - Provide read-only diagnostics for one parent.
//!
//! # Invariants
//! - Compaction is attempted at most once per check.
//! - Duplicates that survive compaction surface as `InvariantViolation`; the
//!   caller's transaction must then roll back.

use super::compactor::{compact_parent, CompactionReport};
use crate::error::{DuplicateIndex, OrderError, OrderResult};
use crate::model::item::ParentId;
use log::{error, warn};
use rusqlite::Connection;

/// Result of a successful invariant check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantOutcome {
    Clean,
    Healed {
        duplicates: Vec<DuplicateIndex>,
        compaction: CompactionReport,
    },
}

/// Read-only ordering diagnostics for one parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentOrderReport {
    pub parent_id: ParentId,
    pub active_count: i64,
    pub duplicates: Vec<DuplicateIndex>,
    /// Active positions are exactly `0..active_count`.
    pub is_dense: bool,
}

/// Returns every active position shared by more than one item.
pub fn find_duplicate_indices(
    conn: &Connection,
    parent_id: ParentId,
) -> OrderResult<Vec<DuplicateIndex>> {
    let mut stmt = conn.prepare_cached(
        "SELECT position, COUNT(*)
         FROM ordered_items
         WHERE parent_uuid = ?1
           AND deleted_at IS NULL
         GROUP BY position
         HAVING COUNT(*) > 1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([parent_id.to_string()])?;
    let mut duplicates = Vec::new();
    while let Some(row) = rows.next()? {
        duplicates.push(DuplicateIndex {
            index: row.get(0)?,
            count: row.get(1)?,
        });
    }
    Ok(duplicates)
}

/// Keeps active positions of `parent_id` unique.
///
/// Must run inside the mutation's transaction.
pub fn maintain_ordering_invariant(
    conn: &Connection,
    parent_id: ParentId,
) -> OrderResult<InvariantOutcome> {
    let duplicates = find_duplicate_indices(conn, parent_id)?;
    if duplicates.is_empty() {
        return Ok(InvariantOutcome::Clean);
    }

    warn!(
        "event=ordering_heal module=ordering status=start parent={} duplicate_groups={}",
        parent_id,
        duplicates.len()
    );
    let compaction = compact_parent(conn, parent_id)?;

    let remaining = find_duplicate_indices(conn, parent_id)?;
    if !remaining.is_empty() {
        error!(
            "event=ordering_heal module=ordering status=error parent={} duplicate_groups={} error_code=invariant_violation",
            parent_id,
            remaining.len()
        );
        return Err(OrderError::InvariantViolation {
            parent_id,
            duplicates: remaining,
        });
    }

    warn!(
        "event=ordering_heal module=ordering status=healed parent={} rewritten={} active_count={}",
        parent_id, compaction.rewritten, compaction.active_count
    );
    Ok(InvariantOutcome::Healed {
        duplicates,
        compaction,
    })
}

/// Reports duplicates and density for one parent without mutating it.
pub fn inspect_parent(conn: &Connection, parent_id: ParentId) -> OrderResult<ParentOrderReport> {
    let (active_count, min_index, max_index): (i64, i64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(MIN(position), 0), COALESCE(MAX(position), -1)
         FROM ordered_items
         WHERE parent_uuid = ?1
           AND deleted_at IS NULL;",
        [parent_id.to_string()],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;
    let duplicates = find_duplicate_indices(conn, parent_id)?;
    let is_dense = duplicates.is_empty()
        && (active_count == 0 || (min_index == 0 && max_index == active_count - 1));

    Ok(ParentOrderReport {
        parent_id,
        active_count,
        duplicates,
        is_dense,
    })
}

#[cfg(test)]
mod tests {
    use super::{inspect_parent, maintain_ordering_invariant, InvariantOutcome};
    use crate::db::open_db_in_memory;
    use crate::error::DuplicateIndex;
    use crate::model::item::NewItem;
    use crate::ordering::allocator::append_item;
    use crate::ordering::records::register_parent;
    use uuid::Uuid;

    fn parent_with(conn: &rusqlite::Connection, names: &[&str]) -> Uuid {
        let parent = Uuid::new_v4();
        register_parent(conn, parent).expect("parent should register");
        for name in names {
            append_item(conn, &NewItem::new(parent, *name)).expect("append");
        }
        parent
    }

    #[test]
    fn clean_parent_is_left_alone() {
        let conn = open_db_in_memory().expect("db should open");
        let parent = parent_with(&conn, &["a", "b"]);
        assert_eq!(
            maintain_ordering_invariant(&conn, parent).expect("check"),
            InvariantOutcome::Clean
        );
    }

    #[test]
    fn duplicates_are_healed_and_reported() {
        let conn = open_db_in_memory().expect("db should open");
        let parent = parent_with(&conn, &["a", "b", "c"]);
        conn.execute("UPDATE ordered_items SET position = 0 WHERE payload = 'c';", [])
            .expect("inject duplicate");

        let before = inspect_parent(&conn, parent).expect("inspect");
        assert!(!before.is_dense);
        assert_eq!(before.duplicates, vec![DuplicateIndex { index: 0, count: 2 }]);

        match maintain_ordering_invariant(&conn, parent).expect("heal") {
            InvariantOutcome::Healed { duplicates, .. } => {
                assert_eq!(duplicates, vec![DuplicateIndex { index: 0, count: 2 }]);
            }
            other => panic!("expected healed outcome, got {other:?}"),
        }

        let after = inspect_parent(&conn, parent).expect("inspect");
        assert!(after.is_dense);
        assert_eq!(after.active_count, 3);
    }

    #[test]
    fn gap_is_reported_as_not_dense_but_not_healed() {
        let conn = open_db_in_memory().expect("db should open");
        let parent = parent_with(&conn, &["a", "b"]);
        conn.execute("UPDATE ordered_items SET position = 5 WHERE payload = 'b';", [])
            .expect("inject gap");

        assert_eq!(
            maintain_ordering_invariant(&conn, parent).expect("check"),
            InvariantOutcome::Clean
        );
        let report = inspect_parent(&conn, parent).expect("inspect");
        assert!(report.duplicates.is_empty());
        assert!(!report.is_dense);
    }
}

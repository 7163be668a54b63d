//! Moving one item to a new index within its parent.
//!
//! # Responsibility
//! - Resolve the requested target index against the bounds policy.
//! - Shift the affected sibling range and place the moved item in one
//!   conditional UPDATE statement.
//!
//! # Invariants
//! - Never updates rows one by one; the whole parent scope changes atomically.
//! - Siblings outside the `[min(cur,target), max(cur,target)]` window are
//!   untouched.

use super::records::{count_active_items, ItemLocation};
use crate::config::IndexBoundsPolicy;
use crate::error::{OrderError, OrderResult};
use rusqlite::{params, Connection};

/// Sibling range that moves, and the direction it moves in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftPlan {
    pub from: i64,
    pub to: i64,
    /// Inclusive lower bound of shifted sibling positions.
    pub lower: i64,
    /// Inclusive upper bound of shifted sibling positions.
    pub upper: i64,
    /// `-1` for a forward move, `+1` for a backward move.
    pub delta: i64,
}

impl ShiftPlan {
    /// Returns `None` when the move is a no-op.
    pub fn new(from: i64, to: i64) -> Option<Self> {
        match from.cmp(&to) {
            std::cmp::Ordering::Equal => None,
            std::cmp::Ordering::Less => Some(Self {
                from,
                to,
                lower: from + 1,
                upper: to,
                delta: -1,
            }),
            std::cmp::Ordering::Greater => Some(Self {
                from,
                to,
                lower: to,
                upper: from - 1,
                delta: 1,
            }),
        }
    }
}

/// Applies the bounds policy to a requested target index.
///
/// `active_count` includes the item being moved.
pub fn apply_bounds(
    requested: i64,
    active_count: i64,
    policy: IndexBoundsPolicy,
) -> OrderResult<i64> {
    if requested < 0 {
        return Err(OrderError::InvalidArgument(format!(
            "target index must be non-negative, got {requested}"
        )));
    }

    let last = (active_count - 1).max(0);
    if requested <= last {
        return Ok(requested);
    }

    match policy {
        IndexBoundsPolicy::Clamp => Ok(last),
        IndexBoundsPolicy::Reject => Err(OrderError::InvalidArgument(format!(
            "target index {requested} is out of range 0..={last}"
        ))),
        // Appends after the moved item must still fit in an i64.
        IndexBoundsPolicy::Trust if requested.checked_add(active_count).is_none() => {
            Err(OrderError::InvalidArgument(format!(
                "target index {requested} leaves no room for later appends"
            )))
        }
        IndexBoundsPolicy::Trust => Ok(requested),
    }
}

/// Moves the located item to `requested`, shifting its siblings.
///
/// Returns the plan that was applied, or `None` for a no-op move.
pub fn reorder_item(
    conn: &Connection,
    location: &ItemLocation,
    requested: i64,
    policy: IndexBoundsPolicy,
) -> OrderResult<Option<ShiftPlan>> {
    let active_count = count_active_items(conn, location.parent_id)?;
    let target = apply_bounds(requested, active_count, policy)?;

    let Some(plan) = ShiftPlan::new(location.index, target) else {
        return Ok(None);
    };

    conn.execute(
        "UPDATE ordered_items
         SET position = CASE
                 WHEN id = ?1 THEN ?2
                 ELSE position + ?3
             END,
             updated_at = (strftime('%s', 'now') * 1000)
         WHERE parent_uuid = ?4
           AND deleted_at IS NULL
           AND (id = ?1 OR position BETWEEN ?5 AND ?6);",
        params![
            location.id,
            plan.to,
            plan.delta,
            location.parent_id.to_string(),
            plan.lower,
            plan.upper,
        ],
    )?;

    Ok(Some(plan))
}

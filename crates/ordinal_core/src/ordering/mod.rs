//! Set-based index maintenance for ordered collections.
//!
//! # Responsibility
//! - Allocate append positions, insert batches, move items, soft-delete
//!   items, and compact a parent's positions.
//! - Detect and heal duplicate positions after every mutation.
//!
//! # Invariants
//! - Every function here runs on a connection the caller has already placed
//!   inside a write transaction when it mutates; none of them commits.
//! - Sibling shifts are single UPDATE statements, never per-row loops.
//! - Among active items of one parent, positions are unique after every
//!   committed mutation.

pub mod allocator;
pub mod bulk;
pub mod compactor;
pub mod invariant;
pub mod records;
pub mod reorder;
pub mod soft_delete;

pub use allocator::allocate_append_index;
pub use compactor::{compact_parent, CompactionReport};
pub use invariant::{
    find_duplicate_indices, inspect_parent, maintain_ordering_invariant, InvariantOutcome,
    ParentOrderReport,
};
pub use records::ItemLocation;
pub use reorder::{apply_bounds, ShiftPlan};

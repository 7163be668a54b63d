//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Own transaction boundaries so the ordering components never commit.
//!
//! # Invariants
//! - Every mutation runs the ordering invariant before commit.
//! - Repository APIs return semantic errors (`ItemNotFound`,
//!   `ParentNotFound`) in addition to storage errors.

pub mod ordered_repo;

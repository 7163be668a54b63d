//! Ordered item domain model.
//!
//! # Responsibility
//! - Define the records exchanged between the engine and its domain caller.
//!
//! # Invariants
//! - Every item is identified by a stable internal id and a public `Uuid`.
//! - Deletion is represented by soft-delete markers, not hard delete.

pub mod item;

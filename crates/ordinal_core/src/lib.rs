//! Ordered collection index maintenance.
//! This crate is the single source of truth for per-parent ordering
//! invariants: unique, dense positions among active items.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod ordering;
pub mod repo;
pub mod service;

pub use config::{ConfigError, EngineConfig, IndexBoundsPolicy};
pub use error::{DuplicateIndex, OrderError, OrderResult};
pub use logging::{default_log_level, init_logging, init_logging_with_config, logging_status};
pub use model::item::{
    BulkInsertEntry, ItemPublicId, ItemRowId, NewItem, OrderedItem, ParentId,
};
pub use ordering::{CompactionReport, InvariantOutcome, ParentOrderReport};
pub use repo::ordered_repo::{OrderedItemRepository, SqliteOrderedItemRepository};
pub use service::ordering_service::OrderingService;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

//! Error taxonomy for ordering operations.
//!
//! # Invariants
//! - Every error returned from a mutating entry point means nothing was
//!   committed.
//! - `InvariantViolation` indicates a logic defect and is always fatal to the
//!   triggering request.

use crate::db::DbError;
use crate::model::item::{ItemPublicId, ParentId};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by ordering repository and service operations.
pub type OrderResult<T> = Result<T, OrderError>;

/// One `(parent, index)` group shared by more than one active item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateIndex {
    pub index: i64,
    pub count: i64,
}

#[derive(Debug)]
pub enum OrderError {
    /// Target item does not exist or is soft-deleted.
    ItemNotFound(ItemPublicId),
    /// Parent has not been registered.
    ParentNotFound(ParentId),
    /// Malformed caller input.
    InvalidArgument(String),
    /// Duplicate indices persisted after automatic compaction.
    InvariantViolation {
        parent_id: ParentId,
        duplicates: Vec<DuplicateIndex>,
    },
    /// Transaction or connection failure from SQLite.
    Storage(DbError),
    /// Persisted row cannot be decoded into an item.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
}

impl OrderError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ItemNotFound(_) | Self::ParentNotFound(_))
    }

    /// Errors a caller should surface to end users as a generic retryable
    /// failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. } | Self::Storage(_))
    }

    /// Stable short code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ItemNotFound(_) => "item_not_found",
            Self::ParentNotFound(_) => "parent_not_found",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::InvariantViolation { .. } => "invariant_violation",
            Self::Storage(_) => "storage_error",
            Self::InvalidData(_) => "invalid_data",
            Self::UninitializedConnection { .. } => "uninitialized_connection",
        }
    }
}

impl Display for OrderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ItemNotFound(id) => write!(f, "ordered item not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "parent not found: {id}"),
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::InvariantViolation {
                parent_id,
                duplicates,
            } => {
                write!(f, "duplicate indices persist for parent {parent_id}:")?;
                for duplicate in duplicates {
                    write!(f, " {}x{}", duplicate.index, duplicate.count)?;
                }
                Ok(())
            }
            Self::Storage(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid ordered item data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "ordering repository requires schema version {expected_version}, got {actual_version}"
            ),
        }
    }
}

impl Error for OrderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for OrderError {
    fn from(value: DbError) -> Self {
        Self::Storage(value)
    }
}

impl From<rusqlite::Error> for OrderError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(DbError::Sqlite(value))
    }
}

#[cfg(test)]
mod tests {
    use super::{DuplicateIndex, OrderError};
    use uuid::Uuid;

    #[test]
    fn classification_helpers() {
        assert!(OrderError::ItemNotFound(Uuid::nil()).is_not_found());
        assert!(OrderError::ParentNotFound(Uuid::nil()).is_not_found());
        assert!(!OrderError::InvalidArgument("x".into()).is_retryable());
        assert!(OrderError::from(rusqlite::Error::InvalidQuery).is_retryable());
    }

    #[test]
    fn violation_display_lists_groups() {
        let err = OrderError::InvariantViolation {
            parent_id: Uuid::nil(),
            duplicates: vec![DuplicateIndex { index: 2, count: 3 }],
        };
        let text = err.to_string();
        assert!(text.contains("2x3"));
        assert_eq!(err.code(), "invariant_violation");
    }
}

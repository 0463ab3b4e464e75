//! Storage error type

use linkstore_core::Error;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for storage operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Storage layer failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite failure
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O failure (creating database directories, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Commit-time validation found a row changed by another transaction
    #[error("transaction conflict on {entity} '{id}'")]
    Conflict {
        /// Entity kind of the contested row
        entity: &'static str,
        /// Identifier of the contested row
        id: String,
    },

    /// A uniqueness or foreign key constraint was violated
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Stored data could not be materialized
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// The store stayed locked by another transaction for the whole wait
    #[error("store busy: no transaction slot within {0:?}")]
    Busy(Duration),

    /// Failure injected by a test fault plan
    #[error("injected failure at {0}")]
    Injected(&'static str),
}

impl StoreError {
    /// Check if this is a commit-time conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    /// Reclassify SQLite constraint violations as [`StoreError::Constraint`]
    pub(crate) fn from_sqlite_write(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, message)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Constraint(message.clone().unwrap_or_else(|| code.to_string()))
            }
            _ => StoreError::Sqlite(err),
        }
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict { entity, id } => {
                Error::version_conflict(format!("{entity} '{id}' was modified concurrently"))
            }
            other => Error::internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkstore_core::ErrorKind;

    #[test]
    fn test_conflict_maps_to_version_conflict() {
        let err: Error = StoreError::Conflict {
            entity: "link type",
            id: "abc".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::VersionConflict);
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn test_other_errors_map_to_internal() {
        let err: Error = StoreError::Injected("commit").into();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.to_string().contains("injected failure at commit"));

        let err: Error = StoreError::Constraint("UNIQUE".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Internal);

        let err: Error = StoreError::Busy(Duration::from_millis(50)).into();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.to_string().contains("store busy"));
    }

    #[test]
    fn test_constraint_reclassification() {
        let failure = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
            Some("UNIQUE constraint failed".to_string()),
        );
        assert!(matches!(
            StoreError::from_sqlite_write(failure),
            StoreError::Constraint(msg) if msg.contains("UNIQUE")
        ));
        assert!(matches!(
            StoreError::from_sqlite_write(rusqlite::Error::QueryReturnedNoRows),
            StoreError::Sqlite(_)
        ));
    }
}

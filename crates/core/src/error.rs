//! Error types for link type persistence
//!
//! Every repository failure is classified into exactly one kind. Callers in
//! outer layers map `ErrorKind` onto their own transport responses.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use crate::view::ConversionError;
use thiserror::Error;

/// Result type alias for repository operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for link type persistence
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing input, or a referenced entity that must exist but does not
    #[error("bad parameter '{parameter}': {value}")]
    BadParameter {
        /// Name of the offending parameter or entity
        parameter: String,
        /// Offending value, rendered for humans
        value: String,
    },

    /// Requested entity is absent (malformed identifiers included)
    #[error("{entity} with id '{id}' not found")]
    NotFound {
        /// Entity kind that was looked up
        entity: &'static str,
        /// Identifier as supplied by the caller
        id: String,
    },

    /// Optimistic concurrency check failed
    #[error("version conflict: {0}")]
    VersionConflict(String),

    /// Unexpected storage failure
    #[error("internal error: {0}")]
    Internal(String),

    /// Failure mapping a caller view onto the stored entity, passed through unchanged
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

/// Discriminant of [`Error`] without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::BadParameter`]
    BadParameter,
    /// See [`Error::NotFound`]
    NotFound,
    /// See [`Error::VersionConflict`]
    VersionConflict,
    /// See [`Error::Internal`]
    Internal,
    /// See [`Error::Conversion`]
    Conversion,
}

impl Error {
    /// Create a BadParameter error
    pub fn bad_parameter(parameter: impl Into<String>, value: impl ToString) -> Self {
        Error::BadParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    /// Create a NotFound error
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Error::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Create a VersionConflict error
    pub fn version_conflict(message: impl Into<String>) -> Self {
        Error::VersionConflict(message.into())
    }

    /// Create an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal(message.into())
    }

    /// Kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BadParameter { .. } => ErrorKind::BadParameter,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::VersionConflict(_) => ErrorKind::VersionConflict,
            Error::Internal(_) => ErrorKind::Internal,
            Error::Conversion(_) => ErrorKind::Conversion,
        }
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Check if this is a VersionConflict error
    ///
    /// Callers receiving a conflict are expected to reload and retry.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::VersionConflict(_))
    }
}

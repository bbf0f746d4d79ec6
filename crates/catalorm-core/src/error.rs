//! Core error types.

use thiserror::Error;

/// Core engine errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A value was rejected by a field: empty non-nullable field, malformed
    /// email, uncoercible value, or a length/digit limit.
    #[error("validation error: {0}")]
    Validation(String),

    /// A descriptor is malformed, names an unknown kind, or describes a
    /// schema change the store cannot apply.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Store error, passed through unmodified.
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// No pooled connection became available in time.
    #[error("connection pool error: {0}")]
    Pool(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Access to a name that is not a field of a declared entity.
    #[error("unknown field `{field}` on `{table}`")]
    UnknownField {
        /// Table of the entity.
        table: String,
        /// Requested field name.
        field: String,
    },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    /// Check whether this is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Check whether this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    /// Check whether this error came from the store.
    pub fn is_store(&self) -> bool {
        matches!(self, Error::Store(_))
    }
}

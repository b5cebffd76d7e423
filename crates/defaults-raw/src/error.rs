//! Error types for raw store operations.

use thiserror::Error;

use crate::value::RawKind;

/// Errors that can occur while reading or writing the raw dictionary.
#[derive(Debug, Error)]
pub enum RawError {
    /// A stored value has a different primitive kind than the one requested.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: RawKind, found: RawKind },

    /// A stored integer does not fit the requested Rust integer type.
    #[error("integer {value} out of range for {target}")]
    OutOfRange { value: i64, target: &'static str },

    /// A stored float does not fit the requested Rust float type.
    #[error("float {value} out of range for {target}")]
    FloatOutOfRange { value: f64, target: &'static str },

    /// NaN and infinities have no representation in a JSON document.
    #[error("non-finite float cannot be persisted under `{name}`")]
    NonFinite { name: String },

    /// Serialization or deserialization of the backing document failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from a file-backed store.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A backend lock was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    Poisoned(String),
}

/// Convenience type alias for raw store operations.
pub type Result<T> = std::result::Result<T, RawError>;

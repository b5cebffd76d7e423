//! Error types for conversions, the defaults store, and the registry.

use defaults_raw::RawError;
use thiserror::Error;

/// Errors produced while converting between a raw value and a typed value.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The stored value has the wrong primitive kind or range.
    #[error(transparent)]
    Raw(#[from] RawError),

    /// The raw value could not be interpreted as the target type.
    #[error("cannot decode {type_name}: {reason}")]
    Decode {
        type_name: &'static str,
        reason: String,
    },

    /// The value could not be represented in the raw form.
    #[error("cannot encode {type_name}: {reason}")]
    Encode {
        type_name: &'static str,
        reason: String,
    },

    /// A raw-enum-backed value received a raw value with no matching case.
    #[error("{raw} is not a raw value of {type_name}")]
    UnknownRawValue { type_name: &'static str, raw: String },

    /// `None` reached an encoder; absent values are removed, never stored.
    #[error("a nil {type_name} cannot be stored")]
    NilNotStorable { type_name: &'static str },
}

/// Errors returned by the checked operations of [`Defaults`](crate::Defaults).
#[derive(Debug, Error)]
pub enum DefaultsError {
    /// The stored representation of a key could not be decoded.
    #[error("cannot decode key `{key}` as {expected}: {source}")]
    Decode {
        key: String,
        expected: &'static str,
        #[source]
        source: ConversionError,
    },

    /// A new value for a key could not be encoded.
    #[error("cannot encode key `{key}` of type {expected}: {source}")]
    Encode {
        key: String,
        expected: &'static str,
        #[source]
        source: ConversionError,
    },

    /// The raw store failed.
    #[error("raw store failure during {context}: {source}")]
    Backend {
        context: String,
        #[source]
        source: RawError,
    },
}

impl DefaultsError {
    pub(crate) fn backend(context: impl Into<String>) -> impl FnOnce(RawError) -> Self {
        let context = context.into();
        move |source| DefaultsError::Backend { context, source }
    }
}

/// Errors from the process-wide registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// `configure` was called after the registry was already in use.
    #[error("defaults registry is already initialized")]
    AlreadyInitialized,
}

/// Convenience alias used throughout the store.
pub type Result<T> = std::result::Result<T, DefaultsError>;

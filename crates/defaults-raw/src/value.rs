//! The primitive value model stored in the raw dictionary.
//!
//! A [`RawValue`] is what the underlying settings database can hold. Typed
//! layers never inspect it directly; they go through [`Primitive`], which
//! performs a checked extraction and reports a [`RawError::TypeMismatch`]
//! instead of casting blindly.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RawError, Result};

/// A primitive value held by a raw store.
///
/// Serialized externally tagged (`{"int": 3}`) so that every variant,
/// including byte blobs and floats without a fractional part, round-trips
/// through JSON unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Data(Vec<u8>),
    Array(Vec<RawValue>),
    Dict(BTreeMap<String, RawValue>),
}

/// The kind of a [`RawValue`], used in error messages and diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawKind {
    Bool,
    Int,
    Float,
    String,
    Data,
    Array,
    Dict,
}

impl RawValue {
    /// Returns the kind of this value.
    pub fn kind(&self) -> RawKind {
        match self {
            RawValue::Bool(_) => RawKind::Bool,
            RawValue::Int(_) => RawKind::Int,
            RawValue::Float(_) => RawKind::Float,
            RawValue::String(_) => RawKind::String,
            RawValue::Data(_) => RawKind::Data,
            RawValue::Array(_) => RawKind::Array,
            RawValue::Dict(_) => RawKind::Dict,
        }
    }

    /// Extract a typed primitive, consuming the raw value.
    pub fn into_primitive<P: Primitive>(self) -> Result<P> {
        P::from_raw(self)
    }

    /// Returns `false` if this value or anything nested in it is a NaN or
    /// infinite float.
    pub fn is_finite(&self) -> bool {
        match self {
            RawValue::Float(x) => x.is_finite(),
            RawValue::Array(items) => items.iter().all(RawValue::is_finite),
            RawValue::Dict(fields) => fields.values().all(RawValue::is_finite),
            _ => true,
        }
    }
}

impl fmt::Display for RawKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RawKind::Bool => "bool",
            RawKind::Int => "int",
            RawKind::Float => "float",
            RawKind::String => "string",
            RawKind::Data => "data",
            RawKind::Array => "array",
            RawKind::Dict => "dict",
        };
        f.write_str(name)
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Bool(b) => write!(f, "{b}"),
            RawValue::Int(i) => write!(f, "{i}"),
            RawValue::Float(x) => write!(f, "{x}"),
            RawValue::String(s) => write!(f, "{s:?}"),
            RawValue::Data(bytes) => write!(f, "<{} bytes>", bytes.len()),
            RawValue::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            RawValue::Dict(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key:?}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// A Rust type that maps directly onto one [`RawValue`] variant.
///
/// `from_raw` is the only way typed code reads a stored value, so a value
/// written by an external tool with the wrong kind surfaces as
/// [`RawError::TypeMismatch`] rather than a panic deep in a cast.
pub trait Primitive: Sized {
    /// Wrap this value in its raw variant.
    fn into_raw(self) -> RawValue;

    /// Checked extraction from a raw value.
    fn from_raw(raw: RawValue) -> Result<Self>;
}

macro_rules! primitive_variant {
    ($ty:ty, $variant:ident) => {
        impl Primitive for $ty {
            fn into_raw(self) -> RawValue {
                RawValue::$variant(self)
            }

            fn from_raw(raw: RawValue) -> Result<Self> {
                match raw {
                    RawValue::$variant(v) => Ok(v),
                    other => Err(RawError::TypeMismatch {
                        expected: RawKind::$variant,
                        found: other.kind(),
                    }),
                }
            }
        }
    };
}

primitive_variant!(bool, Bool);
primitive_variant!(i64, Int);
primitive_variant!(String, String);
primitive_variant!(Vec<u8>, Data);
primitive_variant!(Vec<RawValue>, Array);
primitive_variant!(BTreeMap<String, RawValue>, Dict);

macro_rules! primitive_narrow_int {
    ($ty:ty) => {
        impl Primitive for $ty {
            fn into_raw(self) -> RawValue {
                RawValue::Int(i64::from(self))
            }

            fn from_raw(raw: RawValue) -> Result<Self> {
                let value = i64::from_raw(raw)?;
                <$ty>::try_from(value).map_err(|_| RawError::OutOfRange {
                    value,
                    target: stringify!($ty),
                })
            }
        }
    };
}

primitive_narrow_int!(i32);
primitive_narrow_int!(u32);

// Floats accept stored integers: external writers often drop the fraction.
impl Primitive for f64 {
    fn into_raw(self) -> RawValue {
        RawValue::Float(self)
    }

    fn from_raw(raw: RawValue) -> Result<Self> {
        match raw {
            RawValue::Float(x) => Ok(x),
            RawValue::Int(i) => Ok(i as f64),
            other => Err(RawError::TypeMismatch {
                expected: RawKind::Float,
                found: other.kind(),
            }),
        }
    }
}

impl Primitive for f32 {
    fn into_raw(self) -> RawValue {
        RawValue::Float(f64::from(self))
    }

    fn from_raw(raw: RawValue) -> Result<Self> {
        let value = f64::from_raw(raw)?;
        let narrowed = value as f32;
        if value.is_finite() && narrowed.is_infinite() {
            return Err(RawError::FloatOutOfRange {
                value,
                target: "f32",
            });
        }
        Ok(narrowed)
    }
}

impl Primitive for RawValue {
    fn into_raw(self) -> RawValue {
        self
    }

    fn from_raw(raw: RawValue) -> Result<Self> {
        Ok(raw)
    }
}

//! Conversions between raw stored values and typed values.
//!
//! A [`ValueConversion`] is a stateless pair of pure functions. Conversion
//! types are never instantiated; a key names one through its associated
//! `Conversion` type, which also pins the conversion's value type to the
//! key's value type.
//!
//! | Conversion | Raw form | Value |
//! |------------|----------|-------|
//! | [`Passthrough<T>`] | `T` itself | any [`Primitive`] |
//! | [`Optional<C>`] | `C::Raw` | `Option<C::Value>` |
//! | [`Json<T>`] | JSON text | any serde type |
//! | [`Binary<T>`] | bincode bytes | any serde type |
//! | [`Dictionary<T>`] | string-keyed dict | any serde type encoding to a map |
//! | [`RawEnum<E>`] | `E::Raw` | a [`RawRepresentable`] enum |
//! | [`OrDefault<C>`] | `C::Raw` | `C::Value`, reads fall back to the key's default |
//!
//! Encoding failures are programming errors: a key whose value cannot be
//! represented by its conversion is misdeclared. The store treats them as
//! fatal. Decoding failures mean the stored data was written by someone
//! else; wrap the conversion in [`OrDefault`] to recover from them.

use std::any::type_name;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use defaults_raw::{Primitive, RawValue};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ConversionError;

/// Pure encode/decode pair between a raw representation and a typed value.
pub trait ValueConversion: 'static {
    /// The logical value type.
    type Value;
    /// The primitive form stored in the raw dictionary.
    type Raw: Primitive;

    /// Whether the store substitutes the key's default when decoding fails.
    const RECOVERS: bool = false;

    /// Interpret a raw primitive as a typed value.
    fn decode(raw: Self::Raw) -> Result<Self::Value, ConversionError>;

    /// Produce the raw primitive for a typed value.
    fn encode(value: &Self::Value) -> Result<Self::Raw, ConversionError>;

    /// Checked extraction of `Self::Raw` from an untyped value, then decode.
    fn decode_raw(raw: RawValue) -> Result<Self::Value, ConversionError> {
        Self::decode(Self::Raw::from_raw(raw)?)
    }

    /// Encode and wrap the result in its raw variant.
    fn encode_raw(value: &Self::Value) -> Result<RawValue, ConversionError> {
        Self::encode(value).map(Primitive::into_raw)
    }
}

/// Identity conversion for values the raw store holds natively.
pub struct Passthrough<T>(PhantomData<fn() -> T>);

impl<T: Primitive + Clone + 'static> ValueConversion for Passthrough<T> {
    type Value = T;
    type Raw = T;

    fn decode(raw: T) -> Result<T, ConversionError> {
        Ok(raw)
    }

    fn encode(value: &T) -> Result<T, ConversionError> {
        Ok(value.clone())
    }
}

/// Nil-representable wrapper: `Some` goes through `C`, `None` is never stored.
pub struct Optional<C>(PhantomData<fn() -> C>);

impl<C: ValueConversion> ValueConversion for Optional<C> {
    type Value = Option<C::Value>;
    type Raw = C::Raw;

    fn decode(raw: C::Raw) -> Result<Self::Value, ConversionError> {
        C::decode(raw).map(Some)
    }

    fn encode(value: &Self::Value) -> Result<C::Raw, ConversionError> {
        match value {
            Some(inner) => C::encode(inner),
            None => Err(ConversionError::NilNotStorable {
                type_name: type_name::<Self::Value>(),
            }),
        }
    }

    fn decode_raw(raw: RawValue) -> Result<Self::Value, ConversionError> {
        C::decode_raw(raw).map(Some)
    }

    fn encode_raw(value: &Self::Value) -> Result<RawValue, ConversionError> {
        match value {
            Some(inner) => C::encode_raw(inner),
            None => Err(ConversionError::NilNotStorable {
                type_name: type_name::<Self::Value>(),
            }),
        }
    }
}

/// Structured value stored as a JSON string.
pub struct Json<T>(PhantomData<fn() -> T>);

impl<T: Serialize + DeserializeOwned + 'static> ValueConversion for Json<T> {
    type Value = T;
    type Raw = String;

    fn decode(raw: String) -> Result<T, ConversionError> {
        serde_json::from_str(&raw).map_err(|e| ConversionError::Decode {
            type_name: type_name::<T>(),
            reason: e.to_string(),
        })
    }

    fn encode(value: &T) -> Result<String, ConversionError> {
        serde_json::to_string(value).map_err(|e| ConversionError::Encode {
            type_name: type_name::<T>(),
            reason: e.to_string(),
        })
    }
}

/// Structured value stored as a bincode blob.
pub struct Binary<T>(PhantomData<fn() -> T>);

impl<T: Serialize + DeserializeOwned + 'static> ValueConversion for Binary<T> {
    type Value = T;
    type Raw = Vec<u8>;

    fn decode(raw: Vec<u8>) -> Result<T, ConversionError> {
        bincode::deserialize(&raw).map_err(|e| ConversionError::Decode {
            type_name: type_name::<T>(),
            reason: e.to_string(),
        })
    }

    fn encode(value: &T) -> Result<Vec<u8>, ConversionError> {
        bincode::serialize(value).map_err(|e| ConversionError::Encode {
            type_name: type_name::<T>(),
            reason: e.to_string(),
        })
    }
}

/// Structured value stored as a string-keyed dictionary of primitives.
///
/// The value must serialize to a map (a struct or a map type). Null fields
/// are omitted from the stored dictionary and come back as absent, which
/// serde reads as `None` for optional fields.
pub struct Dictionary<T>(PhantomData<fn() -> T>);

impl<T: Serialize + DeserializeOwned + 'static> ValueConversion for Dictionary<T> {
    type Value = T;
    type Raw = BTreeMap<String, RawValue>;

    fn decode(raw: Self::Raw) -> Result<T, ConversionError> {
        let object = raw
            .into_iter()
            .map(|(k, v)| (k, raw_to_json(v)))
            .collect::<serde_json::Map<_, _>>();
        serde_json::from_value(serde_json::Value::Object(object)).map_err(|e| {
            ConversionError::Decode {
                type_name: type_name::<T>(),
                reason: e.to_string(),
            }
        })
    }

    fn encode(value: &T) -> Result<Self::Raw, ConversionError> {
        let encode_err = |reason: String| ConversionError::Encode {
            type_name: type_name::<T>(),
            reason,
        };
        match serde_json::to_value(value).map_err(|e| encode_err(e.to_string()))? {
            serde_json::Value::Object(object) => object_to_dict(object).map_err(encode_err),
            other => Err(encode_err(format!(
                "expected a map-like value, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn object_to_dict(
    object: serde_json::Map<String, serde_json::Value>,
) -> Result<BTreeMap<String, RawValue>, String> {
    let mut dict = BTreeMap::new();
    for (key, value) in object {
        if let Some(raw) = json_to_raw(value).map_err(|e| format!("field `{key}`: {e}"))? {
            dict.insert(key, raw);
        }
    }
    Ok(dict)
}

// `Ok(None)` means "null": skipped inside objects, rejected inside arrays.
fn json_to_raw(value: serde_json::Value) -> Result<Option<RawValue>, String> {
    use serde_json::Value;

    let raw = match value {
        Value::Null => return Ok(None),
        Value::Bool(b) => RawValue::Bool(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                RawValue::Int(i)
            } else if n.is_u64() {
                return Err(format!("integer {n} does not fit in 64-bit signed storage"));
            } else {
                RawValue::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => RawValue::String(s),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match json_to_raw(item)? {
                    Some(raw) => out.push(raw),
                    None => return Err("null array elements cannot be stored".to_string()),
                }
            }
            RawValue::Array(out)
        }
        Value::Object(object) => RawValue::Dict(object_to_dict(object)?),
    };
    Ok(Some(raw))
}

fn raw_to_json(raw: RawValue) -> serde_json::Value {
    use serde_json::Value;

    match raw {
        RawValue::Bool(b) => Value::Bool(b),
        RawValue::Int(i) => Value::from(i),
        RawValue::Float(x) => serde_json::Number::from_f64(x)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        RawValue::String(s) => Value::String(s),
        RawValue::Data(bytes) => Value::Array(bytes.into_iter().map(Value::from).collect()),
        RawValue::Array(items) => Value::Array(items.into_iter().map(raw_to_json).collect()),
        RawValue::Dict(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, raw_to_json(v)))
                .collect(),
        ),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// A type backed by a primitive raw value, typically a fieldless enum.
pub trait RawRepresentable: Sized {
    /// The primitive each case is stored as.
    type Raw: Primitive + fmt::Debug;

    /// The raw value of this case.
    fn raw_value(&self) -> Self::Raw;

    /// The case for a raw value, or `None` if no case matches.
    fn from_raw_value(raw: Self::Raw) -> Option<Self>;
}

/// Stores a [`RawRepresentable`] value as its raw primitive.
pub struct RawEnum<E>(PhantomData<fn() -> E>);

impl<E: RawRepresentable + 'static> ValueConversion for RawEnum<E> {
    type Value = E;
    type Raw = E::Raw;

    fn decode(raw: E::Raw) -> Result<E, ConversionError> {
        let shown = format!("{raw:?}");
        E::from_raw_value(raw).ok_or(ConversionError::UnknownRawValue {
            type_name: type_name::<E>(),
            raw: shown,
        })
    }

    fn encode(value: &E) -> Result<E::Raw, ConversionError> {
        Ok(value.raw_value())
    }
}

/// Wraps `C` so that reads of undecodable data yield the key's default.
///
/// Covers unknown enum cases and stored primitives of the wrong kind. The
/// conversion itself still reports the failure; the store recognizes
/// [`ValueConversion::RECOVERS`] and substitutes the default.
pub struct OrDefault<C>(PhantomData<fn() -> C>);

impl<C: ValueConversion> ValueConversion for OrDefault<C> {
    type Value = C::Value;
    type Raw = C::Raw;

    const RECOVERS: bool = true;

    fn decode(raw: C::Raw) -> Result<C::Value, ConversionError> {
        C::decode(raw)
    }

    fn encode(value: &C::Value) -> Result<C::Raw, ConversionError> {
        C::encode(value)
    }

    fn decode_raw(raw: RawValue) -> Result<C::Value, ConversionError> {
        C::decode_raw(raw)
    }

    fn encode_raw(value: &C::Value) -> Result<RawValue, ConversionError> {
        C::encode_raw(value)
    }
}

/// The conventional conversion for a value type.
///
/// Primitives pass through unchanged and `Option<T>` wraps `T`'s
/// conversion. Structured types pick [`Json`], [`Binary`], [`Dictionary`]
/// or [`RawEnum`] explicitly, or implement this trait to make the choice
/// once for every key of that type.
pub trait HasDefaultConversion: Sized {
    type Conversion: ValueConversion<Value = Self>;
}

macro_rules! passthrough_default {
    ($($ty:ty),* $(,)?) => {
        $(
            impl HasDefaultConversion for $ty {
                type Conversion = Passthrough<$ty>;
            }
        )*
    };
}

passthrough_default!(
    bool,
    i32,
    i64,
    u32,
    f32,
    f64,
    String,
    Vec<u8>,
    Vec<RawValue>,
    BTreeMap<String, RawValue>,
    RawValue,
);

impl<T: HasDefaultConversion> HasDefaultConversion for Option<T> {
    type Conversion = Optional<T::Conversion>;
}

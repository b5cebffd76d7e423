//! Write policies: when a write deletes, persists, or is ignored.
//!
//! A policy is a strategy type chosen per key. The conventional choice
//! depends on what the value type can do:
//!
//! - nil-representable (`Option<T>`): [`NilPolicy`] removes on `None`
//! - equatable: [`EquatablePolicy`] removes when the value equals the default
//! - anything else: [`AlwaysOverwrite`] never removes and always stores
//!
//! [`HasDefaultPolicy`] records that choice for a value type so that key
//! declarations pick it up without naming it.

/// Strategy deciding the fate of a write.
pub trait WritePolicy<V> {
    /// Whether writing `new` should delete the entry instead of storing it.
    fn should_remove(new: &V, default: &V) -> bool;

    /// Whether `new` should replace `old` in storage.
    fn should_overwrite(old: &V, new: &V, default: &V) -> bool;
}

/// Policy for nil-representable values: `None` deletes the entry.
///
/// A write is stored only if it differs from both the default and the
/// current value. With a non-`None` default, writing `Some(default)` over
/// another value is therefore skipped and the old value stays; restore the
/// default with `None` or an explicit remove instead.
#[derive(Clone, Copy, Debug, Default)]
pub struct NilPolicy;

impl<T: PartialEq> WritePolicy<Option<T>> for NilPolicy {
    fn should_remove(new: &Option<T>, _default: &Option<T>) -> bool {
        new.is_none()
    }

    fn should_overwrite(old: &Option<T>, new: &Option<T>, default: &Option<T>) -> bool {
        new != default && new != old
    }
}

/// Policy for equatable values: writing the default deletes the entry, and
/// writing the current value is skipped.
#[derive(Clone, Copy, Debug, Default)]
pub struct EquatablePolicy;

impl<V: PartialEq> WritePolicy<V> for EquatablePolicy {
    fn should_remove(new: &V, default: &V) -> bool {
        new == default
    }

    fn should_overwrite(old: &V, new: &V, default: &V) -> bool {
        new != default && new != old
    }
}

/// Policy for values without equality: every write is stored.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysOverwrite;

impl<V> WritePolicy<V> for AlwaysOverwrite {
    fn should_remove(_new: &V, _default: &V) -> bool {
        false
    }

    fn should_overwrite(_old: &V, _new: &V, _default: &V) -> bool {
        true
    }
}

/// The conventional policy for a value type.
pub trait HasDefaultPolicy: Sized {
    type Policy: WritePolicy<Self>;
}

macro_rules! equatable_default {
    ($($ty:ty),* $(,)?) => {
        $(
            impl HasDefaultPolicy for $ty {
                type Policy = EquatablePolicy;
            }
        )*
    };
}

equatable_default!(
    bool,
    i32,
    i64,
    u32,
    f32,
    f64,
    String,
    defaults_raw::RawValue,
);

impl<T: PartialEq> HasDefaultPolicy for Vec<T> {
    type Policy = EquatablePolicy;
}

impl<K: PartialEq, V: PartialEq> HasDefaultPolicy for std::collections::BTreeMap<K, V> {
    type Policy = EquatablePolicy;
}

impl<T: PartialEq> HasDefaultPolicy for Option<T> {
    type Policy = NilPolicy;
}

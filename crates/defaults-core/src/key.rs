//! The typed key contract.
//!
//! A key is a zero-sized type, not a runtime value. Everything the store
//! needs to know about a setting is attached to that type: the name it is
//! stored under, its default, its conversion and its write policy.
//!
//! ```
//! use defaults_core::{defaults_key, Defaults, Key};
//!
//! defaults_key! {
//!     /// Whether the sidebar is shown.
//!     pub struct ShowSidebar: bool = true;
//! }
//!
//! let store = Defaults::in_memory();
//! assert_eq!(ShowSidebar::name(), "ShowSidebar");
//! assert!(store.get::<ShowSidebar>());
//! ```

use crate::conversion::ValueConversion;
use crate::policy::WritePolicy;

/// A named, typed identifier for one setting.
///
/// `Conversion::Value == Value` is enforced by the associated type bound.
/// Names must be unique per key within one store; two keys sharing a name
/// but not a value type is a programming error.
pub trait Key: 'static {
    /// The typed value read and written through this key.
    type Value: Clone + Send + Sync + 'static;

    /// How the value is represented in the raw store.
    type Conversion: ValueConversion<Value = Self::Value>;

    /// The remove/overwrite strategy.
    type Policy: WritePolicy<Self::Value>;

    /// The name this key is stored under.
    ///
    /// Defaults to the key type's own identifier.
    fn name() -> &'static str {
        type_identifier::<Self>()
    }

    /// The value returned while nothing is stored.
    fn default_value() -> Self::Value;

    /// Whether writing `new` should delete the entry instead.
    fn should_remove(new: &Self::Value) -> bool {
        <Self::Policy as WritePolicy<Self::Value>>::should_remove(new, &Self::default_value())
    }

    /// Whether `new` should replace `old` in storage.
    fn should_overwrite(old: &Self::Value, new: &Self::Value) -> bool {
        <Self::Policy as WritePolicy<Self::Value>>::should_overwrite(
            old,
            new,
            &Self::default_value(),
        )
    }
}

/// The last path segment of a type's name, without generic arguments.
pub fn type_identifier<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Declare a key type.
///
/// ```
/// use defaults_core::conversion::Json;
/// use defaults_core::policy::AlwaysOverwrite;
/// use defaults_core::defaults_key;
///
/// defaults_key! {
///     /// A plain boolean, stored under "DarkMode".
///     pub struct DarkMode: bool = false;
/// }
///
/// defaults_key! {
///     /// An optional string; writing `None` removes it.
///     pub struct Nickname: Option<String> = None, name = "user.nickname";
/// }
///
/// defaults_key! {
///     /// A list stored as JSON text, stored on every write.
///     pub struct Recent: Vec<String> = Vec::new(),
///         conversion = Json<Vec<String>>,
///         policy = AlwaysOverwrite;
/// }
/// ```
///
/// `conversion` defaults to the value type's
/// [`HasDefaultConversion`](crate::HasDefaultConversion) and `policy` to its
/// [`HasDefaultPolicy`](crate::HasDefaultPolicy). Options must appear in the
/// order `name`, `conversion`, `policy`.
#[macro_export]
macro_rules! defaults_key {
    (
        $(#[$meta:meta])*
        $vis:vis struct $ident:ident : $value:ty = $default:expr
        $(, name = $name:literal)?
        $(, conversion = $conversion:ty)?
        $(, policy = $policy:ty)?
        ;
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
        $vis struct $ident;

        impl $crate::Key for $ident {
            type Value = $value;
            type Conversion = $crate::__or_default_type!(
                $($conversion)? ; <$value as $crate::HasDefaultConversion>::Conversion
            );
            type Policy = $crate::__or_default_type!(
                $($policy)? ; <$value as $crate::HasDefaultPolicy>::Policy
            );

            $(
                fn name() -> &'static str {
                    $name
                }
            )?

            fn default_value() -> Self::Value {
                $default
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __or_default_type {
    (; $($fallback:tt)+) => {
        $($fallback)+
    };
    ($given:ty ; $($fallback:tt)+) => {
        $given
    };
}

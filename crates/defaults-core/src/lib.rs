//! Typed defaults on top of an untyped settings dictionary.
//!
//! Callers declare keys -- zero-sized types carrying a name, a default, a
//! conversion and a write policy -- and read and write through them. The
//! raw dictionary, its string names and its primitive values stay hidden.
//!
//! # Layers
//!
//! - [`conversion`] -- pure encode/decode between [`RawValue`] and typed values
//! - [`policy`] -- when a write deletes, persists, or is ignored
//! - [`key`] -- the [`Key`] contract and the [`defaults_key!`] macro
//! - [`store`] -- [`Defaults`], the cached and optionally observable engine
//! - [`binding`] -- [`Setting`], [`Projected`] and [`Binding`] accessors
//! - [`registry`] -- the process-wide `standard` and `observable` instances
//!
//! ```
//! use defaults_core::{defaults_key, Defaults, WriteOutcome};
//!
//! defaults_key! {
//!     pub struct Greeting: Option<String> = None;
//! }
//!
//! let store = Defaults::in_memory();
//! assert_eq!(store.set::<Greeting>(Some("Hello!".into())), WriteOutcome::Stored);
//! assert_eq!(store.get::<Greeting>().as_deref(), Some("Hello!"));
//! assert_eq!(store.set::<Greeting>(None), WriteOutcome::Removed);
//! ```

pub mod binding;
pub mod conversion;
pub mod error;
pub mod key;
pub mod notify;
pub mod policy;
pub mod registry;
pub mod store;

pub use binding::{Binding, Lens, Projected, Setting};
pub use conversion::{
    Binary, Dictionary, HasDefaultConversion, Json, Optional, OrDefault, Passthrough, RawEnum,
    RawRepresentable, ValueConversion,
};
pub use error::{ConversionError, DefaultsError, RegistryError, Result};
pub use key::{type_identifier, Key};
pub use notify::{ChangeEvent, ChangeKind, ChangeStream};
pub use policy::{AlwaysOverwrite, EquatablePolicy, HasDefaultPolicy, NilPolicy, WritePolicy};
pub use store::{Defaults, DefaultsConfig, WriteOutcome};

pub use defaults_raw::{RawKind, RawStore, RawValue};

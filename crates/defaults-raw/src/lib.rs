//! Raw persistent dictionary for typed defaults.
//!
//! This crate is the untyped bottom layer: a string-keyed dictionary whose
//! values are primitive [`RawValue`]s (bool, integer, float, string, bytes,
//! arrays and nested dictionaries). It knows nothing about keys, defaults or
//! policies -- `defaults-core` builds those on top.
//!
//! # Backends
//!
//! All backends implement the [`RawStore`] trait:
//!
//! - [`InMemoryRawStore`] -- `HashMap`-based store for tests and embedding
//! - [`FileRawStore`] -- JSON document on disk, durable across restarts
//!
//! # Design Rules
//!
//! 1. The store never interprets values beyond their [`RawKind`].
//! 2. Extracting a Rust value from a [`RawValue`] is always a checked
//!    conversion through [`Primitive`]; there are no unchecked casts.
//! 3. Every operation is synchronous and returns once the backend is updated.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;
pub mod value;

pub use error::{RawError, Result};
pub use file::{FileRawStore, FileStoreConfig, SyncMode};
pub use memory::InMemoryRawStore;
pub use traits::RawStore;
pub use value::{Primitive, RawKind, RawValue};

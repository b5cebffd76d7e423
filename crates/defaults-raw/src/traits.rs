//! The [`RawStore`] trait defining the raw dictionary interface.
//!
//! Any backend (in-memory, JSON file, a platform settings database)
//! implements this trait to give the typed layer somewhere to persist values.

use std::collections::BTreeSet;

use crate::error::Result;
use crate::value::RawValue;

/// Storage backend for the untyped settings dictionary.
///
/// Implementations must be thread-safe (`Send + Sync`) and make each call
/// atomic on its own. There is no multi-key transaction: callers that need
/// ordering across keys provide it themselves.
pub trait RawStore: Send + Sync {
    /// Read the value stored under `name`.
    ///
    /// Returns `Ok(None)` if nothing is stored there.
    fn get(&self, name: &str) -> Result<Option<RawValue>>;

    /// Store `value` under `name`, replacing any previous value.
    fn set(&self, name: &str, value: RawValue) -> Result<()>;

    /// Delete the value stored under `name`.
    ///
    /// Returns `Ok(true)` if a value existed and was removed.
    fn remove(&self, name: &str) -> Result<bool>;

    /// Names of every entry currently present.
    fn keys(&self) -> Result<BTreeSet<String>>;

    /// Check whether an entry is present under `name`.
    fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.get(name)?.is_some())
    }

    /// Number of entries currently present.
    fn len(&self) -> Result<usize> {
        Ok(self.keys()?.len())
    }

    /// Returns `true` if no entries are present.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

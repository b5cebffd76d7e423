//! In-memory raw store for testing and ephemeral use.
//!
//! [`InMemoryRawStore`] keeps every entry in a `HashMap` protected by a
//! `RwLock`. Data is lost when the store is dropped.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use crate::error::{RawError, Result};
use crate::traits::RawStore;
use crate::value::RawValue;

/// An in-memory implementation of [`RawStore`].
pub struct InMemoryRawStore {
    entries: RwLock<HashMap<String, RawValue>>,
}

impl InMemoryRawStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store pre-populated with the given entries.
    pub fn with_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, RawValue)>,
    {
        Self {
            entries: RwLock::new(entries.into_iter().collect()),
        }
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.write().expect("lock poisoned").clear();
    }

    /// Number of entries currently stored.
    pub fn entry_count(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }
}

impl Default for InMemoryRawStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RawStore for InMemoryRawStore {
    fn get(&self, name: &str) -> Result<Option<RawValue>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| RawError::Poisoned(e.to_string()))?;
        Ok(entries.get(name).cloned())
    }

    fn set(&self, name: &str, value: RawValue) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| RawError::Poisoned(e.to_string()))?;
        entries.insert(name.to_string(), value);
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<bool> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| RawError::Poisoned(e.to_string()))?;
        Ok(entries.remove(name).is_some())
    }

    fn keys(&self) -> Result<BTreeSet<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| RawError::Poisoned(e.to_string()))?;
        Ok(entries.keys().cloned().collect())
    }

    fn contains(&self, name: &str) -> Result<bool> {
        let entries = self
            .entries
            .read()
            .map_err(|e| RawError::Poisoned(e.to_string()))?;
        Ok(entries.contains_key(name))
    }
}

impl std::fmt::Debug for InMemoryRawStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRawStore")
            .field("entry_count", &self.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let store = InMemoryRawStore::new();
        store.set("toggle", RawValue::Bool(true)).unwrap();
        assert_eq!(store.get("toggle").unwrap(), Some(RawValue::Bool(true)));
    }

    #[test]
    fn get_missing_returns_none() {
        let store = InMemoryRawStore::new();
        assert!(store.get("missing").unwrap().is_none());
        assert!(!store.contains("missing").unwrap());
    }

    #[test]
    fn set_replaces_previous_value() {
        let store = InMemoryRawStore::new();
        store.set("count", RawValue::Int(1)).unwrap();
        store.set("count", RawValue::Int(2)).unwrap();
        assert_eq!(store.get("count").unwrap(), Some(RawValue::Int(2)));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn remove_reports_presence() {
        let store = InMemoryRawStore::new();
        store.set("name", RawValue::String("a".into())).unwrap();
        assert!(store.remove("name").unwrap());
        assert!(!store.contains("name").unwrap());
        assert!(!store.remove("name").unwrap());
    }

    #[test]
    fn keys_are_sorted() {
        let store = InMemoryRawStore::new();
        for name in ["b", "c", "a"] {
            store.set(name, RawValue::Int(0)).unwrap();
        }
        let keys: Vec<String> = store.keys().unwrap().into_iter().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn with_entries_and_clear() {
        let store = InMemoryRawStore::with_entries(vec![
            ("x".to_string(), RawValue::Bool(false)),
            ("y".to_string(), RawValue::Float(0.25)),
        ]);
        assert_eq!(store.entry_count(), 2);
        assert!(!store.is_empty().unwrap());

        store.clear();
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn concurrent_writers_are_safe() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryRawStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store.set(&format!("key-{i}"), RawValue::Int(i)).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }
        assert_eq!(store.len().unwrap(), 8);
    }

    #[test]
    fn debug_format() {
        let store = InMemoryRawStore::new();
        store.set("x", RawValue::Int(1)).unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryRawStore"));
        assert!(debug.contains("entry_count"));
    }
}

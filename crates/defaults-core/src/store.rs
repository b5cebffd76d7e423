//! The defaults store: typed access to a raw dictionary.
//!
//! [`Defaults`] sits between typed keys and a [`RawStore`]. Reads go
//! through an in-memory cache, then the raw store, then the key's default.
//! Writes run a small state machine per key:
//!
//! ```text
//!         should_remove(new)
//!   WRITE ──────────────────────────► REMOVED  (store + cache, notify)
//!     │
//!     │ old = get()
//!     │ !should_overwrite(old, new)
//!     ├──────────────────────────────► SKIPPED  (nothing happens)
//!     │
//!     ▼
//!   STORED  (encode, store + cache, notify)
//! ```
//!
//! # Failure policy
//!
//! Every typed operation has a checked form (`try_get`, `try_set`) that
//! returns [`DefaultsError`], and a fail-fast form (`get`, `set`) that
//! panics with the key name and expected type. A well-declared key cannot
//! fail on its own; only a corrupted or unavailable raw store can, and that
//! is treated as unrecoverable state rather than routine error handling.
//!
//! # Concurrency
//!
//! A `Defaults` is `Send + Sync`. The cache sits behind an `RwLock` and
//! writes are serialized by a mutex, so each write's remove/compare/store
//! sequence is atomic with respect to other writes. A read that misses the
//! cache also takes the mutex, so it can never cache a value older than a
//! write that completed before it. Views created with [`Defaults::share`]
//! use the same cache and mutex. Nothing spans several keys.

use std::any::{type_name, Any};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockWriteGuard};

use defaults_raw::{InMemoryRawStore, RawStore};
use tracing::{debug, error, trace, warn};

use crate::binding::Setting;
use crate::conversion::ValueConversion;
use crate::error::{DefaultsError, Result};
use crate::key::Key;
use crate::notify::{ChangeEvent, ChangeNotifier, ChangeStream};

/// Configuration for a [`Defaults`] instance.
#[derive(Clone, Debug)]
pub struct DefaultsConfig {
    /// Keep decoded values in memory between reads.
    pub cache: bool,
    /// Publish a [`ChangeEvent`] for every mutation.
    pub notify: bool,
    /// Capacity of the change broadcast channel.
    pub channel_capacity: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            cache: true,
            notify: false,
            channel_capacity: 64,
        }
    }
}

impl DefaultsConfig {
    /// Cached and notifying.
    pub fn observable() -> Self {
        Self {
            notify: true,
            ..Self::default()
        }
    }
}

/// What a write did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WriteOutcome {
    /// The entry was deleted.
    Removed,
    /// The policy declined the write; nothing changed.
    Skipped,
    /// The new value was persisted.
    Stored,
}

struct CacheEntry {
    value: Box<dyn Any + Send + Sync>,
    /// Whether the raw store held the key when this entry was cached.
    persisted: bool,
}

/// State common to every view of one store.
#[derive(Default)]
struct Shared {
    cache: RwLock<HashMap<String, CacheEntry>>,
    write_lock: Mutex<()>,
}

/// Typed, cached, optionally observable view of a raw dictionary.
pub struct Defaults {
    raw: Arc<dyn RawStore>,
    shared: Arc<Shared>,
    caching: bool,
    notifier: Option<ChangeNotifier>,
}

impl Defaults {
    /// A plain (non-notifying) store with caching.
    pub fn new(raw: Arc<dyn RawStore>) -> Self {
        Self::with_config(raw, DefaultsConfig::default())
    }

    /// A cached store that publishes change notifications.
    pub fn observable(raw: Arc<dyn RawStore>) -> Self {
        Self::with_config(raw, DefaultsConfig::observable())
    }

    pub fn with_config(raw: Arc<dyn RawStore>, config: DefaultsConfig) -> Self {
        Self::build(raw, Arc::default(), config)
    }

    /// Another view of the same raw dictionary, cache and write lock, with
    /// its own configuration.
    ///
    /// A write through either view is seen by reads through both.
    /// Notifications are per view: subscribers hear about writes made
    /// through the view they subscribed to.
    pub fn share(&self, config: DefaultsConfig) -> Self {
        Self::build(Arc::clone(&self.raw), Arc::clone(&self.shared), config)
    }

    fn build(raw: Arc<dyn RawStore>, shared: Arc<Shared>, config: DefaultsConfig) -> Self {
        Self {
            raw,
            shared,
            caching: config.cache,
            notifier: config
                .notify
                .then(|| ChangeNotifier::new(config.channel_capacity)),
        }
    }

    /// A plain store over a fresh in-memory dictionary.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryRawStore::new()))
    }

    /// The underlying raw dictionary.
    ///
    /// Writing through it bypasses policies, the cache and notifications;
    /// call [`reconcile`](Self::reconcile) or
    /// [`invalidate_all`](Self::invalidate_all) afterwards.
    pub fn raw(&self) -> &Arc<dyn RawStore> {
        &self.raw
    }

    /// Returns `true` if this store publishes change notifications.
    pub fn is_observable(&self) -> bool {
        self.notifier.is_some()
    }

    /// Subscribe to change notifications. `None` for plain stores.
    pub fn subscribe(&self) -> Option<ChangeStream> {
        self.notifier.as_ref().map(ChangeNotifier::subscribe)
    }

    /// Number of live change subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.notifier
            .as_ref()
            .map(ChangeNotifier::subscriber_count)
            .unwrap_or(0)
    }

    /// A typed accessor bound to this store.
    pub fn setting<K: Key>(&self) -> Setting<'_, K> {
        Setting::new(self)
    }

    // ---- Reads ----

    /// Read a key, failing fast on decode or backend errors.
    pub fn get<K: Key>(&self) -> K::Value {
        self.try_get::<K>().unwrap_or_else(|err| fatal(err))
    }

    /// Read a key: cache, then raw store, then the key's default.
    pub fn try_get<K: Key>(&self) -> Result<K::Value> {
        if let Some(value) = self.cached::<K>() {
            trace!(key = K::name(), "cache hit");
            return Ok(value);
        }
        let _guard = self.write_lock();
        self.read_through::<K>()
    }

    /// The cache-miss path of [`try_get`](Self::try_get). Callers hold the
    /// write lock, so no write lands between the raw read and the insert.
    fn read_through<K: Key>(&self) -> Result<K::Value> {
        let name = K::name();
        if let Some(value) = self.cached::<K>() {
            return Ok(value);
        }

        let stored = self
            .raw
            .get(name)
            .map_err(DefaultsError::backend(format!("get `{name}`")))?;
        let persisted = stored.is_some();
        let value = match stored {
            None => K::default_value(),
            Some(raw) => match <K::Conversion as ValueConversion>::decode_raw(raw) {
                Ok(value) => value,
                Err(err) if <K::Conversion as ValueConversion>::RECOVERS => {
                    warn!(key = name, error = %err, "undecodable value, using default");
                    K::default_value()
                }
                Err(source) => {
                    return Err(DefaultsError::Decode {
                        key: name.to_string(),
                        expected: type_name::<K::Value>(),
                        source,
                    })
                }
            },
        };

        self.cache_insert(name, value.clone(), persisted);
        Ok(value)
    }

    /// Whether the key is present in the raw store (customized by a write).
    pub fn is_customized<K: Key>(&self) -> Result<bool> {
        let name = K::name();
        self.raw
            .contains(name)
            .map_err(DefaultsError::backend(format!("contains `{name}`")))
    }

    /// Names of every entry present in the raw store.
    pub fn names(&self) -> Result<BTreeSet<String>> {
        self.raw.keys().map_err(DefaultsError::backend("keys"))
    }

    // ---- Writes ----

    /// Write a key, failing fast on encode or backend errors.
    pub fn set<K: Key>(&self, value: K::Value) -> WriteOutcome {
        self.try_set::<K>(value).unwrap_or_else(|err| fatal(err))
    }

    /// Write a key through its remove/overwrite policy.
    pub fn try_set<K: Key>(&self, value: K::Value) -> Result<WriteOutcome> {
        let name = K::name();
        let _guard = self.write_lock();

        if K::should_remove(&value) {
            self.cache_remove(name);
            let existed = self
                .raw
                .remove(name)
                .map_err(DefaultsError::backend(format!("remove `{name}`")))?;
            debug!(key = name, existed, "removed");
            self.publish(ChangeEvent::removed(name));
            return Ok(WriteOutcome::Removed);
        }

        let old = self.read_through::<K>()?;
        if !K::should_overwrite(&old, &value) {
            trace!(key = name, "write skipped by policy");
            return Ok(WriteOutcome::Skipped);
        }

        let raw = <K::Conversion as ValueConversion>::encode_raw(&value).map_err(|source| {
            DefaultsError::Encode {
                key: name.to_string(),
                expected: type_name::<K::Value>(),
                source,
            }
        })?;
        self.raw
            .set(name, raw)
            .map_err(DefaultsError::backend(format!("set `{name}`")))?;
        self.cache_insert(name, value, true);
        debug!(key = name, "stored");
        self.publish(ChangeEvent::stored(name));
        Ok(WriteOutcome::Stored)
    }

    /// Delete a key regardless of its policy, restoring its default.
    ///
    /// Returns `true` if the key was present.
    pub fn remove<K: Key>(&self) -> Result<bool> {
        let name = K::name();
        let _guard = self.write_lock();
        self.cache_remove(name);
        let existed = self
            .raw
            .remove(name)
            .map_err(DefaultsError::backend(format!("remove `{name}`")))?;
        debug!(key = name, existed, "removed explicitly");
        self.publish(ChangeEvent::removed(name));
        Ok(existed)
    }

    /// Remove every entry present in the raw store, bypassing key policies,
    /// and clear the cache. Returns the number of entries removed.
    pub fn reset(&self) -> Result<usize> {
        let _guard = self.write_lock();
        self.clear_cache();

        let names = self.raw.keys().map_err(DefaultsError::backend("reset"))?;
        let mut removed = 0;
        for name in &names {
            if self
                .raw
                .remove(name)
                .map_err(DefaultsError::backend(format!("reset `{name}`")))?
            {
                removed += 1;
            }
        }

        debug!(removed, "reset");
        self.publish(ChangeEvent::reset());
        Ok(removed)
    }

    // ---- Cache maintenance ----

    /// Drop the cached value of one key.
    pub fn invalidate<K: Key>(&self) {
        self.cache_remove(K::name());
    }

    /// Drop every cached value.
    pub fn invalidate_all(&self) {
        self.clear_cache();
    }

    /// Drop cached entries that disagree with the raw store about presence:
    /// values whose key was removed externally, and defaults whose key was
    /// written externally. Returns the number of entries dropped.
    pub fn reconcile(&self) -> Result<usize> {
        let present = self.raw.keys().map_err(DefaultsError::backend("reconcile"))?;
        let mut entries = self.cache_write();
        let before = entries.len();
        entries.retain(|name, entry| entry.persisted == present.contains(name));
        let dropped = before - entries.len();
        if dropped > 0 {
            debug!(dropped, "cache reconciled");
        }
        Ok(dropped)
    }

    /// [`reconcile`](Self::reconcile) for a single key. Returns `true` if
    /// its cached entry was dropped.
    pub fn reconcile_key<K: Key>(&self) -> Result<bool> {
        let name = K::name();
        let present = self
            .raw
            .contains(name)
            .map_err(DefaultsError::backend(format!("reconcile `{name}`")))?;
        let mut entries = self.cache_write();
        let stale = entries
            .get(name)
            .is_some_and(|entry| entry.persisted != present);
        if stale {
            entries.remove(name);
            debug!(key = name, "stale cache entry dropped");
        }
        Ok(stale)
    }

    /// Number of cached entries.
    pub fn cached_len(&self) -> usize {
        self.shared.cache.read().expect("cache lock poisoned").len()
    }

    fn write_lock(&self) -> MutexGuard<'_, ()> {
        self.shared.write_lock.lock().expect("write lock poisoned")
    }

    fn cache_write(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry>> {
        self.shared.cache.write().expect("cache lock poisoned")
    }

    fn cached<K: Key>(&self) -> Option<K::Value> {
        if !self.caching {
            return None;
        }
        let entries = self.shared.cache.read().expect("cache lock poisoned");
        let entry = entries.get(K::name())?;
        match entry.value.downcast_ref::<K::Value>() {
            Some(value) => Some(value.clone()),
            None => {
                debug_assert!(
                    false,
                    "cached value for `{}` is not a {}",
                    K::name(),
                    type_name::<K::Value>()
                );
                None
            }
        }
    }

    // A non-caching view still drops the entry so caching siblings reload.
    fn cache_insert<V: Send + Sync + 'static>(&self, name: &str, value: V, persisted: bool) {
        let mut entries = self.cache_write();
        if self.caching {
            entries.insert(
                name.to_string(),
                CacheEntry {
                    value: Box::new(value),
                    persisted,
                },
            );
        } else {
            entries.remove(name);
        }
    }

    fn cache_remove(&self, name: &str) {
        self.cache_write().remove(name);
    }

    fn clear_cache(&self) {
        self.cache_write().clear();
    }

    fn publish(&self, event: ChangeEvent) {
        if let Some(notifier) = &self.notifier {
            notifier.publish(event);
        }
    }
}

#[cold]
fn fatal(err: DefaultsError) -> ! {
    error!(error = %err, "unrecoverable defaults failure");
    panic!("{err}")
}

impl std::fmt::Debug for Defaults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Defaults")
            .field("cached", &self.cached_len())
            .field("observable", &self.is_observable())
            .finish()
    }
}

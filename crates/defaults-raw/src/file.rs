//! JSON-file raw store, durable across process restarts.
//!
//! The whole dictionary lives in memory and is mirrored to a single JSON
//! document. Every mutation rewrites the document through a temporary
//! sibling file followed by a rename, so a crash mid-write leaves either the
//! old or the new document on disk, never a torn one.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::debug;

use crate::error::{RawError, Result};
use crate::traits::RawStore;
use crate::value::RawValue;

/// Flush/sync strategy for document rewrites.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SyncMode {
    /// `fsync` the document after every write (safest, highest latency).
    EveryWrite,
    /// Rely on OS page-cache buffering.
    #[default]
    OsDefault,
}

/// Configuration for a [`FileRawStore`].
#[derive(Clone, Debug)]
pub struct FileStoreConfig {
    /// Sync strategy applied to every rewrite.
    pub sync_mode: SyncMode,
    /// Write the document with indentation (easier to hand-edit).
    pub pretty: bool,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            sync_mode: SyncMode::default(),
            pretty: true,
        }
    }
}

/// A [`RawStore`] persisted as a JSON document.
///
/// JSON has no NaN or infinity, so [`set`](RawStore::set) refuses values
/// containing them with [`RawError::NonFinite`] before touching any state.
pub struct FileRawStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, RawValue>>,
    config: FileStoreConfig,
}

impl FileRawStore {
    /// Open (or create) the document at `path`.
    ///
    /// A missing file is an empty store. A file that is not a valid document
    /// is reported as [`RawError::Serialization`] and left untouched.
    pub fn open(path: &Path, config: FileStoreConfig) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let entries = load(path)?;
        debug!(path = %path.display(), entries = entries.len(), "file store opened");

        Ok(Self {
            path: path.to_path_buf(),
            entries: RwLock::new(entries),
            config,
        })
    }

    /// Re-read the document from disk, discarding the in-memory copy.
    ///
    /// Picks up edits made by another process or by hand.
    pub fn reload(&self) -> Result<()> {
        let fresh = load(&self.path)?;
        let mut entries = self
            .entries
            .write()
            .map_err(|e| RawError::Poisoned(e.to_string()))?;
        *entries = fresh;
        debug!(path = %self.path.display(), entries = entries.len(), "file store reloaded");
        Ok(())
    }

    /// Path to the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, RawValue>) -> Result<()> {
        let bytes = if self.config.pretty {
            serde_json::to_vec_pretty(entries)
        } else {
            serde_json::to_vec(entries)
        }
        .map_err(|e| RawError::Serialization(e.to_string()))?;

        let tmp = self.tmp_path();
        let mut file = File::create(&tmp)?;
        file.write_all(&bytes)?;
        if self.config.sync_mode == SyncMode::EveryWrite {
            file.sync_all()?;
        }
        drop(file);
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn load(path: &Path) -> Result<BTreeMap<String, RawValue>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(e.into()),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(BTreeMap::new());
    }
    serde_json::from_slice(&bytes)
        .map_err(|e| RawError::Serialization(format!("{}: {e}", path.display())))
}

impl RawStore for FileRawStore {
    fn get(&self, name: &str) -> Result<Option<RawValue>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| RawError::Poisoned(e.to_string()))?;
        Ok(entries.get(name).cloned())
    }

    fn set(&self, name: &str, value: RawValue) -> Result<()> {
        if !value.is_finite() {
            return Err(RawError::NonFinite {
                name: name.to_string(),
            });
        }
        let mut entries = self
            .entries
            .write()
            .map_err(|e| RawError::Poisoned(e.to_string()))?;
        let previous = entries.insert(name.to_string(), value);
        if let Err(err) = self.persist(&entries) {
            // Keep memory in step with what is on disk.
            match previous {
                Some(old) => entries.insert(name.to_string(), old),
                None => entries.remove(name),
            };
            return Err(err);
        }
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<bool> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| RawError::Poisoned(e.to_string()))?;
        let Some(previous) = entries.remove(name) else {
            return Ok(false);
        };
        if let Err(err) = self.persist(&entries) {
            entries.insert(name.to_string(), previous);
            return Err(err);
        }
        Ok(true)
    }

    fn keys(&self) -> Result<BTreeSet<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| RawError::Poisoned(e.to_string()))?;
        Ok(entries.keys().cloned().collect())
    }
}

impl std::fmt::Debug for FileRawStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.entries.read().map(|e| e.len()).unwrap_or_default();
        f.debug_struct("FileRawStore")
            .field("path", &self.path)
            .field("entry_count", &count)
            .finish()
    }
}

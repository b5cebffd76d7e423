//! Process-wide defaults instances.
//!
//! Two named instances exist per process: [`standard`] (plain, cached) and
//! [`observable`] (cached and notifying). Both are created on first use,
//! live until the process exits, and are two views of one store: they share
//! the raw backend, the cache and the write lock, so a write through either
//! is read back by both. Only the observable instance publishes changes,
//! and only for writes made through it.
//!
//! The backend comes from [`configure`] if it is called before first use,
//! otherwise from the environment: `TYPED_DEFAULTS_FILE=<path>` selects a
//! JSON file, anything else an in-memory dictionary.
//!
//! These instances are shared by everything in the process, tests included.
//! A test that writes through them must remove what it wrote; nothing
//! isolates test cases from each other automatically.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use defaults_raw::{FileRawStore, FileStoreConfig, InMemoryRawStore, RawError, RawStore};
use tracing::{error, info};

use crate::error::RegistryError;
use crate::store::{Defaults, DefaultsConfig};

/// Environment variable naming the JSON file backing the registry.
pub const FILE_ENV: &str = "TYPED_DEFAULTS_FILE";

/// Which raw dictionary the registry instances share.
#[derive(Clone, Debug, Default)]
pub enum Backend {
    /// Lost when the process exits.
    #[default]
    Memory,
    /// Durable JSON document.
    File {
        path: PathBuf,
        config: FileStoreConfig,
    },
}

impl Backend {
    /// Open the raw store this backend describes.
    pub fn open(&self) -> Result<Arc<dyn RawStore>, RawError> {
        match self {
            Backend::Memory => Ok(Arc::new(InMemoryRawStore::new())),
            Backend::File { path, config } => {
                Ok(Arc::new(FileRawStore::open(path, config.clone())?))
            }
        }
    }
}

/// Configuration for the registry instances.
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    pub backend: Backend,
    pub standard: DefaultsConfig,
    pub observable: DefaultsConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            standard: DefaultsConfig::default(),
            observable: DefaultsConfig::observable(),
        }
    }
}

impl RegistryConfig {
    /// Defaults, with the backend taken from [`FILE_ENV`] when it is set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(path) = std::env::var_os(FILE_ENV).filter(|p| !p.is_empty()) {
            config.backend = Backend::File {
                path: PathBuf::from(path),
                config: FileStoreConfig::default(),
            };
        }
        config
    }
}

static CONFIG: OnceLock<RegistryConfig> = OnceLock::new();
static BACKEND: OnceLock<Arc<dyn RawStore>> = OnceLock::new();
static STANDARD: OnceLock<Defaults> = OnceLock::new();
static OBSERVABLE: OnceLock<Defaults> = OnceLock::new();

/// Set the registry configuration. Must run before any instance is used.
pub fn configure(config: RegistryConfig) -> Result<(), RegistryError> {
    CONFIG
        .set(config)
        .map_err(|_| RegistryError::AlreadyInitialized)
}

fn config() -> &'static RegistryConfig {
    CONFIG.get_or_init(RegistryConfig::from_env)
}

/// The raw dictionary shared by the registry instances.
///
/// An unopenable backend is fatal: the process cannot honour its settings.
pub fn backend() -> Arc<dyn RawStore> {
    BACKEND
        .get_or_init(|| {
            let backend = &config().backend;
            match backend.open() {
                Ok(raw) => {
                    info!(?backend, "defaults backend opened");
                    raw
                }
                Err(err) => {
                    error!(?backend, error = %err, "cannot open defaults backend");
                    panic!("cannot open defaults backend {backend:?}: {err}")
                }
            }
        })
        .clone()
}

/// The plain process-wide instance.
pub fn standard() -> &'static Defaults {
    STANDARD.get_or_init(|| {
        info!("standard defaults initialized");
        Defaults::with_config(backend(), config().standard.clone())
    })
}

/// The observable process-wide instance.
pub fn observable() -> &'static Defaults {
    OBSERVABLE.get_or_init(|| {
        info!("observable defaults initialized");
        standard().share(config().observable.clone())
    })
}

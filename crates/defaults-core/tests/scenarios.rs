use std::sync::Arc;

use defaults_core::conversion::{Dictionary, RawEnum, RawRepresentable};
use defaults_core::registry::{self, Backend, RegistryConfig};
use defaults_core::{
    defaults_key, ChangeEvent, ChangeKind, Defaults, HasDefaultPolicy, EquatablePolicy, Key,
    RawStore, RawValue, RegistryError, WriteOutcome,
};
use defaults_raw::{FileRawStore, FileStoreConfig, InMemoryRawStore};
use serde::{Deserialize, Serialize};

defaults_key! {
    struct ToggleTestKey: bool = false;
}

defaults_key! {
    struct OptionalTestKey: Option<String> = None;
}

defaults_key! {
    struct LaunchCount: i64 = 0;
}

defaults_key! {
    struct Ratio: f64 = 0.5;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Appearance {
    #[default]
    Auto,
    Light,
    Dark,
}

impl RawRepresentable for Appearance {
    type Raw = String;

    fn raw_value(&self) -> String {
        match self {
            Appearance::Auto => "auto",
            Appearance::Light => "light",
            Appearance::Dark => "dark",
        }
        .to_string()
    }

    fn from_raw_value(raw: String) -> Option<Self> {
        match raw.as_str() {
            "auto" => Some(Appearance::Auto),
            "light" => Some(Appearance::Light),
            "dark" => Some(Appearance::Dark),
            _ => None,
        }
    }
}

impl HasDefaultPolicy for Appearance {
    type Policy = EquatablePolicy;
}

defaults_key! {
    struct AppearanceKey: Appearance = Appearance::Auto, conversion = RawEnum<Appearance>;
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct Profile {
    display_name: String,
    age: Option<u32>,
}

impl HasDefaultPolicy for Profile {
    type Policy = EquatablePolicy;
}

defaults_key! {
    struct ProfileKey: Profile = Profile::default(), conversion = Dictionary<Profile>;
}

fn memory_store() -> (Arc<InMemoryRawStore>, Defaults) {
    let raw = Arc::new(InMemoryRawStore::new());
    (raw.clone(), Defaults::new(raw))
}

#[test]
fn scenario_a_toggle() {
    let (raw, store) = memory_store();

    store.set::<ToggleTestKey>(true);
    assert_eq!(raw.get(ToggleTestKey::name()).unwrap(), Some(RawValue::Bool(true)));

    store.set::<ToggleTestKey>(false);
    assert!(!raw.contains(ToggleTestKey::name()).unwrap());
    assert!(!store.get::<ToggleTestKey>());
}

#[test]
fn scenario_b_optional() {
    let (raw, store) = memory_store();

    store.set::<OptionalTestKey>(Some("Hello!".to_string()));
    assert_eq!(store.get::<OptionalTestKey>(), Some("Hello!".to_string()));

    store.set::<OptionalTestKey>(None);
    assert!(!raw.contains(OptionalTestKey::name()).unwrap());
    assert_eq!(store.get::<OptionalTestKey>(), None);
}

#[test]
fn scenario_c_reset_five_keys() {
    let (raw, store) = memory_store();
    store.set::<ToggleTestKey>(true);
    store.set::<OptionalTestKey>(Some("x".into()));
    store.set::<LaunchCount>(12);
    store.set::<Ratio>(0.75);
    store.set::<AppearanceKey>(Appearance::Dark);
    assert_eq!(raw.len().unwrap(), 5);

    assert_eq!(store.reset().unwrap(), 5);
    assert_eq!(raw.len().unwrap(), 0);

    assert!(!store.get::<ToggleTestKey>());
    assert_eq!(store.get::<OptionalTestKey>(), None);
    assert_eq!(store.get::<LaunchCount>(), 0);
    assert_eq!(store.get::<Ratio>(), 0.5);
    assert_eq!(store.get::<AppearanceKey>(), Appearance::Auto);
}

#[test]
fn writing_default_removes_entry() {
    let (raw, store) = memory_store();
    store.set::<LaunchCount>(3);
    assert_eq!(store.set::<LaunchCount>(LaunchCount::default_value()), WriteOutcome::Removed);
    assert!(raw.is_empty().unwrap());
    assert_eq!(store.get::<LaunchCount>(), 0);
}

#[test]
fn idempotent_write_stores_once() {
    let raw: Arc<dyn RawStore> = Arc::new(InMemoryRawStore::new());
    let store = Defaults::observable(raw.clone());
    let mut rx = store.subscribe().unwrap();

    assert_eq!(store.set::<AppearanceKey>(Appearance::Light), WriteOutcome::Stored);
    assert_eq!(store.set::<AppearanceKey>(Appearance::Light), WriteOutcome::Skipped);
    assert_eq!(
        raw.get("AppearanceKey").unwrap(),
        Some(RawValue::String("light".into()))
    );

    assert_eq!(rx.try_recv().unwrap(), ChangeEvent::stored("AppearanceKey"));
    assert!(rx.try_recv().is_err());
}

#[test]
fn external_removal_is_healed_by_reconcile() {
    let (raw, store) = memory_store();
    store.set::<ProfileKey>(Profile {
        display_name: "Ada".into(),
        age: Some(36),
    });
    raw.remove("ProfileKey").unwrap();
    assert_eq!(store.get::<ProfileKey>().display_name, "Ada");

    store.reconcile().unwrap();
    assert_eq!(store.get::<ProfileKey>(), Profile::default());
}

#[test]
fn dictionary_profile_is_stored_as_fields() {
    let (raw, store) = memory_store();
    store.set::<ProfileKey>(Profile {
        display_name: "Grace".into(),
        age: None,
    });
    match raw.get("ProfileKey").unwrap() {
        Some(RawValue::Dict(fields)) => {
            assert_eq!(
                fields.get("display_name"),
                Some(&RawValue::String("Grace".into()))
            );
            assert!(!fields.contains_key("age"));
        }
        other => panic!("expected a dictionary, got {other:?}"),
    }
}

#[test]
fn file_backed_values_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("defaults.json");

    {
        let raw = Arc::new(FileRawStore::open(&path, FileStoreConfig::default()).unwrap());
        let store = Defaults::new(raw);
        store.set::<LaunchCount>(41);
        store.set::<OptionalTestKey>(Some("persisted".into()));
        store.set::<AppearanceKey>(Appearance::Dark);
    }

    let raw = Arc::new(FileRawStore::open(&path, FileStoreConfig::default()).unwrap());
    let store = Defaults::new(raw);
    assert_eq!(store.get::<LaunchCount>(), 41);
    assert_eq!(store.get::<OptionalTestKey>().as_deref(), Some("persisted"));
    assert_eq!(store.get::<AppearanceKey>(), Appearance::Dark);
}

#[test]
fn non_finite_ratio_leaves_file_readable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("defaults.json");

    {
        let raw = Arc::new(FileRawStore::open(&path, FileStoreConfig::default()).unwrap());
        let store = Defaults::new(raw);
        store.set::<Ratio>(0.75);
        store.set::<LaunchCount>(3);
        assert!(store.try_set::<Ratio>(f64::INFINITY).is_err());
        assert!(store.try_set::<Ratio>(f64::NAN).is_err());
    }

    let raw = Arc::new(FileRawStore::open(&path, FileStoreConfig::default()).unwrap());
    let store = Defaults::new(raw);
    assert_eq!(store.get::<Ratio>(), 0.75);
    assert_eq!(store.get::<LaunchCount>(), 3);
}

#[tokio::test]
async fn observers_receive_changes_on_their_own_task() {
    let store = Arc::new(Defaults::observable(Arc::new(InMemoryRawStore::new())));
    let mut rx = store.subscribe().unwrap();

    let observer = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.kind, ChangeKind::Stored);
            // The store is fully updated before the event is published.
            store.get::<LaunchCount>()
        })
    };

    store.set::<LaunchCount>(7);
    assert_eq!(observer.await.unwrap(), 7);
}

// One test owns the process-wide registry in this binary.
#[test]
fn registry_instances_share_backend() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.json");
    registry::configure(RegistryConfig {
        backend: Backend::File {
            path: path.clone(),
            config: FileStoreConfig::default(),
        },
        ..RegistryConfig::default()
    })
    .unwrap();

    let standard = registry::standard();
    let observable = registry::observable();
    assert!(!standard.is_observable());
    assert!(observable.is_observable());
    assert!(std::ptr::eq(standard, registry::standard()));

    standard.set::<LaunchCount>(2);
    assert!(observable.is_customized::<LaunchCount>().unwrap());
    assert_eq!(observable.get::<LaunchCount>(), 2);

    // A value cached by one instance follows writes made through the other.
    standard.set::<LaunchCount>(5);
    assert_eq!(observable.get::<LaunchCount>(), 5);
    observable.set::<LaunchCount>(6);
    assert_eq!(standard.get::<LaunchCount>(), 6);

    assert_eq!(
        registry::configure(RegistryConfig::default()),
        Err(RegistryError::AlreadyInitialized)
    );

    // Explicit cleanup: the registry is shared process state.
    standard.reset().unwrap();
    observable.invalidate_all();
    assert!(registry::backend().is_empty().unwrap());
    assert_eq!(observable.get::<LaunchCount>(), 0);
}

//! Typed accessors and two-way bindings.
//!
//! A [`Setting`] binds one key type to one [`Defaults`] instance and exposes
//! plain `get`/`set`. It borrows the store, so it cannot outlive it, and it
//! holds nothing else: create one wherever a setting is used.
//!
//! [`Lens`] narrows a value to one of its fields. [`Setting::project`] uses
//! it to read and write a single field of a structured setting, and
//! [`Binding::map`] does the same for a binding handed to UI code.

use std::marker::PhantomData;
use std::rc::Rc;

use crate::error::Result;
use crate::key::Key;
use crate::store::{Defaults, WriteOutcome};

/// Read and write access to one field of a `T`.
pub struct Lens<T, F> {
    get: fn(&T) -> &F,
    get_mut: fn(&mut T) -> &mut F,
}

impl<T, F> Lens<T, F> {
    pub const fn new(get: fn(&T) -> &F, get_mut: fn(&mut T) -> &mut F) -> Self {
        Self { get, get_mut }
    }

    pub fn get<'a>(&self, whole: &'a T) -> &'a F {
        (self.get)(whole)
    }

    pub fn get_mut<'a>(&self, whole: &'a mut T) -> &'a mut F {
        (self.get_mut)(whole)
    }
}

impl<T, F> Clone for Lens<T, F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, F> Copy for Lens<T, F> {}

/// Build a [`Lens`] from a type and a field path.
///
/// ```
/// use defaults_core::lens;
///
/// struct Size { width: u32 }
/// struct Window { size: Size }
///
/// let width = lens!(Window, size.width);
/// let mut w = Window { size: Size { width: 3 } };
/// *width.get_mut(&mut w) = 5;
/// assert_eq!(*width.get(&w), 5);
/// ```
#[macro_export]
macro_rules! lens {
    ($ty:ty, $($field:ident).+) => {
        $crate::Lens::<$ty, _>::new(
            |whole: &$ty| &whole.$($field).+,
            |whole: &mut $ty| &mut whole.$($field).+,
        )
    };
}

/// A key bound to a store.
pub struct Setting<'s, K: Key> {
    store: &'s Defaults,
    _key: PhantomData<fn() -> K>,
}

impl<'s, K: Key> Setting<'s, K> {
    pub fn new(store: &'s Defaults) -> Self {
        Self {
            store,
            _key: PhantomData,
        }
    }

    /// The name the key is stored under.
    pub fn name(&self) -> &'static str {
        K::name()
    }

    pub fn store(&self) -> &'s Defaults {
        self.store
    }

    pub fn get(&self) -> K::Value {
        self.store.get::<K>()
    }

    pub fn set(&self, value: K::Value) -> WriteOutcome {
        self.store.set::<K>(value)
    }

    /// Read, edit in place, and write back through the key's policy.
    pub fn update(&self, edit: impl FnOnce(&mut K::Value)) -> WriteOutcome {
        let mut value = self.get();
        edit(&mut value);
        self.set(value)
    }

    /// Delete the stored value regardless of policy.
    pub fn remove(&self) -> Result<bool> {
        self.store.remove::<K>()
    }

    pub fn is_customized(&self) -> Result<bool> {
        self.store.is_customized::<K>()
    }

    /// Drop this key's cached value if the raw store disagrees with it.
    ///
    /// Call once per refresh cycle of whatever observes the setting.
    pub fn refresh(&self) -> Result<bool> {
        self.store.reconcile_key::<K>()
    }

    /// Narrow this setting to one field of its value.
    pub fn project<F>(&self, lens: Lens<K::Value, F>) -> Projected<'s, K, F> {
        Projected {
            setting: *self,
            lens,
        }
    }

    /// A get/set closure pair over this setting.
    pub fn binding(&self) -> Binding<'s, K::Value> {
        let store = self.store;
        Binding::new(
            move || store.get::<K>(),
            move |value| {
                store.set::<K>(value);
            },
        )
    }
}

impl<K: Key> Clone for Setting<'_, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: Key> Copy for Setting<'_, K> {}

impl<K: Key> std::fmt::Debug for Setting<'_, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Setting").field("key", &K::name()).finish()
    }
}

/// A setting narrowed to one field of its value.
///
/// Writes read the whole current value, replace the field, and write the
/// whole value back through the key's policy.
pub struct Projected<'s, K: Key, F> {
    setting: Setting<'s, K>,
    lens: Lens<K::Value, F>,
}

impl<'s, K: Key, F: Clone> Projected<'s, K, F> {
    pub fn get(&self) -> F {
        self.lens.get(&self.setting.get()).clone()
    }

    pub fn set(&self, value: F) -> WriteOutcome {
        let mut whole = self.setting.get();
        *self.lens.get_mut(&mut whole) = value;
        self.setting.set(whole)
    }

    pub fn binding(&self) -> Binding<'s, F>
    where
        F: 's,
    {
        self.setting.binding().map(self.lens)
    }
}

/// A two-way binding: a getter and a setter, nothing else.
///
/// This is the shape UI data-binding layers consume. It adds no policy of
/// its own; every call goes straight to the closures it was built from.
pub struct Binding<'a, T> {
    get: Rc<dyn Fn() -> T + 'a>,
    set: Box<dyn Fn(T) + 'a>,
}

impl<'a, T: 'a> Binding<'a, T> {
    pub fn new(get: impl Fn() -> T + 'a, set: impl Fn(T) + 'a) -> Self {
        Self {
            get: Rc::new(get),
            set: Box::new(set),
        }
    }

    /// A binding that always reads `value` and ignores writes.
    pub fn constant(value: T) -> Self
    where
        T: Clone,
    {
        Self::new(move || value.clone(), |_| {})
    }

    pub fn get(&self) -> T {
        (self.get)()
    }

    pub fn set(&self, value: T) {
        (self.set)(value)
    }

    /// Narrow the binding to one field.
    pub fn map<F: Clone + 'a>(self, lens: Lens<T, F>) -> Binding<'a, F> {
        let Binding { get, set } = self;
        let read = Rc::clone(&get);
        Binding::new(
            move || lens.get(&read()).clone(),
            move |value| {
                let mut whole = get();
                *lens.get_mut(&mut whole) = value;
                set(whole);
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use defaults_raw::RawStore;
    use crate::conversion::Dictionary;
    use crate::defaults_key;
    use crate::policy::AlwaysOverwrite;
    use serde::{Deserialize, Serialize};
    use std::cell::Cell;

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Geometry {
        width: u32,
        height: u32,
    }

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Layout {
        geometry: Geometry,
        sidebar: bool,
    }

    defaults_key! {
        struct LayoutKey: Layout = Layout::default(),
            conversion = Dictionary<Layout>,
            policy = AlwaysOverwrite;
    }

    defaults_key! {
        struct VolumeKey: i64 = 50;
    }

    #[test]
    fn setting_reads_and_writes_through_store() {
        let store = Defaults::in_memory();
        let volume = store.setting::<VolumeKey>();
        assert_eq!(volume.name(), "VolumeKey");
        assert_eq!(volume.get(), 50);

        assert_eq!(volume.set(80), WriteOutcome::Stored);
        assert_eq!(store.get::<VolumeKey>(), 80);
        assert!(volume.is_customized().unwrap());

        assert_eq!(volume.set(50), WriteOutcome::Removed);
        assert!(!volume.is_customized().unwrap());
    }

    #[test]
    fn update_edits_in_place() {
        let store = Defaults::in_memory();
        let volume = Setting::<VolumeKey>::new(&store);
        volume.update(|v| *v += 5);
        assert_eq!(volume.get(), 55);
        assert_eq!(volume.update(|_| {}), WriteOutcome::Skipped);
    }

    #[test]
    fn projection_reads_and_writes_one_field() {
        let store = Defaults::in_memory();
        let layout = store.setting::<LayoutKey>();
        let width = layout.project(lens!(Layout, geometry.width));

        assert_eq!(width.get(), 0);
        width.set(1280);
        assert_eq!(
            store.get::<LayoutKey>(),
            Layout {
                geometry: Geometry {
                    width: 1280,
                    height: 0
                },
                sidebar: false
            }
        );

        let sidebar = layout.project(lens!(Layout, sidebar));
        sidebar.set(true);
        assert_eq!(width.get(), 1280);
        assert!(store.get::<LayoutKey>().sidebar);
    }

    #[test]
    fn refresh_heals_external_removal() {
        let store = Defaults::in_memory();
        let volume = store.setting::<VolumeKey>();
        volume.set(10);
        store.raw().remove("VolumeKey").unwrap();
        assert_eq!(volume.get(), 10);

        assert!(volume.refresh().unwrap());
        assert_eq!(volume.get(), 50);
    }

    #[test]
    fn explicit_remove_restores_default() {
        let store = Defaults::in_memory();
        let layout = store.setting::<LayoutKey>();
        layout.set(Layout::default());
        assert!(layout.is_customized().unwrap());
        assert!(layout.remove().unwrap());
        assert!(!layout.is_customized().unwrap());
    }

    #[test]
    fn binding_is_a_plain_get_set_pair() {
        let store = Defaults::in_memory();
        let binding = store.setting::<VolumeKey>().binding();
        assert_eq!(binding.get(), 50);
        binding.set(75);
        assert_eq!(store.get::<VolumeKey>(), 75);
    }

    #[test]
    fn projected_binding_writes_whole_value() {
        let store = Defaults::in_memory();
        let height = store
            .setting::<LayoutKey>()
            .project(lens!(Layout, geometry.height))
            .binding();
        height.set(720);
        assert_eq!(height.get(), 720);
        assert_eq!(store.get::<LayoutKey>().geometry.height, 720);
    }

    #[test]
    fn mapped_binding_over_local_state() {
        let cell = Cell::new(Geometry::default());
        let whole = Binding::new(
            || {
                let value = cell.take();
                cell.set(value.clone());
                value
            },
            |value| cell.set(value),
        );
        let width = whole.map(lens!(Geometry, width));
        width.set(3);
        assert_eq!(width.get(), 3);
        assert_eq!(cell.take().width, 3);
    }

    #[test]
    fn constant_binding_ignores_writes() {
        let binding = Binding::constant(7);
        binding.set(9);
        assert_eq!(binding.get(), 7);
    }

    #[test]
    fn setting_debug_names_key() {
        let store = Defaults::in_memory();
        let debug = format!("{:?}", store.setting::<VolumeKey>());
        assert!(debug.contains("VolumeKey"));
    }
}

use std::{
    any::type_name,
    fmt::Debug,
    ops::Deref,
    sync::{Arc, OnceLock},
};

/// Field injected while its owning bean is wired
///
/// Should only be accessed after the container has been refreshed.
///
/// ### Panics
///
/// Dereferencing panics if the field was never filled, which happens when:
/// - It is accessed inside a constructor or `wire` before wiring completed
/// - It is a lazy field accessed before the lazy pass ran
/// - Its nullable selector matched nothing; use [`Inject::get`] for those
pub struct Inject<V>(Arc<OnceLock<V>>);

impl<V> Inject<V> {
    pub fn new() -> Self {
        Inject(Arc::new(OnceLock::new()))
    }

    /// A cell that is already filled, for values built outside the container
    pub fn filled(value: V) -> Self {
        let cell = Inject::new();
        let _ = cell.0.set(value);
        cell
    }

    /// Accesses the injected value, `None` until it was filled
    pub fn get(&self) -> Option<&V> {
        self.0.get()
    }

    pub fn is_set(&self) -> bool {
        self.0.get().is_some()
    }

    pub(crate) fn set(&self, value: V) {
        if self.0.set(value).is_err() {
            tracing::warn!(field = type_name::<V>(), "field injected twice, keeping the first value");
        }
    }
}

impl<V> Default for Inject<V> {
    fn default() -> Self {
        Inject::new()
    }
}

/// Clones share the cell; filling one fills all
impl<V> Clone for Inject<V> {
    fn clone(&self) -> Self {
        Inject(self.0.clone())
    }
}

impl<V> Deref for Inject<V> {
    type Target = V;

    fn deref(&self) -> &Self::Target {
        self.get()
            .expect("injected field accessed before it was wired")
    }
}

impl<V: Debug> Debug for Inject<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Inject").field(&self.get()).finish()
    }
}

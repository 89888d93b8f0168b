//! Typed per-connection storage
//!
//! Applications attach their own state to a connection, keyed by type. At
//! most one value per type is stored; inserting again replaces it.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

type AnyMap = HashMap<TypeId, Box<dyn Any + Send + Sync>>;

/// Type-keyed value store
#[derive(Default)]
pub struct Extensions {
    map: RwLock<AnyMap>,
}

impl Extensions {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the previous value of the same type
    pub fn insert<T: Send + Sync + 'static>(&self, value: T) -> Option<T> {
        self.map
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|prev| prev.downcast().ok().map(|boxed| *boxed))
    }

    /// Get a clone of the stored value
    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.map
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    /// Remove and return the stored value
    pub fn remove<T: Send + Sync + 'static>(&self) -> Option<T> {
        self.map
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&TypeId::of::<T>())
            .and_then(|prev| prev.downcast().ok().map(|boxed| *boxed))
    }

    /// Mutate the stored value in place, inserting `T::default()` first if
    /// absent
    pub fn update<T, R>(&self, f: impl FnOnce(&mut T) -> R) -> R
    where
        T: Default + Send + Sync + 'static,
    {
        let mut map = self.map.write().unwrap_or_else(PoisonError::into_inner);
        let entry = map
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::default()));
        match entry.downcast_mut::<T>() {
            Some(value) => f(value),
            // Keys are derived from the stored type, so this is unreachable
            None => f(&mut T::default()),
        }
    }

    /// Whether a value of type `T` is stored
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.map
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&TypeId::of::<T>())
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.map.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Nickname(String);

    #[derive(Debug, Default)]
    struct Counter(u32);

    #[test]
    fn test_insert_get_last_write_wins() {
        let ext = Extensions::new();
        assert!(ext.get::<Nickname>().is_none());

        assert!(ext.insert(Nickname("alice".into())).is_none());
        let prev = ext.insert(Nickname("bob".into()));

        assert_eq!(prev, Some(Nickname("alice".into())));
        assert_eq!(ext.get::<Nickname>(), Some(Nickname("bob".into())));
        assert_eq!(ext.len(), 1);
    }

    #[test]
    fn test_types_are_independent() {
        let ext = Extensions::new();
        ext.insert(Nickname("carol".into()));
        ext.insert(7u64);

        assert_eq!(ext.get::<u64>(), Some(7));
        assert!(ext.get::<u32>().is_none());
        assert_eq!(ext.len(), 2);
    }

    #[test]
    fn test_update_and_remove() {
        let ext = Extensions::new();
        ext.update(|c: &mut Counter| c.0 += 1);
        let value = ext.update(|c: &mut Counter| {
            c.0 += 1;
            c.0
        });
        assert_eq!(value, 2);

        assert!(ext.contains::<Counter>());
        assert_eq!(ext.remove::<Counter>().map(|c| c.0), Some(2));
        assert!(ext.is_empty());
    }
}

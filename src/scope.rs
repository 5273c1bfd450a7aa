use crate::Svc;
use std::{cell::RefCell, collections::HashMap, rc::Rc};

/// A persistent key/value bag tied to one consumer name, exposed to factories
/// through the built-in `"scope"` wrapper.
///
/// Handles share structure: every handle obtained for the same name observes
/// the same underlying map, so mutations through one handle are visible
/// through all the others. Bags live for the registry's lifetime; there is no
/// eviction.
#[derive(Clone, Default)]
pub struct Scope {
    values: Rc<RefCell<HashMap<String, Svc>>>,
}

impl Scope {
    /// Gets the value stored under `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Svc> {
        self.values.borrow().get(key).cloned()
    }

    /// Stores a value under `key`, returning the previous value if one was
    /// set.
    pub fn insert(&self, key: impl Into<String>, value: Svc) -> Option<Svc> {
        self.values.borrow_mut().insert(key.into(), value)
    }

    /// Removes and returns the value stored under `key`.
    pub fn remove(&self, key: &str) -> Option<Svc> {
        self.values.borrow_mut().remove(key)
    }

    /// Whether a value is stored under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.borrow().contains_key(key)
    }

    /// The number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    /// Whether the bag is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }

    /// Whether two handles refer to the same underlying bag.
    #[must_use]
    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.values, &other.values)
    }
}

/// Per-consumer-name persistent storage. Bags are created lazily on first
/// access and kept for the registry's lifetime.
#[derive(Default)]
pub(crate) struct ScopeStore {
    scopes: RefCell<HashMap<String, Scope>>,
}

impl ScopeStore {
    /// Returns the bag for `name`, creating an empty one on first access.
    pub fn get(&self, name: &str) -> Scope {
        self.scopes
            .borrow_mut()
            .entry(name.to_owned())
            .or_default()
            .clone()
    }
}

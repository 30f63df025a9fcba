//! Name-keyed tables of sync methods, async methods and properties.
//!
//! The three tables are independent: the same name may appear in more than
//! one. [`Registry::lookup`] resolves a name with fixed precedence
//! (sync, then async, then property). Re-registering a name in the same table
//! replaces the previous entry.

use ferry_core::{AsyncArgs, CallError, Engine, HostFn, TypedResult};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Body of an async method. Runs on a worker with owned arguments only.
pub type AsyncHandler =
    Arc<dyn Fn(&AsyncArgs) -> Result<TypedResult, CallError> + Send + Sync + 'static>;

pub type Getter<E> = Rc<dyn Fn(&mut E) -> Result<<E as Engine>::Value, CallError>>;

pub type Setter<E> = Rc<dyn Fn(&mut E, &<E as Engine>::Value) -> Result<(), CallError>>;

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// A method run inline on the engine thread.
pub struct SyncMethod<E: Engine> {
    /// Advisory; reported to the engine, never enforced.
    pub arity: usize,
    pub handler: HostFn<E>,
}

impl<E: Engine> Clone for SyncMethod<E> {
    fn clone(&self) -> Self {
        Self {
            arity: self.arity,
            handler: Rc::clone(&self.handler),
        }
    }
}

/// A method whose body runs on the worker executor.
#[derive(Clone)]
pub struct AsyncMethod {
    pub arity: usize,
    pub handler: AsyncHandler,
}

/// A getter with an optional setter. No setter means read-only.
pub struct Property<E: Engine> {
    pub getter: Getter<E>,
    pub setter: Option<Setter<E>>,
}

/// Result of resolving a member name.
pub enum Member<'a, E: Engine> {
    Sync(&'a SyncMethod<E>),
    Async(&'a AsyncMethod),
    Property(&'a Property<E>),
}

impl<E: Engine> Member<'_, E> {
    pub fn kind(&self) -> &'static str {
        match self {
            Member::Sync(_) => "sync",
            Member::Async(_) => "async",
            Member::Property(_) => "property",
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub struct Registry<E: Engine> {
    sync: BTreeMap<String, SyncMethod<E>>,
    asynchronous: BTreeMap<String, AsyncMethod>,
    properties: BTreeMap<String, Property<E>>,
}

impl<E: Engine> Default for Registry<E> {
    fn default() -> Self {
        Self {
            sync: BTreeMap::new(),
            asynchronous: BTreeMap::new(),
            properties: BTreeMap::new(),
        }
    }
}

impl<E: Engine> Registry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_sync(&mut self, name: impl Into<String>, method: SyncMethod<E>) {
        let name = name.into();
        if self.sync.insert(name.clone(), method).is_some() {
            tracing::debug!(member = %name, "replaced sync method");
        }
    }

    pub fn insert_async(&mut self, name: impl Into<String>, method: AsyncMethod) {
        let name = name.into();
        if self.asynchronous.insert(name.clone(), method).is_some() {
            tracing::debug!(member = %name, "replaced async method");
        }
    }

    pub fn insert_property(&mut self, name: impl Into<String>, property: Property<E>) {
        let name = name.into();
        if self.properties.insert(name.clone(), property).is_some() {
            tracing::debug!(member = %name, "replaced property");
        }
    }

    /// Resolve `name`: sync, then async, then property.
    pub fn lookup(&self, name: &str) -> Option<Member<'_, E>> {
        if let Some(m) = self.sync.get(name) {
            return Some(Member::Sync(m));
        }
        if let Some(m) = self.asynchronous.get(name) {
            return Some(Member::Async(m));
        }
        self.properties.get(name).map(Member::Property)
    }

    /// The property table alone; writes never resolve to methods.
    pub fn property(&self, name: &str) -> Option<&Property<E>> {
        self.properties.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn has_async(&self) -> bool {
        !self.asynchronous.is_empty()
    }

    /// Every registered name: sync methods, then async methods, then
    /// properties. A name registered in several tables appears once per
    /// table.
    pub fn names(&self) -> Vec<String> {
        self.sync
            .keys()
            .chain(self.asynchronous.keys())
            .chain(self.properties.keys())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sync.len() + self.asynchronous.len() + self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: Engine> fmt::Debug for Registry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("sync", &self.sync.keys().collect::<Vec<_>>())
            .field("async", &self.asynchronous.keys().collect::<Vec<_>>())
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .finish()
    }
}

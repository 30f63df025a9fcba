//! Host objects: the engine-visible face of a set of native operations.
//!
//! A [`HostObject`] is assembled by a [`HostObjectBuilder`] and is immutable
//! afterwards. Member access resolves names through the [`Registry`]:
//!
//! - **sync** methods become engine functions that run the handler inline;
//! - **async** methods become engine functions that return a promise
//!   immediately, run the handler on the [`WorkerExecutor`] and settle the
//!   promise back on the engine thread through the [`EngineScheduler`];
//! - **properties** run their getter on every read; writes go to the setter
//!   or are ignored when the property is read-only;
//! - unknown names read as `undefined`.
//!
//! Engine functions for methods are cached per name. The cache remembers the
//! [`EngineId`] that filled it and is cleared when a different engine reaches
//! the object.

use crate::args::SyncArgs;
use crate::event_loop::EngineScheduler;
use crate::executor::WorkerExecutor;
use crate::panic_boundary::guard_call;
use crate::registry::{AsyncHandler, AsyncMethod, Member, Property, Registry, SyncMethod};
use ferry_core::{
    AsyncArgs, CallError, ConfigError, Deferred, Engine, EngineId, HostFn, TypedResult,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// HostModule
// ---------------------------------------------------------------------------

/// A provider of native operations.
///
/// `install` registers the module's properties and methods on a builder.
/// The builder, not the module, decides which executor and scheduler back
/// the async methods.
pub trait HostModule<E: Engine> {
    /// Name of the host object the module is usually installed as.
    fn name(&self) -> &str;

    fn install(&self, builder: &mut HostObjectBuilder<E>);
}

// ---------------------------------------------------------------------------
// HostObjectBuilder
// ---------------------------------------------------------------------------

/// Registration phase of a host object.
pub struct HostObjectBuilder<E: Engine> {
    name: String,
    registry: Registry<E>,
    executor: Option<Arc<dyn WorkerExecutor>>,
    scheduler: Option<Arc<dyn EngineScheduler<E>>>,
}

impl<E: Engine> HostObjectBuilder<E> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registry: Registry::new(),
            executor: None,
            scheduler: None,
        }
    }

    /// Start a builder named after `module` with the module installed.
    pub fn for_module(module: &dyn HostModule<E>) -> Self {
        let mut builder = Self::new(module.name());
        module.install(&mut builder);
        builder
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn executor(&mut self, executor: Arc<dyn WorkerExecutor>) -> &mut Self {
        self.executor = Some(executor);
        self
    }

    pub fn scheduler(&mut self, scheduler: Arc<dyn EngineScheduler<E>>) -> &mut Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Inject both collaborators needed by async methods.
    pub fn with_async(
        &mut self,
        executor: Arc<dyn WorkerExecutor>,
        scheduler: Arc<dyn EngineScheduler<E>>,
    ) -> &mut Self {
        self.executor(executor).scheduler(scheduler)
    }

    pub fn module(&mut self, module: &dyn HostModule<E>) -> &mut Self {
        module.install(self);
        self
    }

    /// Register a method that runs inline on the engine thread.
    pub fn sync<F>(&mut self, name: &str, arity: usize, handler: F) -> &mut Self
    where
        F: Fn(&mut E, &SyncArgs<E>) -> Result<E::Value, CallError> + 'static,
    {
        let body: HostFn<E> = Rc::new(move |engine: &mut E, raw: &[E::Value]| {
            let args = SyncArgs::capture(engine, raw);
            handler(engine, &args)
        });
        self.sync_raw(name, arity, body)
    }

    /// Register a sync method that works on bucketed arguments and returns
    /// plain data, like an async method but run inline.
    pub fn sync_typed<F>(&mut self, name: &str, arity: usize, handler: F) -> &mut Self
    where
        F: Fn(&AsyncArgs) -> Result<TypedResult, CallError> + 'static,
    {
        let body: HostFn<E> = Rc::new(move |engine: &mut E, raw: &[E::Value]| {
            let args = AsyncArgs::extract(engine, raw);
            handler(&args).map(|result| result.materialize(engine))
        });
        self.sync_raw(name, arity, body)
    }

    /// Register a sync method from an engine function body.
    pub fn sync_raw(&mut self, name: &str, arity: usize, handler: HostFn<E>) -> &mut Self {
        self.registry
            .insert_sync(name, SyncMethod { arity, handler });
        self
    }

    /// Register a method whose handler runs on the worker executor.
    pub fn asynchronous<F>(&mut self, name: &str, arity: usize, handler: F) -> &mut Self
    where
        F: Fn(&AsyncArgs) -> Result<TypedResult, CallError> + Send + Sync + 'static,
    {
        let handler: AsyncHandler = Arc::new(handler);
        self.registry
            .insert_async(name, AsyncMethod { arity, handler });
        self
    }

    /// Register a read-only property.
    pub fn property<G>(&mut self, name: &str, getter: G) -> &mut Self
    where
        G: Fn(&mut E) -> Result<E::Value, CallError> + 'static,
    {
        self.registry.insert_property(
            name,
            Property {
                getter: Rc::new(getter),
                setter: None,
            },
        );
        self
    }

    /// Register a read-write property.
    pub fn property_rw<G, S>(&mut self, name: &str, getter: G, setter: S) -> &mut Self
    where
        G: Fn(&mut E) -> Result<E::Value, CallError> + 'static,
        S: Fn(&mut E, &E::Value) -> Result<(), CallError> + 'static,
    {
        self.registry.insert_property(
            name,
            Property {
                getter: Rc::new(getter),
                setter: Some(Rc::new(setter)),
            },
        );
        self
    }

    /// Register a read-only property with a fixed value.
    pub fn constant(&mut self, name: &str, value: impl Into<TypedResult>) -> &mut Self {
        let value = value.into();
        self.property(name, move |engine| Ok(value.clone().materialize(engine)))
    }

    /// Finish registration.
    ///
    /// Fails when async methods were registered without both an executor and
    /// a scheduler.
    pub fn build(self) -> Result<HostObject<E>, ConfigError> {
        let dispatch = match (self.executor, self.scheduler) {
            (Some(executor), Some(scheduler)) => Some(AsyncDispatch {
                executor,
                scheduler,
            }),
            (None, _) if self.registry.has_async() => {
                return Err(ConfigError::MissingExecutor { object: self.name })
            }
            (_, None) if self.registry.has_async() => {
                return Err(ConfigError::MissingScheduler { object: self.name })
            }
            _ => None,
        };

        tracing::debug!(
            object = %self.name,
            members = self.registry.len(),
            "host object built"
        );

        Ok(HostObject {
            name: self.name,
            registry: self.registry,
            dispatch,
            cache: RefCell::new(CallableCache::default()),
        })
    }
}

impl<E: Engine> fmt::Debug for HostObjectBuilder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostObjectBuilder")
            .field("name", &self.name)
            .field("registry", &self.registry)
            .field("has_executor", &self.executor.is_some())
            .field("has_scheduler", &self.scheduler.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// HostObject
// ---------------------------------------------------------------------------

pub struct HostObject<E: Engine> {
    name: String,
    registry: Registry<E>,
    dispatch: Option<AsyncDispatch<E>>,
    cache: RefCell<CallableCache<E::Value>>,
}

impl<E: Engine> HostObject<E> {
    pub fn builder(name: impl Into<String>) -> HostObjectBuilder<E> {
        HostObjectBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &Registry<E> {
        &self.registry
    }

    /// Sync, async and property names, in that order.
    pub fn member_names(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn has_member(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    /// Number of engine functions currently cached.
    pub fn cached_len(&self) -> usize {
        self.cache.borrow().entries.len()
    }

    /// Read member `name` on behalf of `engine`.
    pub fn get(&self, engine: &mut E, name: &str) -> Result<E::Value, CallError> {
        if let Some(cached) = self.cache.borrow_mut().lookup(engine.id(), name) {
            return Ok(cached);
        }

        let function = match self.registry.lookup(name) {
            None => {
                tracing::trace!(object = %self.name, member = name, "unknown member");
                return Ok(engine.undefined());
            }
            Some(Member::Property(property)) => {
                let getter = Rc::clone(&property.getter);
                return guard_call(name, || getter(engine));
            }
            Some(Member::Sync(method)) => {
                let body = guarded(name, Rc::clone(&method.handler));
                engine.function(name, method.arity, body)
            }
            Some(Member::Async(method)) => {
                let body = self.async_body(name, method)?;
                engine.function(name, method.arity, body)
            }
        };

        self.cache
            .borrow_mut()
            .insert(engine.id(), name, function.clone());
        Ok(function)
    }

    /// Write member `name`. Writes resolve against properties only, so a
    /// read-write property stays writable when a method shares its name.
    /// Every other write is ignored.
    pub fn set(&self, engine: &mut E, name: &str, value: &E::Value) -> Result<(), CallError> {
        if let Some(property) = self.registry.property(name) {
            return match &property.setter {
                Some(setter) => {
                    let setter = Rc::clone(setter);
                    guard_call(name, || setter(engine, value))
                }
                None => {
                    tracing::debug!(object = %self.name, member = name, "ignoring write to read-only property");
                    Ok(())
                }
            };
        }
        match self.registry.lookup(name) {
            Some(member) => tracing::debug!(
                object = %self.name,
                member = name,
                kind = member.kind(),
                "ignoring write to method"
            ),
            None => {
                tracing::debug!(object = %self.name, member = name, "ignoring write to unknown member")
            }
        }
        Ok(())
    }

    /// Look up `name` and call it with `args`.
    pub fn invoke(
        &self,
        engine: &mut E,
        name: &str,
        args: &[E::Value],
    ) -> Result<E::Value, CallError> {
        let function = self.get(engine, name)?;
        engine.call(&function, args)
    }

    fn async_body(&self, name: &str, method: &AsyncMethod) -> Result<HostFn<E>, CallError> {
        let Some(dispatch) = self.dispatch.clone() else {
            return Err(CallError::Engine(format!(
                "{}.{} has no worker executor",
                self.name, name
            )));
        };
        let handler = Arc::clone(&method.handler);
        let qualified = format!("{}.{}", self.name, name);

        Ok(Rc::new(move |engine: &mut E, raw: &[E::Value]| {
            let args = AsyncArgs::extract(engine, raw);
            let (promise, deferred) = Deferred::create(engine);
            dispatch.submit(qualified.clone(), Arc::clone(&handler), args, deferred);
            Ok(promise)
        }))
    }
}

impl<E: Engine> fmt::Debug for HostObject<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostObject")
            .field("name", &self.name)
            .field("registry", &self.registry)
            .field("async_enabled", &self.dispatch.is_some())
            .finish()
    }
}

/// Wrap a sync body so a panic becomes a [`CallError`].
fn guarded<E: Engine>(name: &str, body: HostFn<E>) -> HostFn<E> {
    let name = name.to_string();
    Rc::new(move |engine: &mut E, args: &[E::Value]| guard_call(&name, || body(engine, args)))
}

// ---------------------------------------------------------------------------
// Async dispatch
// ---------------------------------------------------------------------------

struct AsyncDispatch<E> {
    executor: Arc<dyn WorkerExecutor>,
    scheduler: Arc<dyn EngineScheduler<E>>,
}

impl<E> Clone for AsyncDispatch<E> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            scheduler: Arc::clone(&self.scheduler),
        }
    }
}

impl<E: Engine> AsyncDispatch<E> {
    /// Hand one call to the executor. The worker runs the handler, then sends
    /// the settlement back through the scheduler.
    fn submit(&self, method: String, handler: AsyncHandler, args: AsyncArgs, deferred: Deferred) {
        tracing::debug!(method = %method, promise = ?deferred.promise(), "async call submitted");
        let pending = PendingSettlement {
            method,
            scheduler: Arc::clone(&self.scheduler),
            deferred: Some(deferred),
        };
        self.executor.execute(Box::new(move || {
            let outcome = guard_call(&pending.method, || handler(&args));
            pending.complete(outcome);
        }));
    }
}

/// Owns the [`Deferred`] while the work is with the executor. If the work is
/// dropped without running, the promise is rejected instead of left pending.
struct PendingSettlement<E: Engine> {
    method: String,
    scheduler: Arc<dyn EngineScheduler<E>>,
    deferred: Option<Deferred>,
}

impl<E: Engine> PendingSettlement<E> {
    fn complete(mut self, outcome: Result<TypedResult, CallError>) {
        if let Some(deferred) = self.deferred.take() {
            self.send(deferred, outcome);
        }
    }

    fn send(&self, deferred: Deferred, outcome: Result<TypedResult, CallError>) {
        let method = self.method.clone();
        self.scheduler.schedule(Box::new(move |engine: &mut E| {
            settle(engine, &method, deferred, outcome)
        }));
    }
}

impl<E: Engine> Drop for PendingSettlement<E> {
    fn drop(&mut self) {
        let Some(deferred) = self.deferred.take() else {
            return;
        };
        tracing::warn!(method = %self.method, promise = ?deferred.promise(), "call dropped before it ran");
        self.send(deferred, Err(CallError::failed(DROPPED_CALL)));
    }
}

const DROPPED_CALL: &str = "worker executor dropped the call";

/// Runs on the engine thread: materialize and resolve, or reject with an
/// engine error carrying the message.
fn settle<E: Engine>(
    engine: &mut E,
    method: &str,
    deferred: Deferred,
    outcome: Result<TypedResult, CallError>,
) {
    if !deferred.belongs_to(engine) {
        tracing::warn!(
            method,
            created_by = %deferred.engine(),
            delivered_to = %engine.id(),
            "engine changed before async call settled; dropping result"
        );
        return;
    }
    let promise = deferred.promise();
    let settled = match outcome {
        Ok(result) => {
            let value = result.materialize(engine);
            deferred.resolve(engine, value)
        }
        Err(err) => {
            let reason = engine.error(&err.to_string());
            deferred.reject(engine, reason)
        }
    };
    tracing::debug!(method, ?promise, settled, "async call settled");
}

// ---------------------------------------------------------------------------
// CallableCache
// ---------------------------------------------------------------------------

struct CallableCache<V> {
    engine: Option<EngineId>,
    entries: HashMap<String, V>,
}

impl<V> Default for CallableCache<V> {
    fn default() -> Self {
        Self {
            engine: None,
            entries: HashMap::new(),
        }
    }
}

impl<V: Clone> CallableCache<V> {
    /// Clears everything first when `engine` is not the engine that filled
    /// the cache.
    fn lookup(&mut self, engine: EngineId, name: &str) -> Option<V> {
        if self.engine != Some(engine) {
            if !self.entries.is_empty() {
                tracing::debug!(
                    previous = ?self.engine,
                    current = %engine,
                    dropped = self.entries.len(),
                    "engine changed; clearing callable cache"
                );
            }
            self.entries.clear();
            self.engine = Some(engine);
            return None;
        }
        self.entries.get(name).cloned()
    }

    fn insert(&mut self, engine: EngineId, name: &str, function: V) {
        if self.engine == Some(engine) {
            self.entries.insert(name.to_string(), function);
        }
    }
}

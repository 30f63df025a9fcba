//! The seam between Ferry and an embedding script engine.
//!
//! An [`Engine`] is single-threaded: its values are expected to be `!Send`, so
//! the compiler keeps them on the engine thread. The only things that leave
//! that thread are plain data ([`crate::TypedResult`], [`crate::AsyncArgs`])
//! and the [`Deferred`] settlement token.

use crate::error::CallError;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

static NEXT_ENGINE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one engine instance.
///
/// Host objects compare identities to detect that a different engine is
/// calling in, which invalidates cached callables.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EngineId(u64);

impl EngineId {
    /// Allocate the next unique engine id.
    pub fn next() -> Self {
        Self(NEXT_ENGINE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EngineId({})", self.0)
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "engine:{}", self.0)
    }
}

/// Handle to a pending promise inside one engine's promise table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PromiseId(u64);

impl PromiseId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for PromiseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PromiseId({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// Engine trait
// ---------------------------------------------------------------------------

/// Body of a native function exposed to the engine.
pub type HostFn<E> =
    Rc<dyn Fn(&mut E, &[<E as Engine>::Value]) -> Result<<E as Engine>::Value, CallError>>;

/// Runtime classification of an engine value, as seen by argument extraction.
///
/// Text and buffer contents are copied out so the view owns no engine state;
/// array elements stay engine values so they can be inspected in turn.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgView<V> {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Buffer(Vec<u8>),
    Array(Vec<V>),
    /// Objects, functions, promises and anything else without a bucket.
    Other,
}

impl<V> ArgView<V> {
    /// `true` for `undefined` and `null`, which read as "argument absent".
    pub fn is_absent(&self) -> bool {
        matches!(self, ArgView::Undefined | ArgView::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ArgView::Undefined => "undefined",
            ArgView::Null => "null",
            ArgView::Bool(_) => "boolean",
            ArgView::Number(_) => "number",
            ArgView::Text(_) => "string",
            ArgView::Buffer(_) => "buffer",
            ArgView::Array(_) => "array",
            ArgView::Other => "object",
        }
    }
}

/// A single-threaded script engine that host objects can be installed into.
///
/// Every method is called on the engine thread. Implementations decide how a
/// failed [`Engine::call`] surfaces to script code; the bridge only requires
/// that the returned [`CallError`] message is what the script observes.
pub trait Engine: Sized + 'static {
    /// An engine-owned value. Should be `!Send`.
    type Value: Clone + fmt::Debug;

    fn id(&self) -> EngineId;

    fn undefined(&mut self) -> Self::Value;
    fn boolean(&mut self, value: bool) -> Self::Value;
    fn number(&mut self, value: f64) -> Self::Value;
    fn string(&mut self, value: &str) -> Self::Value;
    /// Allocate a new buffer holding a copy of `bytes`.
    fn array_buffer(&mut self, bytes: &[u8]) -> Self::Value;
    fn array(&mut self, items: Vec<Self::Value>) -> Self::Value;
    fn object(&mut self, entries: Vec<(String, Self::Value)>) -> Self::Value;
    /// Build an error value carrying `message`.
    fn error(&mut self, message: &str) -> Self::Value;

    fn inspect(&self, value: &Self::Value) -> ArgView<Self::Value>;

    /// Wrap a native body as an engine function with a declared arity.
    fn function(&mut self, name: &str, arity: usize, body: HostFn<Self>) -> Self::Value;
    fn call(&mut self, function: &Self::Value, args: &[Self::Value])
        -> Result<Self::Value, CallError>;

    /// Create a pending promise and return it with its table handle.
    fn promise(&mut self) -> (Self::Value, PromiseId);
    /// Settle a pending promise. Returns `false` if it was unknown or
    /// already settled, in which case nothing changes.
    fn settle(&mut self, id: PromiseId, outcome: Result<Self::Value, Self::Value>) -> bool;
}

// ---------------------------------------------------------------------------
// Deferred
// ---------------------------------------------------------------------------

/// Single-use settlement token for one pending promise.
///
/// A `Deferred` is plain data. It travels with the work to a worker and back
/// to the engine thread, where [`Deferred::resolve`] or [`Deferred::reject`]
/// consumes it. It is not `Clone`, so a promise is settled at most once.
#[must_use = "a deferred should be resolved or rejected"]
#[derive(Debug, PartialEq, Eq)]
pub struct Deferred {
    engine: EngineId,
    promise: PromiseId,
}

impl Deferred {
    /// Create a promise in `engine` and the token that settles it.
    pub fn create<E: Engine>(engine: &mut E) -> (E::Value, Deferred) {
        let (value, promise) = engine.promise();
        let deferred = Deferred {
            engine: engine.id(),
            promise,
        };
        (value, deferred)
    }

    pub fn engine(&self) -> EngineId {
        self.engine
    }

    pub fn promise(&self) -> PromiseId {
        self.promise
    }

    /// Whether `engine` is the instance that created the promise.
    pub fn belongs_to<E: Engine>(&self, engine: &E) -> bool {
        engine.id() == self.engine
    }

    pub fn resolve<E: Engine>(self, engine: &mut E, value: E::Value) -> bool {
        self.settle(engine, Ok(value))
    }

    pub fn reject<E: Engine>(self, engine: &mut E, reason: E::Value) -> bool {
        self.settle(engine, Err(reason))
    }

    fn settle<E: Engine>(self, engine: &mut E, outcome: Result<E::Value, E::Value>) -> bool {
        if !self.belongs_to(engine) {
            tracing::warn!(
                promise = ?self.promise,
                created_by = %self.engine,
                delivered_to = %engine.id(),
                "dropping settlement for a promise owned by another engine"
            );
            return false;
        }
        engine.settle(self.promise, outcome)
    }
}

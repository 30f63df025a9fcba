//! A minimal single-threaded engine.
//!
//! [`Realm`] holds a global object and a promise table, and implements
//! [`Engine`] so host objects can be installed into it. It has no parser; it
//! is driven from Rust through [`Realm::get_member`], [`Realm::call_method`]
//! and [`Realm::block_on`].

use crate::value::{Function, PromiseState, Value};
use ferry_core::{ArgView, CallError, Engine, EngineId, HostFn, PromiseId};
use ferry_runtime::{HostObject, JobQueue};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;

/// Why [`Realm::block_on`] returned without a fulfilled value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AwaitError {
    #[error("promise rejected: {0}")]
    Rejected(String),
    #[error("promise still pending after {0:?}")]
    Timeout(Duration),
}

pub struct Realm {
    id: EngineId,
    globals: BTreeMap<String, Value>,
    promises: HashMap<PromiseId, Rc<RefCell<PromiseState>>>,
    next_promise: u64,
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}

impl Realm {
    pub fn new() -> Self {
        Self {
            id: EngineId::next(),
            globals: BTreeMap::new(),
            promises: HashMap::new(),
            next_promise: 1,
        }
    }

    // -- globals --------------------------------------------------------------

    pub fn set_global(&mut self, name: impl Into<String>, value: Value) {
        self.globals.insert(name.into(), value);
    }

    /// `undefined` when the global does not exist.
    pub fn global(&self, name: &str) -> Value {
        self.globals.get(name).cloned().unwrap_or(Value::Undefined)
    }

    pub fn global_names(&self) -> impl Iterator<Item = &str> {
        self.globals.keys().map(String::as_str)
    }

    /// Install `object` as a global under its own name and return it.
    pub fn install(&mut self, object: HostObject<Realm>) -> Value {
        let name = object.name().to_string();
        let value = Value::host(object);
        tracing::debug!(engine = %self.id, object = %name, "host object installed");
        self.set_global(name, value.clone());
        value
    }

    // -- member access --------------------------------------------------------

    pub fn get_member(&mut self, target: &Value, name: &str) -> Result<Value, CallError> {
        match target {
            Value::Host(host) => {
                let host = Rc::clone(host);
                host.get(self, name)
            }
            Value::Object(map) => Ok(map.borrow().get(name).cloned().unwrap_or(Value::Undefined)),
            Value::Array(_) | Value::ArrayBuffer(_) | Value::String(_) if name == "length" => {
                Ok(target
                    .length()
                    .map(|n| Value::Number(n as f64))
                    .unwrap_or(Value::Undefined))
            }
            Value::Undefined | Value::Null => Err(CallError::Engine(format!(
                "cannot read property '{}' of {}",
                name,
                target.type_of()
            ))),
            _ => Ok(Value::Undefined),
        }
    }

    pub fn set_member(&mut self, target: &Value, name: &str, value: Value) -> Result<(), CallError> {
        match target {
            Value::Host(host) => {
                let host = Rc::clone(host);
                host.set(self, name, &value)
            }
            Value::Object(map) => {
                map.borrow_mut().insert(name.to_string(), value);
                Ok(())
            }
            Value::Undefined | Value::Null => Err(CallError::Engine(format!(
                "cannot set property '{}' of {}",
                name,
                target.type_of()
            ))),
            _ => Ok(()),
        }
    }

    /// `target.name(...args)`.
    pub fn call_method(
        &mut self,
        target: &Value,
        name: &str,
        args: &[Value],
    ) -> Result<Value, CallError> {
        let function = self.get_member(target, name)?;
        if function.is_undefined() {
            return Err(CallError::NotCallable(name.to_string()));
        }
        self.call(&function, args)
    }

    // -- promises -------------------------------------------------------------

    /// Number of promises created by this realm that have not settled.
    pub fn pending_promises(&self) -> usize {
        self.promises.len()
    }

    /// Pump `queue` until `promise` settles or `timeout` elapses.
    ///
    /// A non-promise value is returned as is.
    pub fn block_on(
        &mut self,
        queue: &JobQueue<Realm>,
        promise: &Value,
        timeout: Duration,
    ) -> Result<Value, AwaitError> {
        let Value::Promise(state) = promise else {
            return Ok(promise.clone());
        };
        let state = Rc::clone(state);
        queue.run_until(self, timeout, |_| !state.borrow().is_pending());

        let settled = state.borrow().clone();
        match settled {
            PromiseState::Pending => Err(AwaitError::Timeout(timeout)),
            PromiseState::Fulfilled(value) => Ok(value),
            PromiseState::Rejected(reason) => Err(AwaitError::Rejected(
                reason
                    .error_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{:?}", reason)),
            )),
        }
    }
}

impl Engine for Realm {
    type Value = Value;

    fn id(&self) -> EngineId {
        self.id
    }

    fn undefined(&mut self) -> Value {
        Value::Undefined
    }

    fn boolean(&mut self, value: bool) -> Value {
        Value::Bool(value)
    }

    fn number(&mut self, value: f64) -> Value {
        Value::Number(value)
    }

    fn string(&mut self, value: &str) -> Value {
        Value::string(value)
    }

    fn array_buffer(&mut self, bytes: &[u8]) -> Value {
        Value::buffer(bytes.to_vec())
    }

    fn array(&mut self, items: Vec<Value>) -> Value {
        Value::array(items)
    }

    fn object(&mut self, entries: Vec<(String, Value)>) -> Value {
        Value::object(entries)
    }

    fn error(&mut self, message: &str) -> Value {
        Value::Error(Rc::from(message))
    }

    fn inspect(&self, value: &Value) -> ArgView<Value> {
        match value {
            Value::Undefined => ArgView::Undefined,
            Value::Null => ArgView::Null,
            Value::Bool(b) => ArgView::Bool(*b),
            Value::Number(n) => ArgView::Number(*n),
            Value::String(s) => ArgView::Text(s.to_string()),
            Value::ArrayBuffer(b) => ArgView::Buffer(b.borrow().clone()),
            Value::Array(items) => ArgView::Array(items.borrow().clone()),
            _ => ArgView::Other,
        }
    }

    fn function(&mut self, name: &str, arity: usize, body: HostFn<Self>) -> Value {
        Value::Function(Rc::new(Function {
            name: name.to_string(),
            arity,
            body,
        }))
    }

    fn call(&mut self, function: &Value, args: &[Value]) -> Result<Value, CallError> {
        match function {
            Value::Function(f) => {
                let f = Rc::clone(f);
                (f.body)(self, args)
            }
            other => Err(CallError::NotCallable(other.type_of().to_string())),
        }
    }

    fn promise(&mut self) -> (Value, PromiseId) {
        let id = PromiseId::new(self.next_promise);
        self.next_promise += 1;
        let state = Rc::new(RefCell::new(PromiseState::Pending));
        self.promises.insert(id, Rc::clone(&state));
        (Value::Promise(state), id)
    }

    fn settle(&mut self, id: PromiseId, outcome: Result<Value, Value>) -> bool {
        let Some(state) = self.promises.remove(&id) else {
            return false;
        };
        *state.borrow_mut() = match outcome {
            Ok(value) => PromiseState::Fulfilled(value),
            Err(reason) => PromiseState::Rejected(reason),
        };
        true
    }
}

impl std::fmt::Debug for Realm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Realm")
            .field("id", &self.id)
            .field("globals", &self.globals.keys().collect::<Vec<_>>())
            .field("pending_promises", &self.promises.len())
            .finish()
    }
}

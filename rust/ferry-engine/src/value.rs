//! Value representation for the reference engine.
//!
//! Reference-typed values share their payload through `Rc`, which also makes
//! every [`Value`] `!Send`: values cannot leave the thread that owns the
//! [`crate::Realm`].

use crate::realm::Realm;
use ferry_core::HostFn;
use ferry_runtime::HostObject;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    ArrayBuffer(Rc<RefCell<Vec<u8>>>),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<BTreeMap<String, Value>>>),
    Function(Rc<Function>),
    Promise(Rc<RefCell<PromiseState>>),
    Error(Rc<str>),
    Host(Rc<HostObject<Realm>>),
}

/// A native function value.
pub struct Function {
    pub name: String,
    pub arity: usize,
    pub body: HostFn<Realm>,
}

#[derive(Debug, Clone)]
pub enum PromiseState {
    Pending,
    Fulfilled(Value),
    Rejected(Value),
}

impl PromiseState {
    pub fn is_pending(&self) -> bool {
        matches!(self, PromiseState::Pending)
    }
}

impl Value {
    pub fn string(s: &str) -> Self {
        Value::String(Rc::from(s))
    }

    pub fn buffer(bytes: Vec<u8>) -> Self {
        Value::ArrayBuffer(Rc::new(RefCell::new(bytes)))
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Value::Object(Rc::new(RefCell::new(entries.into_iter().collect())))
    }

    pub fn host(object: HostObject<Realm>) -> Self {
        Value::Host(Rc::new(object))
    }

    /// Script-level type name.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::ArrayBuffer(_) => "arraybuffer",
            Value::Array(_) => "array",
            Value::Object(_) | Value::Host(_) => "object",
            Value::Function(_) => "function",
            Value::Promise(_) => "promise",
            Value::Error(_) => "error",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// A copy of the buffer contents.
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Value::ArrayBuffer(b) => Some(b.borrow().clone()),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Value::Error(msg) => Some(msg),
            _ => None,
        }
    }

    /// Property of a plain object.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(map) => map.borrow().get(key).cloned(),
            _ => None,
        }
    }

    /// Element of an array.
    pub fn index(&self, i: usize) -> Option<Value> {
        match self {
            Value::Array(items) => items.borrow().get(i).cloned(),
            _ => None,
        }
    }

    pub fn length(&self) -> Option<usize> {
        match self {
            Value::Array(items) => Some(items.borrow().len()),
            Value::ArrayBuffer(b) => Some(b.borrow().len()),
            Value::String(s) => Some(s.chars().count()),
            _ => None,
        }
    }

    pub fn promise_state(&self) -> Option<PromiseState> {
        match self {
            Value::Promise(state) => Some(state.borrow().clone()),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    /// Primitives compare by value, reference types by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::ArrayBuffer(a), Value::ArrayBuffer(b)) => Rc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Promise(a), Value::Promise(b)) => Rc::ptr_eq(a, b),
            (Value::Host(a), Value::Host(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::ArrayBuffer(b) => write!(f, "ArrayBuffer({})", b.borrow().len()),
            Value::Array(items) => f.debug_list().entries(items.borrow().iter()).finish(),
            Value::Object(map) => f.debug_map().entries(map.borrow().iter()).finish(),
            Value::Function(func) => write!(f, "[function {}]", func.name),
            Value::Promise(state) => write!(f, "Promise {{ {:?} }}", state.borrow()),
            Value::Error(msg) => write!(f, "Error({:?})", msg),
            Value::Host(host) => write!(f, "[host {}]", host.name()),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

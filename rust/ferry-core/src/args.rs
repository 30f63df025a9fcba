//! Argument buckets handed to native handlers.
//!
//! Engine arguments are classified on the engine thread into four owned
//! buckets (strings, numbers, booleans, buffers). Handlers address each bucket
//! by its own index: `str(0)` is the first string argument, whatever its
//! position in the call.
//!
//! An array argument is flattened: each string element is appended to the
//! string bucket and other elements are dropped. The per-position
//! [`ArgSlot`] record keeps enough information to recover the grouping via
//! [`AsyncArgs::text_list`].

use crate::engine::{ArgView, Engine};
use crate::error::CallError;
use std::fmt;

/// Which bucket a required argument was expected in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Text,
    Number,
    Bool,
    Buffer,
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgKind::Text => write!(f, "string"),
            ArgKind::Number => write!(f, "number"),
            ArgKind::Bool => write!(f, "boolean"),
            ArgKind::Buffer => write!(f, "buffer"),
        }
    }
}

/// Where the argument at one call position ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgSlot {
    Text(usize),
    Number(usize),
    Bool(usize),
    Buffer(usize),
    /// An array whose string elements occupy `strings[start..start + len]`.
    TextList { start: usize, len: usize },
    /// `undefined`, `null`, objects and functions.
    Skipped,
}

/// Owned, thread-safe copy of a call's arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AsyncArgs {
    pub strings: Vec<String>,
    pub numbers: Vec<f64>,
    pub bools: Vec<bool>,
    pub buffers: Vec<Vec<u8>>,
    /// One entry per original argument position.
    pub slots: Vec<ArgSlot>,
}

impl AsyncArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `args` by runtime type. Must run on the engine thread.
    pub fn extract<E: Engine>(engine: &E, args: &[E::Value]) -> Self {
        let mut out = Self::default();
        for arg in args {
            match engine.inspect(arg) {
                ArgView::Text(s) => out.push_text(s),
                ArgView::Number(n) => out.push_number(n),
                ArgView::Bool(b) => out.push_bool(b),
                ArgView::Buffer(bytes) => out.push_buffer(bytes),
                ArgView::Array(items) => {
                    let texts = items.iter().filter_map(|item| match engine.inspect(item) {
                        ArgView::Text(s) => Some(s),
                        _ => None,
                    });
                    out.push_text_list(texts);
                }
                ArgView::Undefined | ArgView::Null | ArgView::Other => {
                    out.slots.push(ArgSlot::Skipped)
                }
            }
        }
        out
    }

    // -- building -----------------------------------------------------------

    pub fn push_text(&mut self, value: impl Into<String>) {
        self.slots.push(ArgSlot::Text(self.strings.len()));
        self.strings.push(value.into());
    }

    pub fn push_number(&mut self, value: f64) {
        self.slots.push(ArgSlot::Number(self.numbers.len()));
        self.numbers.push(value);
    }

    pub fn push_bool(&mut self, value: bool) {
        self.slots.push(ArgSlot::Bool(self.bools.len()));
        self.bools.push(value);
    }

    pub fn push_buffer(&mut self, value: Vec<u8>) {
        self.slots.push(ArgSlot::Buffer(self.buffers.len()));
        self.buffers.push(value);
    }

    pub fn push_text_list<S: Into<String>>(&mut self, items: impl IntoIterator<Item = S>) {
        let start = self.strings.len();
        self.strings.extend(items.into_iter().map(Into::into));
        let len = self.strings.len() - start;
        self.slots.push(ArgSlot::TextList { start, len });
    }

    pub fn with_text(mut self, value: impl Into<String>) -> Self {
        self.push_text(value);
        self
    }

    pub fn with_number(mut self, value: f64) -> Self {
        self.push_number(value);
        self
    }

    pub fn with_bool(mut self, value: bool) -> Self {
        self.push_bool(value);
        self
    }

    pub fn with_buffer(mut self, value: Vec<u8>) -> Self {
        self.push_buffer(value);
        self
    }

    pub fn with_text_list<S: Into<String>>(mut self, items: impl IntoIterator<Item = S>) -> Self {
        self.push_text_list(items);
        self
    }

    // -- reading ------------------------------------------------------------

    /// Number of original argument positions.
    pub fn arg_count(&self) -> usize {
        self.slots.len()
    }

    pub fn str(&self, index: usize) -> Result<&str, CallError> {
        self.strings
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| CallError::missing(ArgKind::Text, index))
    }

    pub fn str_or<'a>(&'a self, index: usize, default: &'a str) -> &'a str {
        self.strings.get(index).map(String::as_str).unwrap_or(default)
    }

    pub fn num(&self, index: usize) -> Result<f64, CallError> {
        self.numbers
            .get(index)
            .copied()
            .ok_or_else(|| CallError::missing(ArgKind::Number, index))
    }

    pub fn num_or(&self, index: usize, default: f64) -> f64 {
        self.numbers.get(index).copied().unwrap_or(default)
    }

    pub fn bool(&self, index: usize) -> Result<bool, CallError> {
        self.bools
            .get(index)
            .copied()
            .ok_or_else(|| CallError::missing(ArgKind::Bool, index))
    }

    pub fn bool_or(&self, index: usize, default: bool) -> bool {
        self.bools.get(index).copied().unwrap_or(default)
    }

    pub fn buffer(&self, index: usize) -> Result<&[u8], CallError> {
        self.buffers
            .get(index)
            .map(Vec::as_slice)
            .ok_or_else(|| CallError::missing(ArgKind::Buffer, index))
    }

    pub fn buffer_or_empty(&self, index: usize) -> &[u8] {
        self.buffers.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All strings from index `start` onward.
    pub fn strings_from(&self, start: usize) -> &[String] {
        self.strings.get(start..).unwrap_or(&[])
    }

    /// The string elements of the array passed at call `position`, if that
    /// argument was an array.
    pub fn text_list(&self, position: usize) -> Option<&[String]> {
        match self.slots.get(position) {
            Some(ArgSlot::TextList { start, len }) => self.strings.get(*start..start + len),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Positional access to the raw arguments of a sync call.
//!
//! Unlike [`ferry_core::AsyncArgs`], sync handlers see arguments by call
//! position. Positions past the end, `undefined` and `null` all read as
//! absent: `*_or` accessors return the default and required accessors fail
//! with [`CallError::MissingArgument`]. Extra arguments beyond what a handler
//! reads are ignored.

use ferry_core::{ArgKind, ArgView, CallError, Engine};

pub struct SyncArgs<E: Engine> {
    raw: Vec<E::Value>,
    views: Vec<ArgView<E::Value>>,
}

impl<E: Engine> SyncArgs<E> {
    /// Inspect every argument once, on the engine thread.
    pub fn capture(engine: &E, args: &[E::Value]) -> Self {
        Self {
            raw: args.to_vec(),
            views: args.iter().map(|a| engine.inspect(a)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// The engine value at `index`, if one was passed.
    pub fn raw(&self, index: usize) -> Option<&E::Value> {
        self.raw.get(index)
    }

    /// `None` past the end of the argument list.
    pub fn view(&self, index: usize) -> Option<&ArgView<E::Value>> {
        self.views.get(index)
    }

    pub fn is_present(&self, index: usize) -> bool {
        self.view(index).is_some_and(|v| !v.is_absent())
    }

    pub fn str(&self, index: usize) -> Result<&str, CallError> {
        match self.view(index) {
            Some(ArgView::Text(s)) => Ok(s),
            Some(v) if !v.is_absent() => Err(mismatch(index, ArgKind::Text, v)),
            _ => Err(CallError::missing(ArgKind::Text, index)),
        }
    }

    pub fn str_or<'a>(&'a self, index: usize, default: &'a str) -> Result<&'a str, CallError> {
        if self.is_present(index) {
            self.str(index)
        } else {
            Ok(default)
        }
    }

    pub fn num(&self, index: usize) -> Result<f64, CallError> {
        match self.view(index) {
            Some(ArgView::Number(n)) => Ok(*n),
            Some(v) if !v.is_absent() => Err(mismatch(index, ArgKind::Number, v)),
            _ => Err(CallError::missing(ArgKind::Number, index)),
        }
    }

    pub fn num_or(&self, index: usize, default: f64) -> Result<f64, CallError> {
        if self.is_present(index) {
            self.num(index)
        } else {
            Ok(default)
        }
    }

    pub fn bool(&self, index: usize) -> Result<bool, CallError> {
        match self.view(index) {
            Some(ArgView::Bool(b)) => Ok(*b),
            Some(v) if !v.is_absent() => Err(mismatch(index, ArgKind::Bool, v)),
            _ => Err(CallError::missing(ArgKind::Bool, index)),
        }
    }

    pub fn bool_or(&self, index: usize, default: bool) -> Result<bool, CallError> {
        if self.is_present(index) {
            self.bool(index)
        } else {
            Ok(default)
        }
    }

    pub fn buffer(&self, index: usize) -> Result<&[u8], CallError> {
        match self.view(index) {
            Some(ArgView::Buffer(b)) => Ok(b),
            Some(v) if !v.is_absent() => Err(mismatch(index, ArgKind::Buffer, v)),
            _ => Err(CallError::missing(ArgKind::Buffer, index)),
        }
    }
}

fn mismatch<V>(index: usize, expected: ArgKind, got: &ArgView<V>) -> CallError {
    CallError::invalid(format!(
        "argument {} must be a {}, got {}",
        index,
        expected,
        got.type_name()
    ))
}

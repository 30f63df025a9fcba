//! Thread-safe result values produced by native handlers.
//!
//! A [`TypedResult`] owns all of its data and never holds an engine handle, so
//! it can be built on a worker thread and handed to the engine thread. There it
//! is turned into an engine value exactly once by [`TypedResult::materialize`].

use crate::engine::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// TypedResult
// ---------------------------------------------------------------------------

/// Closed, recursive sum of every value a native handler may return.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum TypedResult {
    /// No value; materializes as the engine's `undefined`.
    #[default]
    Unit,
    Bool(bool),
    Number(f64),
    Text(String),
    /// Raw bytes; materialized as a freshly allocated engine buffer.
    Bytes(Vec<u8>),
    List(Vec<TypedResult>),
    /// String-keyed map. Key order is not significant.
    Map(HashMap<String, TypedResult>),
}

impl TypedResult {
    /// Build a [`TypedResult::Map`] from key/value pairs.
    ///
    /// ```
    /// use ferry_core::TypedResult;
    ///
    /// let r = TypedResult::map([("ok", true.into()), ("size", 12u64.into())]);
    /// assert_eq!(r.get("size").and_then(TypedResult::as_number), Some(12.0));
    /// ```
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, TypedResult)>,
    {
        TypedResult::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a [`TypedResult::List`] of text values.
    pub fn texts<S: Into<String>>(items: impl IntoIterator<Item = S>) -> Self {
        TypedResult::List(
            items
                .into_iter()
                .map(|s| TypedResult::Text(s.into()))
                .collect(),
        )
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            TypedResult::Unit => "unit",
            TypedResult::Bool(_) => "bool",
            TypedResult::Number(_) => "number",
            TypedResult::Text(_) => "text",
            TypedResult::Bytes(_) => "bytes",
            TypedResult::List(_) => "list",
            TypedResult::Map(_) => "map",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TypedResult::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            TypedResult::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TypedResult::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            TypedResult::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[TypedResult]> {
        match self {
            TypedResult::List(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a key when this is a map.
    pub fn get(&self, key: &str) -> Option<&TypedResult> {
        match self {
            TypedResult::Map(entries) => entries.get(key),
            _ => None,
        }
    }

    /// Convert into an engine value on the engine thread.
    ///
    /// Lists and maps are converted depth-first; list order is preserved.
    /// Bytes are copied into a new engine-owned buffer of the same length.
    pub fn materialize<E: Engine>(self, engine: &mut E) -> E::Value {
        match self {
            TypedResult::Unit => engine.undefined(),
            TypedResult::Bool(b) => engine.boolean(b),
            TypedResult::Number(n) => engine.number(n),
            TypedResult::Text(s) => engine.string(&s),
            TypedResult::Bytes(bytes) => engine.array_buffer(&bytes),
            TypedResult::List(items) => {
                let values = items
                    .into_iter()
                    .map(|item| item.materialize(engine))
                    .collect();
                engine.array(values)
            }
            TypedResult::Map(entries) => {
                let values = entries
                    .into_iter()
                    .map(|(key, value)| (key, value.materialize(engine)))
                    .collect();
                engine.object(values)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl From<()> for TypedResult {
    fn from(_: ()) -> Self {
        TypedResult::Unit
    }
}

impl From<bool> for TypedResult {
    fn from(b: bool) -> Self {
        TypedResult::Bool(b)
    }
}

macro_rules! number_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for TypedResult {
                fn from(n: $t) -> Self {
                    TypedResult::Number(n as f64)
                }
            }
        )*
    };
}

number_from!(f64, f32, i32, i64, u32, u64, usize);

impl From<&str> for TypedResult {
    fn from(s: &str) -> Self {
        TypedResult::Text(s.to_string())
    }
}

impl From<String> for TypedResult {
    fn from(s: String) -> Self {
        TypedResult::Text(s)
    }
}

impl From<Vec<u8>> for TypedResult {
    fn from(bytes: Vec<u8>) -> Self {
        TypedResult::Bytes(bytes)
    }
}

impl From<Vec<String>> for TypedResult {
    fn from(items: Vec<String>) -> Self {
        TypedResult::texts(items)
    }
}

impl From<Vec<TypedResult>> for TypedResult {
    fn from(items: Vec<TypedResult>) -> Self {
        TypedResult::List(items)
    }
}

impl From<HashMap<String, TypedResult>> for TypedResult {
    fn from(entries: HashMap<String, TypedResult>) -> Self {
        TypedResult::Map(entries)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

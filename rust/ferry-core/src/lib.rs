//! Core data model for the Ferry host bridge.
//!
//! Everything in this crate is engine-agnostic. The [`Engine`] trait is the
//! seam an embedding engine implements; [`TypedResult`] and [`AsyncArgs`] are
//! the plain-data values that cross from the engine thread to worker threads
//! and back.

pub mod args;
pub mod engine;
pub mod error;
pub mod typed;

pub use args::{ArgKind, ArgSlot, AsyncArgs};
pub use engine::{ArgView, Deferred, Engine, EngineId, HostFn, PromiseId};
pub use error::{CallError, ConfigError};
pub use typed::TypedResult;

//! Reference single-threaded engine for Ferry.
//!
//! [`Realm`] implements [`ferry_core::Engine`] with `Rc`-backed values. It
//! drives the integration tests and the `ferry` command line.

pub mod json;
pub mod realm;
pub mod value;

pub use realm::{AwaitError, Realm};
pub use value::{Function, PromiseState, Value};

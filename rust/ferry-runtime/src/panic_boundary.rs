//! Panic-to-error conversion at native call boundaries.
//!
//! Native handlers are arbitrary provider code. A panic inside one must never
//! unwind into the engine or take down a worker thread, so every handler
//! invocation runs under [`catch_panic`] and a caught panic becomes
//! [`CallError::Panicked`].
//!
//! ```rust
//! use ferry_runtime::panic_boundary::{catch_panic, guard_call};
//!
//! let result = catch_panic(|| -> i32 { panic!("oops") });
//! assert_eq!(result.unwrap_err().message(), "oops");
//!
//! let err = guard_call("double", || -> Result<i32, _> { panic!("bad input") }).unwrap_err();
//! assert_eq!(err.to_string(), "panic: bad input");
//! ```

use ferry_core::CallError;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe, UnwindSafe};

// ---------------------------------------------------------------------------
// PanicError
// ---------------------------------------------------------------------------

/// A caught panic with its payload message extracted.
#[derive(Debug, Clone)]
pub struct PanicError {
    message: String,
}

impl PanicError {
    pub fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        Self {
            message: extract_panic_message(payload.as_ref()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for PanicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panic: {}", self.message)
    }
}

impl std::error::Error for PanicError {}

impl From<PanicError> for CallError {
    fn from(err: PanicError) -> Self {
        CallError::Panicked(err.message)
    }
}

/// Handles `&str` and `String` payloads; anything else gets a generic message.
fn extract_panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// Boundaries
// ---------------------------------------------------------------------------

/// Run `f`, converting a panic into `Err(PanicError)`.
pub fn catch_panic<T>(f: impl FnOnce() -> T + UnwindSafe) -> Result<T, PanicError> {
    catch_unwind(f).map_err(PanicError::from_payload)
}

/// Run a fallible native handler named `name`, folding a panic into its error.
///
/// Handlers own no state that a panic could leave half-updated from the
/// caller's point of view, so the closure is asserted unwind-safe here.
pub fn guard_call<T>(
    name: &str,
    f: impl FnOnce() -> Result<T, CallError>,
) -> Result<T, CallError> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let err = PanicError::from_payload(payload);
            tracing::error!(member = name, "native handler panicked: {}", err.message());
            Err(err.into())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

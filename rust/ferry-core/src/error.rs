//! Error types shared across the bridge.
//!
//! [`CallError`] is plain data so it can be produced on a worker thread and
//! carried back to the engine thread, where its `Display` text becomes the
//! message of the engine-side error value.

use crate::args::ArgKind;
use thiserror::Error;

/// Failure of a single native call, property access or engine operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
    /// The handler reported an operational failure.
    #[error("{0}")]
    Failed(String),

    /// A required positional argument was absent or `undefined`.
    #[error("missing {kind} argument at position {index}")]
    MissingArgument { kind: ArgKind, index: usize },

    /// An argument was present but unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The handler panicked; the payload message is preserved.
    #[error("panic: {0}")]
    Panicked(String),

    /// A value that is not a function was called.
    #[error("{0} is not a function")]
    NotCallable(String),

    /// Error raised by the engine itself (for example a thrown value).
    #[error("{0}")]
    Engine(String),
}

impl CallError {
    pub fn failed(message: impl Into<String>) -> Self {
        CallError::Failed(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        CallError::InvalidArgument(message.into())
    }

    pub fn missing(kind: ArgKind, index: usize) -> Self {
        CallError::MissingArgument { kind, index }
    }
}

/// Misconfiguration detected while a host object is being built.
///
/// These are fatal: the object is never handed to an engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("async methods registered on '{object}' but no worker executor was provided")]
    MissingExecutor { object: String },

    #[error("async methods registered on '{object}' but no engine scheduler was provided")]
    MissingScheduler { object: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_error_messages() {
        assert_eq!(CallError::failed("disk full").to_string(), "disk full");
        assert_eq!(
            CallError::missing(ArgKind::Number, 2).to_string(),
            "missing number argument at position 2"
        );
        assert_eq!(
            CallError::Panicked("boom".into()).to_string(),
            "panic: boom"
        );
        assert_eq!(
            CallError::NotCallable("version".into()).to_string(),
            "version is not a function"
        );
    }

    #[test]
    fn config_error_names_object() {
        let err = ConfigError::MissingScheduler {
            object: "fs".into(),
        };
        assert!(err.to_string().contains("'fs'"));
        assert!(err.to_string().contains("scheduler"));
    }
}

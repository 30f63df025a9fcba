use ferry_core::CallError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid file handle: {0}")]
    InvalidHandle(i32),

    #[error("File not opened for reading")]
    NotReadable,

    #[error("File not opened for writing")]
    NotWritable,

    #[error("unsupported hash algorithm: {0}")]
    UnsupportedHash(i64),

    #[error("invalid {what}: {code}")]
    InvalidCode { what: &'static str, code: i64 },
}

impl FsError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        FsError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Attach a context message to an `io::Result`.
pub(crate) trait IoContext<T> {
    fn context(self, context: impl FnOnce() -> String) -> Result<T, FsError>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn context(self, context: impl FnOnce() -> String) -> Result<T, FsError> {
        self.map_err(|source| FsError::io(context(), source))
    }
}

impl From<FsError> for CallError {
    fn from(err: FsError) -> Self {
        CallError::Failed(err.to_string())
    }
}

use thiserror::Error;

/// Failures building the HTTP clients. Failures of individual requests are
/// reported in the result records instead.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

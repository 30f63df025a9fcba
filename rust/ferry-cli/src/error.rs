use ferry_core::{CallError, ConfigError};
use ferry_engine::AwaitError;
use ferry_provider_http::HttpError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("cannot read '{}': {source}", path.display())]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid toml in '{}': {source}", path.display())]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid log filter '{filter}': {reason}")]
    LogFilter { filter: String, reason: String },

    #[error("failed to start worker pool: {0}")]
    Workers(#[source] io::Error),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Build(#[from] ConfigError),

    #[error("no host object named '{0}'")]
    UnknownObject(String),

    #[error(transparent)]
    Call(#[from] CallError),

    #[error(transparent)]
    Await(#[from] AwaitError),
}

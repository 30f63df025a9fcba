//! The `ferry` command line.
//!
//! Builds a [`Session`] from `ferry.toml` with the `fs`, `http` and
//! `platform` host objects installed, then runs one member access per
//! invocation:
//! - `ferry call <object> <member> [ARGS...]`
//! - `ferry get <object> <property>`
//! - `ferry members <object>`

pub mod config;
pub mod error;
pub mod logging;
pub mod session;

pub use config::FerryConfig;
pub use error::CliError;
pub use session::{parse_arg, render, Session};

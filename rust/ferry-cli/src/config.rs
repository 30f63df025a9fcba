//! Configuration file parsing for `ferry.toml`.
//!
//! Searches the current directory then its ancestors, falling back to
//! `~/.config/ferry/ferry.toml` if no project-level file is found.

use crate::error::CliError;
use ferry_provider_http::HttpSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const FILE_NAME: &str = "ferry.toml";

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct FerryConfig {
    #[serde(default)]
    pub workers: WorkersSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub call: CallSection,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct WorkersSection {
    /// Worker threads; 0 means one per CPU.
    #[serde(default)]
    pub threads: usize,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LoggingSection {
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CallSection {
    /// How long `ferry call` waits for a promise to settle.
    #[serde(default = "default_call_timeout")]
    pub timeout_ms: u64,
}

impl Default for CallSection {
    fn default() -> Self {
        Self {
            timeout_ms: default_call_timeout(),
        }
    }
}

fn default_call_timeout() -> u64 {
    30_000
}

impl CallSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl FerryConfig {
    /// Load `path` if given, otherwise discover a file from the current
    /// directory. Returns `Default` when nothing is found.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let start = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
                Ok(Self::discover(&start)?
                    .map(|(_path, cfg)| cfg)
                    .unwrap_or_default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path).map_err(|source| CliError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| CliError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Find `ferry.toml` in `start` or an ancestor, then in the global
    /// config directory. A file that exists but does not parse is an error.
    pub fn discover(start: &Path) -> Result<Option<(PathBuf, Self)>, CliError> {
        let mut dir = start.to_path_buf();
        loop {
            let candidate = dir.join(FILE_NAME);
            if candidate.is_file() {
                let cfg = Self::load_from(&candidate)?;
                return Ok(Some((candidate, cfg)));
            }
            if !dir.pop() {
                break;
            }
        }
        if let Some(global) = global_path() {
            if global.is_file() {
                let cfg = Self::load_from(&global)?;
                return Ok(Some((global, cfg)));
            }
        }
        Ok(None)
    }

    /// Parse a TOML string directly.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}

fn global_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("ferry").join(FILE_NAME))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

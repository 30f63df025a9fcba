//! Platform provider for Ferry host objects.
//!
//! [`PlatformModule`] installs the `platform` object, whose properties name
//! the standard per-user directories:
//! - `platform`: OS name
//! - `homeDir`, `documentsDir`, `downloadsDir`, `picturesDir`, `musicDir`,
//!   `moviesDir`
//! - `cacheDir`, `dataDir`, `configDir`, `tempDir`
//! - `filesDir`: the application data directory
//!
//! `getDirectories()` returns all of them as one object. Directories that
//! cannot be resolved on the current system read as the empty string.

use ferry_core::{Engine, TypedResult};
use ferry_runtime::{HostModule, HostObjectBuilder};
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directory {
    Home,
    Documents,
    Downloads,
    Pictures,
    Music,
    Movies,
    Cache,
    Data,
    Config,
    Temp,
    Files,
}

impl Directory {
    pub const ALL: [Directory; 11] = [
        Directory::Home,
        Directory::Documents,
        Directory::Downloads,
        Directory::Pictures,
        Directory::Music,
        Directory::Movies,
        Directory::Cache,
        Directory::Data,
        Directory::Config,
        Directory::Temp,
        Directory::Files,
    ];

    pub fn property_name(self) -> &'static str {
        match self {
            Directory::Home => "homeDir",
            Directory::Documents => "documentsDir",
            Directory::Downloads => "downloadsDir",
            Directory::Pictures => "picturesDir",
            Directory::Music => "musicDir",
            Directory::Movies => "moviesDir",
            Directory::Cache => "cacheDir",
            Directory::Data => "dataDir",
            Directory::Config => "configDir",
            Directory::Temp => "tempDir",
            Directory::Files => "filesDir",
        }
    }

    fn locate(self) -> Option<PathBuf> {
        match self {
            Directory::Home => dirs::home_dir(),
            Directory::Documents => dirs::document_dir(),
            Directory::Downloads => dirs::download_dir(),
            Directory::Pictures => dirs::picture_dir(),
            Directory::Music => dirs::audio_dir(),
            Directory::Movies => dirs::video_dir(),
            Directory::Cache => dirs::cache_dir(),
            Directory::Data | Directory::Files => dirs::data_dir(),
            Directory::Config => dirs::config_dir(),
            Directory::Temp => Some(std::env::temp_dir()),
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// PlatformDirs
// ---------------------------------------------------------------------------

/// Lazily resolved, cached directory paths.
#[derive(Debug, Default)]
pub struct PlatformDirs {
    cells: [OnceCell<String>; 11],
}

impl PlatformDirs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of `dir`, resolved on first use.
    pub fn get(&self, dir: Directory) -> &str {
        self.cells[dir.index()].get_or_init(|| match dir.locate() {
            Some(path) => path.to_string_lossy().into_owned(),
            None => {
                tracing::debug!(directory = dir.property_name(), "directory not available");
                String::new()
            }
        })
    }

    pub fn is_resolved(&self, dir: Directory) -> bool {
        self.cells[dir.index()].get().is_some()
    }

    /// Every directory keyed by property name.
    pub fn all(&self) -> TypedResult {
        TypedResult::map(
            Directory::ALL
                .iter()
                .map(|dir| (dir.property_name(), self.get(*dir).into())),
        )
    }
}

// ---------------------------------------------------------------------------
// PlatformModule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct PlatformModule {
    dirs: Arc<PlatformDirs>,
}

impl PlatformModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dirs(&self) -> &Arc<PlatformDirs> {
        &self.dirs
    }
}

impl<E: Engine> HostModule<E> for PlatformModule {
    fn name(&self) -> &str {
        "platform"
    }

    fn install(&self, builder: &mut HostObjectBuilder<E>) {
        builder.constant("platform", std::env::consts::OS);
        for dir in Directory::ALL {
            let dirs = Arc::clone(&self.dirs);
            builder.property(dir.property_name(), move |engine| {
                Ok(engine.string(dirs.get(dir)))
            });
        }
        let dirs = Arc::clone(&self.dirs);
        builder.sync_typed("getDirectories", 0, move |_| Ok(dirs.all()));
    }
}

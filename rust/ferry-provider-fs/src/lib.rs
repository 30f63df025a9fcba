//! Filesystem provider for Ferry host objects.
//!
//! [`FsModule`] installs the `fs` object:
//! - queries: `exists`, `isFile`, `isDirectory`, `getMetadata`,
//!   `getFileSize`, `getModifiedTime`
//! - whole-file I/O: `readString`, `readBytes`, `writeString`, `writeBytes`
//! - management: `createFile`, `deleteFile`, `copyFile`, `moveFile`,
//!   `createDirectory`, `deleteDirectory`, `listDirectory`, `moveDirectory`
//! - paths: `getParentPath`, `getFileName`, `getFileExtension`,
//!   `getFileNameWithoutExtension`, `joinPaths`, `getAbsolutePath`,
//!   `normalizePath`
//! - storage: `getAvailableSpace`, `getTotalSpace`
//! - hashing: `calcHash`
//! - handles: `openFile`, `fileClose` and the async `file*` operations
//!
//! I/O operations are async and each has a blocking `*Sync` twin. Path
//! helpers, `openFile` and `fileClose` are sync only.

pub mod error;
pub mod handle;
pub mod hash;
pub mod module;
pub mod ops;
pub mod path;
pub mod types;

pub use error::FsError;
pub use handle::{FileHandle, HandleTable};
pub use module::{FsModule, VERSION};
pub use types::{EntityType, HashAlgorithm, OpenMode, SeekOrigin, WriteMode};

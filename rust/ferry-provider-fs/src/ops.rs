//! Path-based filesystem operations.
//!
//! Each function is shared by the `*Sync` method and its async
//! counterpart; none of them touch engine values.

use crate::error::{FsError, IoContext};
use crate::types::{millis_since_epoch, DirEntry, EntityType, FileMetadata, WriteMode};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

pub fn exists(path: &str) -> bool {
    Path::new(path).exists()
}

pub fn is_file(path: &str) -> bool {
    Path::new(path).is_file()
}

pub fn is_directory(path: &str) -> bool {
    Path::new(path).is_dir()
}

/// Metadata for `path`; a missing path yields zeroes and type `NotFound`.
pub fn metadata(path: &str) -> FileMetadata {
    let Ok(meta) = fs::metadata(path) else {
        return FileMetadata::default();
    };
    let kind = EntityType::of(Some(&meta));
    FileMetadata {
        size: if kind == EntityType::File { meta.len() } else { 0 },
        modified_ms: meta.modified().map(millis_since_epoch).unwrap_or(0),
        kind: Some(kind),
    }
}

pub fn file_size(path: &str) -> Result<u64, FsError> {
    fs::metadata(path)
        .map(|m| m.len())
        .context(|| format!("Failed to get file size: {}", path))
}

pub fn modified_time(path: &str) -> Result<u64, FsError> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map(millis_since_epoch)
        .context(|| format!("Failed to get modified time: {}", path))
}

// ---------------------------------------------------------------------------
// Reading and writing whole files
// ---------------------------------------------------------------------------

pub fn read_string(path: &str) -> Result<String, FsError> {
    let bytes = read_bytes(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn read_bytes(path: &str) -> Result<Vec<u8>, FsError> {
    fs::read(path).context(|| format!("Cannot open file for reading: {}", path))
}

pub fn write_string(
    path: &str,
    content: &str,
    mode: WriteMode,
    create_parents: bool,
) -> Result<(), FsError> {
    write_bytes(path, content.as_bytes(), mode, create_parents)
}

pub fn write_bytes(
    path: &str,
    data: &[u8],
    mode: WriteMode,
    create_parents: bool,
) -> Result<(), FsError> {
    if create_parents {
        ensure_parent(path);
    }
    let mut options = OpenOptions::new();
    options.create(true);
    match mode {
        WriteMode::Overwrite => options.write(true).truncate(true),
        WriteMode::Append => options.append(true),
    };
    let mut file = options
        .open(path)
        .context(|| format!("Cannot open file for writing: {}", path))?;
    file.write_all(data)
        .context(|| format!("Error writing file: {}", path))
}

fn ensure_parent(path: &str) {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            // An existing parent is fine; real failures surface on open.
            let _ = fs::create_dir_all(parent);
        }
    }
}

// ---------------------------------------------------------------------------
// File management
// ---------------------------------------------------------------------------

pub fn create_file(path: &str, create_parents: bool) -> Result<(), FsError> {
    if create_parents {
        ensure_parent(path);
    }
    fs::File::create(path)
        .map(drop)
        .context(|| format!("Failed to create file: {}", path))
}

/// `true` when a file was removed, `false` when there was nothing to remove.
pub fn delete_file(path: &str) -> bool {
    fs::remove_file(path).is_ok()
}

pub fn copy_file(src: &str, dst: &str, overwrite: bool) -> Result<(), FsError> {
    if !overwrite && Path::new(dst).exists() {
        return Err(FsError::io(
            "Failed to copy file",
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, format!("{} exists", dst)),
        ));
    }
    fs::copy(src, dst)
        .map(drop)
        .context(|| "Failed to copy file".to_string())
}

pub fn move_file(src: &str, dst: &str) -> Result<(), FsError> {
    fs::rename(src, dst).context(|| "Failed to move file".to_string())
}

// ---------------------------------------------------------------------------
// Directories
// ---------------------------------------------------------------------------

/// Creating a directory that already exists succeeds when `recursive`.
pub fn create_directory(path: &str, recursive: bool) -> Result<(), FsError> {
    if recursive {
        fs::create_dir_all(path)
    } else {
        fs::create_dir(path)
    }
    .context(|| "Failed to create directory".to_string())
}

/// Number of entries removed, the directory itself included.
pub fn delete_directory(path: &str, recursive: bool) -> Result<u64, FsError> {
    let target = Path::new(path);
    if !target.exists() {
        return Ok(0);
    }
    if recursive {
        let count = count_entries(target)? + 1;
        fs::remove_dir_all(target).context(|| "Failed to delete directory".to_string())?;
        Ok(count)
    } else {
        fs::remove_dir(target).context(|| "Failed to delete directory".to_string())?;
        Ok(1)
    }
}

fn count_entries(dir: &Path) -> Result<u64, FsError> {
    let mut count = 0;
    for entry in fs::read_dir(dir).context(|| "Failed to delete directory".to_string())? {
        let entry = entry.context(|| "Failed to delete directory".to_string())?;
        count += 1;
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            count += count_entries(&entry.path())?;
        }
    }
    Ok(count)
}

/// Entries of `path`, sorted by path. Recursive listings include the
/// contents of every subdirectory after the subdirectory itself.
pub fn list_directory(path: &str, recursive: bool) -> Result<Vec<DirEntry>, FsError> {
    let mut out = Vec::new();
    collect_entries(Path::new(path), recursive, &mut out)?;
    Ok(out)
}

fn collect_entries(dir: &Path, recursive: bool, out: &mut Vec<DirEntry>) -> Result<(), FsError> {
    let mut entries = fs::read_dir(dir)
        .and_then(|iter| iter.collect::<Result<Vec<_>, _>>())
        .context(|| "Failed to list directory".to_string())?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let entry_path = entry.path();
        let meta = fs::metadata(&entry_path).ok();
        let kind = EntityType::of(meta.as_ref());
        out.push(DirEntry {
            path: entry_path.to_string_lossy().into_owned(),
            name: entry.file_name().to_string_lossy().into_owned(),
            kind,
            size: match (&meta, kind) {
                (Some(m), EntityType::File) => m.len(),
                _ => 0,
            },
        });
        if recursive && kind == EntityType::Directory {
            collect_entries(&entry_path, true, out)?;
        }
    }
    Ok(())
}

pub fn move_directory(src: &str, dst: &str) -> Result<(), FsError> {
    fs::rename(src, dst).context(|| "Failed to move directory".to_string())
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

pub fn available_space(path: &str) -> Result<u64, FsError> {
    fs2::available_space(path).context(|| "Failed to get storage info".to_string())
}

pub fn total_space(path: &str) -> Result<u64, FsError> {
    fs2::total_space(path).context(|| "Failed to get storage info".to_string())
}

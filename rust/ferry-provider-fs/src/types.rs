//! Numeric codes exchanged with scripts.

use crate::error::FsError;
use ferry_core::TypedResult;
use std::fs::OpenOptions;
use std::io::SeekFrom;
use std::time::{SystemTime, UNIX_EPOCH};

fn code(value: f64) -> i64 {
    value as i64
}

// ---------------------------------------------------------------------------
// EntityType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType {
    NotFound = 0,
    File = 1,
    Directory = 2,
}

impl EntityType {
    pub fn of(metadata: Option<&std::fs::Metadata>) -> Self {
        match metadata {
            Some(m) if m.is_file() => EntityType::File,
            Some(m) if m.is_dir() => EntityType::Directory,
            _ => EntityType::NotFound,
        }
    }

    pub fn code(self) -> u32 {
        self as u32
    }
}

// ---------------------------------------------------------------------------
// WriteMode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    #[default]
    Overwrite,
    Append,
}

impl WriteMode {
    pub fn from_code(value: f64) -> Result<Self, FsError> {
        match code(value) {
            0 => Ok(WriteMode::Overwrite),
            1 => Ok(WriteMode::Append),
            other => Err(FsError::InvalidCode {
                what: "write mode",
                code: other,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// OpenMode
// ---------------------------------------------------------------------------

/// `r`, `w`, `a`, `r+`, `w+`, `a+`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    #[default]
    Read,
    Write,
    Append,
    ReadWrite,
    WriteRead,
    AppendRead,
}

impl OpenMode {
    pub fn from_code(value: f64) -> Result<Self, FsError> {
        Ok(match code(value) {
            0 => OpenMode::Read,
            1 => OpenMode::Write,
            2 => OpenMode::Append,
            3 => OpenMode::ReadWrite,
            4 => OpenMode::WriteRead,
            5 => OpenMode::AppendRead,
            other => {
                return Err(FsError::InvalidCode {
                    what: "open mode",
                    code: other,
                })
            }
        })
    }

    pub fn can_read(self) -> bool {
        matches!(
            self,
            OpenMode::Read | OpenMode::ReadWrite | OpenMode::WriteRead | OpenMode::AppendRead
        )
    }

    pub fn can_write(self) -> bool {
        self != OpenMode::Read
    }

    pub fn options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self {
            OpenMode::Read => options.read(true),
            OpenMode::Write => options.write(true).create(true).truncate(true),
            OpenMode::Append => options.append(true).create(true),
            OpenMode::ReadWrite => options.read(true).write(true),
            OpenMode::WriteRead => options.read(true).write(true).create(true).truncate(true),
            OpenMode::AppendRead => options.read(true).append(true).create(true),
        };
        options
    }
}

// ---------------------------------------------------------------------------
// SeekOrigin
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeekOrigin {
    #[default]
    Begin,
    Current,
    End,
}

impl SeekOrigin {
    pub fn from_code(value: f64) -> Result<Self, FsError> {
        match code(value) {
            0 => Ok(SeekOrigin::Begin),
            1 => Ok(SeekOrigin::Current),
            2 => Ok(SeekOrigin::End),
            other => Err(FsError::InvalidCode {
                what: "seek origin",
                code: other,
            }),
        }
    }

    pub fn seek_from(self, offset: i64) -> SeekFrom {
        match self {
            SeekOrigin::Begin => SeekFrom::Start(offset.max(0) as u64),
            SeekOrigin::Current => SeekFrom::Current(offset),
            SeekOrigin::End => SeekFrom::End(offset),
        }
    }
}

// ---------------------------------------------------------------------------
// HashAlgorithm
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    Md5,
    #[default]
    Sha256,
    Crc32,
    Sha224,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Codes 1 (SHA-1) and 3..=10 (SHA-3, Keccak) are recognised by scripts
    /// but not supported here.
    pub fn from_code(value: f64) -> Result<Self, FsError> {
        match code(value) {
            0 => Ok(HashAlgorithm::Md5),
            2 => Ok(HashAlgorithm::Sha256),
            11 => Ok(HashAlgorithm::Crc32),
            12 => Ok(HashAlgorithm::Sha224),
            13 => Ok(HashAlgorithm::Sha384),
            14 => Ok(HashAlgorithm::Sha512),
            other => Err(FsError::UnsupportedHash(other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Milliseconds since the Unix epoch; 0 for times before it.
pub fn millis_since_epoch(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileMetadata {
    pub size: u64,
    pub modified_ms: u64,
    pub kind: Option<EntityType>,
}

impl From<FileMetadata> for TypedResult {
    fn from(m: FileMetadata) -> Self {
        TypedResult::map([
            ("size", m.size.into()),
            ("modifiedTime", m.modified_ms.into()),
            ("type", m.kind.unwrap_or(EntityType::NotFound).code().into()),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub path: String,
    pub name: String,
    pub kind: EntityType,
    pub size: u64,
}

impl From<DirEntry> for TypedResult {
    fn from(e: DirEntry) -> Self {
        TypedResult::map([
            ("path", e.path.into()),
            ("name", e.name.into()),
            ("type", e.kind.code().into()),
            ("size", e.size.into()),
        ])
    }
}

//! Open file handles addressed by integer ids.
//!
//! Handles are shared between the engine thread (`openFile`, `fileClose`)
//! and worker threads (every other handle operation), so each one sits
//! behind its own mutex inside a locked table.

use crate::error::{FsError, IoContext};
use crate::types::{OpenMode, SeekOrigin};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

/// Longest line `read_line` returns before giving up on finding a newline.
pub const MAX_LINE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// FileHandle
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct FileHandle {
    file: File,
    path: String,
    mode: OpenMode,
}

impl FileHandle {
    pub fn open(path: &str, mode: OpenMode) -> Result<Self, FsError> {
        let file = mode
            .options()
            .open(path)
            .context(|| format!("Cannot open file: {}", path))?;
        Ok(Self {
            file,
            path: path.to_string(),
            mode,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    fn readable(&self) -> Result<(), FsError> {
        if self.mode.can_read() {
            Ok(())
        } else {
            Err(FsError::NotReadable)
        }
    }

    fn writable(&self) -> Result<(), FsError> {
        if self.mode.can_write() {
            Ok(())
        } else {
            Err(FsError::NotWritable)
        }
    }

    pub fn size(&self) -> Result<u64, FsError> {
        self.file
            .metadata()
            .map(|m| m.len())
            .context(|| format!("Failed to get file size: {}", self.path))
    }

    pub fn position(&mut self) -> Result<u64, FsError> {
        self.file.stream_position().context(|| "Seek failed".to_string())
    }

    pub fn is_eof(&mut self) -> Result<bool, FsError> {
        Ok(self.position()? >= self.size()?)
    }

    pub fn seek(&mut self, offset: i64, origin: SeekOrigin) -> Result<u64, FsError> {
        self.file
            .seek(origin.seek_from(offset))
            .context(|| "Seek failed".to_string())
    }

    pub fn rewind(&mut self) -> Result<(), FsError> {
        self.file.rewind().context(|| "Seek failed".to_string())
    }

    /// Read up to `size` bytes, or the rest of the file when `size` is `None`.
    pub fn read(&mut self, size: Option<u64>) -> Result<Vec<u8>, FsError> {
        self.readable()?;
        let mut buf = Vec::new();
        match size {
            Some(limit) => (&mut self.file).take(limit).read_to_end(&mut buf),
            None => self.file.read_to_end(&mut buf),
        }
        .context(|| "Read error".to_string())?;
        Ok(buf)
    }

    pub fn read_string(&mut self, size: Option<u64>) -> Result<String, FsError> {
        let bytes = self.read(size)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read through the next `\n`, dropping it and any `\r`. Returns the
    /// empty string at end of file. The position is left just past the
    /// newline.
    pub fn read_line(&mut self) -> Result<String, FsError> {
        self.readable()?;
        let mut line = Vec::new();
        let mut chunk = [0u8; 256];
        while line.len() < MAX_LINE {
            let n = self.file.read(&mut chunk).context(|| "Read error".to_string())?;
            if n == 0 {
                break;
            }
            if let Some(idx) = chunk[..n].iter().position(|&b| b == b'\n') {
                line.extend_from_slice(&chunk[..idx]);
                let unread = (n - idx - 1) as i64;
                if unread > 0 {
                    self.file
                        .seek(SeekFrom::Current(-unread))
                        .context(|| "Seek failed".to_string())?;
                }
                break;
            }
            line.extend_from_slice(&chunk[..n]);
        }
        line.retain(|&b| b != b'\r');
        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    /// Returns the number of bytes written.
    pub fn write(&mut self, data: &[u8]) -> Result<u64, FsError> {
        self.writable()?;
        self.file
            .write_all(data)
            .context(|| "Write error".to_string())?;
        Ok(data.len() as u64)
    }

    /// Writes `line` and a trailing newline.
    pub fn write_line(&mut self, line: &str) -> Result<u64, FsError> {
        Ok(self.write(line.as_bytes())? + self.write(b"\n")?)
    }

    pub fn flush(&mut self) -> Result<(), FsError> {
        self.file.flush().context(|| "Flush failed".to_string())
    }

    /// Cut the file at the current position.
    pub fn truncate(&mut self) -> Result<(), FsError> {
        self.writable()?;
        self.flush()?;
        let pos = self.position()?;
        self.file
            .set_len(pos)
            .context(|| "Truncate failed".to_string())
    }
}

// ---------------------------------------------------------------------------
// HandleTable
// ---------------------------------------------------------------------------

pub type SharedHandle = Arc<Mutex<FileHandle>>;

#[derive(Debug)]
pub struct HandleTable {
    handles: Mutex<HashMap<i32, SharedHandle>>,
    next_id: AtomicI32,
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleTable {
    pub fn new() -> Self {
        Self {
            handles: Mutex::new(HashMap::new()),
            next_id: AtomicI32::new(1),
        }
    }

    pub fn open(&self, path: &str, mode: OpenMode) -> Result<i32, FsError> {
        let handle = FileHandle::open(path, mode)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handles.lock().insert(id, Arc::new(Mutex::new(handle)));
        tracing::debug!(handle = id, path = %path, mode = ?mode, "file handle opened");
        Ok(id)
    }

    pub fn get(&self, id: i32) -> Result<SharedHandle, FsError> {
        self.handles
            .lock()
            .get(&id)
            .cloned()
            .ok_or(FsError::InvalidHandle(id))
    }

    /// Remove `id` and close it. Closing an unknown id is a no-op.
    ///
    /// The table lock is released before the file is flushed so a slow
    /// close never blocks other handles.
    pub fn close(&self, id: i32) -> bool {
        let removed = self.handles.lock().remove(&id);
        match removed {
            Some(handle) => {
                if let Err(err) = handle.lock().flush() {
                    tracing::warn!(handle = id, error = %err, "flush on close failed");
                }
                tracing::debug!(handle = id, "file handle closed");
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.handles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

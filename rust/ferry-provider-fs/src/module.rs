use crate::handle::HandleTable;
use crate::hash::hash_file;
use crate::types::{HashAlgorithm, OpenMode, SeekOrigin, WriteMode};
use crate::{ops, path};
use ferry_core::{AsyncArgs, CallError, Engine, TypedResult};
use ferry_runtime::{HostModule, HostObjectBuilder};
use std::sync::Arc;

pub const VERSION: &str = "1.0.0";

/// Installs the filesystem operations into a host object named `fs`.
///
/// The module owns the handle table, so objects built from the same module
/// share open handles.
#[derive(Debug, Clone, Default)]
pub struct FsModule {
    handles: Arc<HandleTable>,
}

impl FsModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handles(&self) -> &Arc<HandleTable> {
        &self.handles
    }
}

fn handle_id(args: &AsyncArgs) -> Result<i32, CallError> {
    Ok(args.num(0)? as i32)
}

/// Optional size argument; negative or absent means "the rest".
fn read_size(args: &AsyncArgs) -> Option<u64> {
    args.numbers.get(1).filter(|n| **n >= 0.0).map(|n| *n as u64)
}

fn unit<T>(_: T) -> TypedResult {
    TypedResult::Unit
}

/// Register `name` as an async method and `nameSync` as its inline twin.
fn io_method<E, F>(builder: &mut HostObjectBuilder<E>, name: &str, arity: usize, handler: F)
where
    E: Engine,
    F: Fn(&AsyncArgs) -> Result<TypedResult, CallError> + Clone + Send + Sync + 'static,
{
    builder.sync_typed(&format!("{}Sync", name), arity, handler.clone());
    builder.asynchronous(name, arity, handler);
}

impl<E: Engine> HostModule<E> for FsModule {
    fn name(&self) -> &str {
        "fs"
    }

    fn install(&self, b: &mut HostObjectBuilder<E>) {
        b.constant("version", VERSION)
            .constant("platform", std::env::consts::OS);

        // -- queries ----------------------------------------------------------
        io_method(b, "exists", 1, |a| Ok(ops::exists(a.str(0)?).into()));
        io_method(b, "isFile", 1, |a| Ok(ops::is_file(a.str(0)?).into()));
        io_method(b, "isDirectory", 1, |a| Ok(ops::is_directory(a.str(0)?).into()));
        io_method(b, "getMetadata", 1, |a| Ok(ops::metadata(a.str(0)?).into()));
        io_method(b, "getFileSize", 1, |a| Ok(ops::file_size(a.str(0)?)?.into()));
        io_method(b, "getModifiedTime", 1, |a| {
            Ok(ops::modified_time(a.str(0)?)?.into())
        });

        // -- whole-file I/O ---------------------------------------------------
        io_method(b, "readString", 1, |a| Ok(ops::read_string(a.str(0)?)?.into()));
        io_method(b, "readBytes", 1, |a| Ok(ops::read_bytes(a.str(0)?)?.into()));
        io_method(b, "writeString", 4, |a| {
            let mode = WriteMode::from_code(a.num_or(0, 0.0))?;
            ops::write_string(a.str(0)?, a.str(1)?, mode, a.bool_or(0, false))?;
            Ok(TypedResult::Unit)
        });
        io_method(b, "writeBytes", 4, |a| {
            let mode = WriteMode::from_code(a.num_or(0, 0.0))?;
            ops::write_bytes(a.str(0)?, a.buffer(0)?, mode, a.bool_or(0, false))?;
            Ok(TypedResult::Unit)
        });

        // -- file management --------------------------------------------------
        io_method(b, "createFile", 2, |a| {
            Ok(ops::create_file(a.str(0)?, a.bool_or(0, false)).map(unit)?)
        });
        io_method(b, "deleteFile", 1, |a| Ok(ops::delete_file(a.str(0)?).into()));
        io_method(b, "copyFile", 3, |a| {
            Ok(ops::copy_file(a.str(0)?, a.str(1)?, a.bool_or(0, true)).map(unit)?)
        });
        io_method(b, "moveFile", 2, |a| {
            Ok(ops::move_file(a.str(0)?, a.str(1)?).map(unit)?)
        });

        // -- directories ------------------------------------------------------
        io_method(b, "createDirectory", 2, |a| {
            Ok(ops::create_directory(a.str(0)?, a.bool_or(0, false)).map(unit)?)
        });
        io_method(b, "deleteDirectory", 2, |a| {
            Ok(ops::delete_directory(a.str(0)?, a.bool_or(0, false))?.into())
        });
        io_method(b, "listDirectory", 2, |a| {
            let entries = ops::list_directory(a.str(0)?, a.bool_or(0, false))?;
            Ok(TypedResult::List(entries.into_iter().map(Into::into).collect()))
        });
        io_method(b, "moveDirectory", 2, |a| {
            Ok(ops::move_directory(a.str(0)?, a.str(1)?).map(unit)?)
        });

        // -- paths ------------------------------------------------------------
        b.sync_typed("getParentPath", 1, |a| Ok(path::parent(a.str(0)?).into()))
            .sync_typed("getFileName", 1, |a| Ok(path::file_name(a.str(0)?).into()))
            .sync_typed("getFileExtension", 1, |a| Ok(path::extension(a.str(0)?).into()))
            .sync_typed("getFileNameWithoutExtension", 1, |a| {
                Ok(path::stem(a.str(0)?).into())
            })
            .sync_typed("joinPaths", 0, |a| Ok(path::join(a.strings_from(0)).into()));
        io_method(b, "getAbsolutePath", 1, |a| Ok(path::absolute(a.str(0)?)?.into()));
        io_method(b, "normalizePath", 1, |a| Ok(path::normalize(a.str(0)?).into()));

        // -- storage ----------------------------------------------------------
        io_method(b, "getAvailableSpace", 1, |a| {
            Ok(ops::available_space(a.str(0)?)?.into())
        });
        io_method(b, "getTotalSpace", 1, |a| Ok(ops::total_space(a.str(0)?)?.into()));

        // -- hashing ----------------------------------------------------------
        b.asynchronous("calcHash", 2, |a| {
            let algorithm = match a.numbers.first() {
                Some(code) => HashAlgorithm::from_code(*code)?,
                None => HashAlgorithm::default(),
            };
            Ok(hash_file(a.str(0)?, algorithm)?.into())
        });

        // -- handles ----------------------------------------------------------
        let table = Arc::clone(&self.handles);
        b.sync_typed("openFile", 2, move |a| {
            let mode = match a.numbers.first() {
                Some(code) => OpenMode::from_code(*code)?,
                None => OpenMode::default(),
            };
            Ok(table.open(a.str(0)?, mode)?.into())
        });
        let table = Arc::clone(&self.handles);
        b.sync_typed("fileClose", 1, move |a| {
            table.close(handle_id(a)?);
            Ok(TypedResult::Unit)
        });

        handle_method(b, &self.handles, "fileSeek", 3, |h, a| {
            let origin = SeekOrigin::from_code(a.num_or(2, 0.0))?;
            Ok(h.seek(a.num(1)? as i64, origin)?.into())
        });
        handle_method(b, &self.handles, "fileRewind", 1, |h, _| {
            Ok(h.rewind().map(unit)?)
        });
        handle_method(b, &self.handles, "fileGetPosition", 1, |h, _| {
            Ok(h.position()?.into())
        });
        handle_method(b, &self.handles, "fileGetSize", 1, |h, _| Ok(h.size()?.into()));
        handle_method(b, &self.handles, "fileIsEOF", 1, |h, _| Ok(h.is_eof()?.into()));
        handle_method(b, &self.handles, "fileFlush", 1, |h, _| Ok(h.flush().map(unit)?));
        handle_method(b, &self.handles, "fileTruncate", 1, |h, _| {
            Ok(h.truncate().map(unit)?)
        });
        handle_method(b, &self.handles, "fileRead", 2, |h, a| {
            Ok(h.read(read_size(a))?.into())
        });
        handle_method(b, &self.handles, "fileReadString", 2, |h, a| {
            Ok(h.read_string(read_size(a))?.into())
        });
        handle_method(b, &self.handles, "fileReadLine", 1, |h, _| {
            Ok(h.read_line()?.into())
        });
        handle_method(b, &self.handles, "fileWrite", 2, |h, a| {
            Ok(h.write(a.buffer(0)?)?.into())
        });
        handle_method(b, &self.handles, "fileWriteString", 2, |h, a| {
            Ok(h.write(a.str(0)?.as_bytes())?.into())
        });
        handle_method(b, &self.handles, "fileWriteLine", 2, |h, a| {
            Ok(h.write_line(a.str(0)?)?.into())
        });
    }
}

/// Register an async method whose first number argument is a handle id.
fn handle_method<E, F>(
    builder: &mut HostObjectBuilder<E>,
    table: &Arc<HandleTable>,
    name: &str,
    arity: usize,
    op: F,
) where
    E: Engine,
    F: Fn(&mut crate::handle::FileHandle, &AsyncArgs) -> Result<TypedResult, CallError>
        + Send
        + Sync
        + 'static,
{
    let table = Arc::clone(table);
    builder.asynchronous(name, arity, move |args| {
        let id = handle_id(args)?;
        let handle = table.get(id)?;
        let mut guard = handle.lock();
        op(&mut guard, args)
    });
}

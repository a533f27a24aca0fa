//! One complete transfer per call: file on disk → link, or link → file on disk.

use std::path::{Path, PathBuf};
use std::time::Instant;

use lineport_transport::SerialTransport;
use tracing::info;

use crate::config::{TransferConfig, TransferReport};
use crate::error::{ProtocolError, Result};
use crate::fs::{create_and_write, create_and_write_atomic, read_all_lines};
use crate::limits::Limits;
use crate::metadata::FileMetadata;
use crate::receiver::Receiver;
use crate::sender::Sender;
use crate::text::TextFile;

/// Load `path` and send it. The carried name is `name`, or the path's final
/// component.
///
/// All bound checks happen while loading, before the transport is touched.
pub fn send_path<T: SerialTransport>(
    path: impl AsRef<Path>,
    transport: T,
    config: &TransferConfig,
    name: Option<&str>,
) -> Result<TransferReport> {
    let (meta, file) = load_for_send(path, &config.limits, name)?;
    send_loaded(&meta, &file, transport, config)
}

/// Load and check `path` without touching any link.
pub fn load_for_send(
    path: impl AsRef<Path>,
    limits: &Limits,
    name: Option<&str>,
) -> Result<(FileMetadata, TextFile)> {
    let path = path.as_ref();
    let file = read_all_lines(path, limits)?;

    let name = match name {
        Some(name) => name.to_string(),
        None => path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| ProtocolError::InvalidFileName {
                name: path.display().to_string(),
                reason: "path has no UTF-8 file name",
            })?,
    };
    let meta = FileMetadata::new(name, file.total_lines(), limits)?;
    Ok((meta, file))
}

/// Send a file already produced by [`load_for_send`].
pub fn send_loaded<T: SerialTransport>(
    meta: &FileMetadata,
    file: &TextFile,
    transport: T,
    config: &TransferConfig,
) -> Result<TransferReport> {
    let mut sender = Sender::with_config(transport, config.clone());
    sender.send_file(meta, file)
}

/// Receive one file and write it under `dest`.
///
/// `dest` may be an existing directory (the carried name is used inside it)
/// or a file path. With `atomic`, the file is renamed into place only once
/// complete.
pub fn receive_into<T: SerialTransport>(
    dest: impl AsRef<Path>,
    transport: T,
    config: &TransferConfig,
    atomic: bool,
) -> Result<TransferReport> {
    let dest = dest.as_ref();
    let mut receiver = Receiver::with_config(transport, config.clone());

    let meta = receiver.receive_metadata()?;
    let started = Instant::now();
    let file = receiver.receive_lines(&meta)?;

    let target = resolve_destination(dest, meta.file_name());
    if atomic {
        create_and_write_atomic(&target, &file)?;
    } else {
        create_and_write(&target, &file)?;
    }
    info!(path = ?target, lines = file.total_lines(), "file materialized");

    Ok(TransferReport {
        file_name: meta.file_name().to_string(),
        total_lines: file.total_lines(),
        total_bytes: file.total_bytes(),
        framing: config.framing,
        elapsed: started.elapsed(),
        destination: Some(target),
    })
}

/// An existing directory receives the carried name; anything else is used
/// as the file path itself.
pub fn resolve_destination(dest: &Path, file_name: &str) -> PathBuf {
    if dest.is_dir() {
        dest.join(file_name)
    } else {
        dest.to_path_buf()
    }
}

use bytes::{BufMut, BytesMut};

use crate::error::{ProtocolError, Result};
use crate::limits::{Limits, MAX_FILE_NAME_LEN, METADATA_RECORD_SIZE};

/// Session header: the file's name and how many frames follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    file_name: String,
    total_lines: u32,
}

impl FileMetadata {
    /// Build a header, rejecting names that do not fit or cannot be used as a
    /// destination file name. Names are never truncated.
    pub fn new(file_name: impl Into<String>, total_lines: usize, limits: &Limits) -> Result<Self> {
        let file_name = file_name.into();
        if file_name.len() > MAX_FILE_NAME_LEN {
            return Err(ProtocolError::FileNameTooLong {
                len: file_name.len(),
                max: MAX_FILE_NAME_LEN,
            }
            .into());
        }
        if let Err(reason) = check_file_name(&file_name) {
            return Err(ProtocolError::InvalidFileName {
                name: file_name,
                reason,
            }
            .into());
        }
        let total_lines = checked_total(total_lines, limits)?;
        Ok(Self {
            file_name,
            total_lines,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn total_lines(&self) -> usize {
        self.total_lines as usize
    }
}

/// Encode the Metadata Record.
///
/// Wire format:
/// ```text
/// ┌──────────────────────────────┬──────────────┐
/// │ file_name (100B)             │ total_lines  │
/// │ UTF-8, zero-padded           │ (4B LE u32)  │
/// └──────────────────────────────┴──────────────┘
/// ```
pub fn encode_metadata(meta: &FileMetadata, dst: &mut BytesMut) {
    let name = meta.file_name.as_bytes();
    dst.reserve(METADATA_RECORD_SIZE);
    dst.put_slice(name);
    dst.put_bytes(0, MAX_FILE_NAME_LEN - name.len());
    dst.put_u32_le(meta.total_lines);
}

/// Decode a complete Metadata Record.
///
/// The line count is checked against `limits` before anything else in the
/// session happens, so a corrupted count can never drive an unbounded read
/// loop.
pub fn decode_metadata(src: &[u8], limits: &Limits) -> Result<FileMetadata> {
    if src.len() != METADATA_RECORD_SIZE {
        return Err(malformed(format!(
            "record is {} bytes, expected {METADATA_RECORD_SIZE}",
            src.len()
        )));
    }

    let (name_field, count_field) = src.split_at(MAX_FILE_NAME_LEN);
    let name_len = name_field
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(MAX_FILE_NAME_LEN);
    if name_field[name_len..].iter().any(|&b| b != 0) {
        return Err(malformed("non-zero bytes after file name terminator"));
    }

    let file_name = std::str::from_utf8(&name_field[..name_len])
        .map_err(|_| malformed("file name is not valid UTF-8"))?;
    check_file_name(file_name).map_err(|reason| malformed(format!("file name {reason}")))?;

    let mut count = [0u8; 4];
    count.copy_from_slice(count_field);
    let total_lines = checked_total(u32::from_le_bytes(count) as usize, limits)?;

    Ok(FileMetadata {
        file_name: file_name.to_string(),
        total_lines,
    })
}

fn checked_total(total_lines: usize, limits: &Limits) -> Result<u32> {
    if total_lines > limits.max_lines {
        return Err(ProtocolError::TooManyLines {
            count: total_lines,
            max: limits.max_lines,
        }
        .into());
    }
    u32::try_from(total_lines).map_err(|_| {
        ProtocolError::TooManyLines {
            count: total_lines,
            max: u32::MAX as usize,
        }
        .into()
    })
}

/// A carried name becomes a path component on the receiving side.
fn check_file_name(name: &str) -> std::result::Result<(), &'static str> {
    if name.is_empty() {
        return Err("is empty");
    }
    if name.contains('\0') {
        return Err("contains a NUL byte");
    }
    if name.contains(['/', '\\']) {
        return Err("contains a path separator");
    }
    if name == "." || name == ".." {
        return Err("is a relative directory reference");
    }
    Ok(())
}

fn malformed(reason: impl Into<String>) -> crate::error::TransferError {
    ProtocolError::MalformedMetadata(reason.into()).into()
}

//! Local filesystem side of a session: loading the source file and writing
//! the received one.

use std::fs::File;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{IoError, Result};
use crate::ingest::read_lines;
use crate::limits::Limits;
use crate::text::TextFile;

/// Load `path` as protocol lines.
pub fn read_all_lines(path: impl AsRef<Path>, limits: &Limits) -> Result<TextFile> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => IoError::NotFound {
            path: path.to_path_buf(),
        },
        _ => IoError::ReadFailed {
            path: path.to_path_buf(),
            source,
        },
    })?;
    read_lines(file, path, limits)
}

/// Create (or truncate) `path` and write every line verbatim, in order.
///
/// A failure part-way leaves whatever was written on disk.
pub fn create_and_write(path: impl AsRef<Path>, file: &TextFile) -> Result<()> {
    let path = path.as_ref();
    let write_err = |source: std::io::Error| IoError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let out = File::create(path).map_err(write_err)?;
    let mut out = BufWriter::new(out);
    for line in file {
        out.write_all(line.as_ref()).map_err(write_err)?;
    }
    out.flush().map_err(write_err)?;

    debug!(?path, lines = file.total_lines(), bytes = file.total_bytes(), "wrote file");
    Ok(())
}

/// Like [`create_and_write`], but the destination only appears once fully
/// written: data goes to a hidden sibling first and is renamed into place.
pub fn create_and_write_atomic(path: impl AsRef<Path>, file: &TextFile) -> Result<()> {
    let path = path.as_ref();
    let partial = partial_path(path);
    create_and_write(&partial, file)?;
    std::fs::rename(&partial, path).map_err(|source| IoError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// `dir/name` → `dir/.name.partial`.
pub fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.partial"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransferError;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "lineport-fs-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn santa() -> TextFile {
        TextFile::from_lines(
            Limits::default(),
            [&b"Santa\n"[..], &b"Tell\n"[..], &b"Me\n"[..]],
        )
        .unwrap()
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = temp_dir("missing");
        let err = read_all_lines(dir.join("absent.txt"), &Limits::default()).unwrap_err();
        assert!(matches!(err, TransferError::Io(IoError::NotFound { .. })));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn write_then_read_back() {
        let dir = temp_dir("roundtrip");
        let path = dir.join("santa.txt");

        create_and_write(&path, &santa()).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"Santa\nTell\nMe\n");

        let loaded = read_all_lines(&path, &Limits::default()).unwrap();
        assert_eq!(loaded.total_lines(), 3);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn materialization_is_idempotent() {
        let dir = temp_dir("idempotent");
        let path = dir.join("out.txt");
        let file = santa();

        create_and_write(&path, &file).unwrap();
        let first = std::fs::read(&path).unwrap();
        create_and_write(&path, &file).unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
        assert_eq!(second.len(), 13);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn overwrites_longer_existing_file() {
        let dir = temp_dir("truncate");
        let path = dir.join("out.txt");
        std::fs::write(&path, vec![b'z'; 4096]).unwrap();

        create_and_write(&path, &santa()).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"Santa\nTell\nMe\n");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_file_materializes_empty() {
        let dir = temp_dir("empty");
        let path = dir.join("empty.txt");

        create_and_write(&path, &TextFile::new(Limits::default())).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unwritable_destination_is_write_failed() {
        let dir = temp_dir("unwritable");
        let path = dir.join("no-such-dir").join("out.txt");

        let err = create_and_write(&path, &santa()).unwrap_err();
        assert!(matches!(err, TransferError::Io(IoError::WriteFailed { .. })));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn atomic_write_leaves_no_partial() {
        let dir = temp_dir("atomic");
        let path = dir.join("santa.txt");

        create_and_write_atomic(&path, &santa()).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"Santa\nTell\nMe\n");
        assert!(!partial_path(&path).exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn partial_path_is_hidden_sibling() {
        assert_eq!(
            partial_path(Path::new("/data/out.txt")),
            PathBuf::from("/data/.out.txt.partial")
        );
    }
}

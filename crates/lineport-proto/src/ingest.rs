//! Splitting a byte stream into protocol lines.
//!
//! A line ends at `\n` and keeps it. Bytes after the last `\n` form a final,
//! unterminated line, so every byte read lands in exactly one line and the
//! line count is the number of lines produced.

use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::Path;

use bytes::Bytes;
use tracing::debug;

use crate::error::{IoError, ProtocolError, Result};
use crate::limits::Limits;
use crate::text::{Line, TextFile};

/// Read every line of `reader`. `origin` names the source in errors.
///
/// Never buffers more than `max_line_len + 1` bytes of a single line; an
/// oversized line is measured by skipping to its end.
pub fn read_lines<R: Read>(reader: R, origin: &Path, limits: &Limits) -> Result<TextFile> {
    let mut reader = BufReader::new(reader);
    let mut file = TextFile::new(*limits);
    let mut buf = Vec::new();
    let read_err = |source: std::io::Error| IoError::ReadFailed {
        path: origin.to_path_buf(),
        source,
    };

    loop {
        buf.clear();
        let cap = limits.max_line_len as u64 + 1;
        let n = (&mut reader)
            .take(cap)
            .read_until(b'\n', &mut buf)
            .map_err(read_err)?;
        if n == 0 {
            break;
        }

        let number = file.total_lines() + 1;
        if buf.len() > limits.max_line_len {
            let rest = if buf.last() == Some(&b'\n') {
                0
            } else {
                skip_rest_of_line(&mut reader).map_err(read_err)?
            };
            return Err(ProtocolError::LineTooLong {
                line: number,
                len: buf.len() + rest,
                max: limits.max_line_len,
            }
            .into());
        }

        file.push(Line::new(Bytes::copy_from_slice(&buf)))?;
    }

    debug!(
        source = ?origin,
        lines = file.total_lines(),
        bytes = file.total_bytes(),
        "ingested file"
    );
    Ok(file)
}

fn skip_rest_of_line<B: BufRead>(reader: &mut B) -> std::io::Result<usize> {
    let mut skipped = 0usize;
    loop {
        let (done, used) = {
            let available = match reader.fill_buf() {
                Ok(available) => available,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            };
            if available.is_empty() {
                return Ok(skipped);
            }
            match available.iter().position(|&b| b == b'\n') {
                Some(i) => (true, i + 1),
                None => (false, available.len()),
            }
        };
        reader.consume(used);
        skipped += used;
        if done {
            return Ok(skipped);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::error::TransferError;

    fn ingest(data: &[u8], limits: Limits) -> Result<TextFile> {
        read_lines(Cursor::new(data.to_vec()), Path::new("<memory>"), &limits)
    }

    fn contents(file: &TextFile) -> Vec<&[u8]> {
        file.iter().map(|l| l.as_ref()).collect()
    }

    #[test]
    fn keeps_line_feeds() {
        let file = ingest(b"Santa\nTell\nMe\n", Limits::default()).unwrap();
        assert_eq!(
            contents(&file),
            vec![&b"Santa\n"[..], &b"Tell\n"[..], &b"Me\n"[..]]
        );
        assert_eq!(file.total_bytes(), 13);
    }

    #[test]
    fn unterminated_final_line_is_kept() {
        let file = ingest(b"first\nlast", Limits::default()).unwrap();
        assert_eq!(file.total_lines(), 2);
        assert_eq!(file.lines()[1].as_ref(), b"last");
        assert!(!file.lines()[1].is_terminated());
    }

    #[test]
    fn single_line_without_terminator() {
        let file = ingest(b"only", Limits::default()).unwrap();
        assert_eq!(file.total_lines(), 1);
    }

    #[test]
    fn empty_input_has_no_lines() {
        let file = ingest(b"", Limits::default()).unwrap();
        assert_eq!(file.total_lines(), 0);
        assert!(file.is_empty());
    }

    #[test]
    fn blank_lines_are_lines() {
        let file = ingest(b"\n\n\n", Limits::default()).unwrap();
        assert_eq!(file.total_lines(), 3);
        assert_eq!(file.total_bytes(), 3);
    }

    #[test]
    fn line_at_limit_is_accepted() {
        let mut data = vec![b'a'; DEFAULT_LEN - 1];
        data.push(b'\n');
        let file = ingest(&data, Limits::default()).unwrap();
        assert_eq!(file.lines()[0].len(), DEFAULT_LEN);
    }

    #[test]
    fn line_of_10001_bytes_rejected() {
        let mut data = b"short\n".to_vec();
        data.extend(std::iter::repeat(b'x').take(DEFAULT_LEN));
        data.push(b'\n');
        data.extend_from_slice(b"after\n");

        let err = ingest(&data, Limits::default()).unwrap_err();
        assert!(matches!(
            err,
            TransferError::Protocol(ProtocolError::LineTooLong {
                line: 2,
                len: 10_001,
                max: 10_000
            })
        ));
    }

    #[test]
    fn oversized_line_length_measured_past_buffer() {
        let limits = Limits {
            max_line_len: 8,
            ..Limits::default()
        };
        let err = ingest(b"0123456789abcdef\nnext\n", limits).unwrap_err();
        assert!(matches!(
            err,
            TransferError::Protocol(ProtocolError::LineTooLong { len: 17, .. })
        ));
    }

    #[test]
    fn too_many_lines_rejected() {
        let data = "x\n".repeat(1001);
        let err = ingest(data.as_bytes(), Limits::default()).unwrap_err();
        assert!(matches!(
            err,
            TransferError::Protocol(ProtocolError::TooManyLines {
                count: 1001,
                max: 1000
            })
        ));
    }

    #[test]
    fn exactly_max_lines_accepted() {
        let data = "x\n".repeat(1000);
        let file = ingest(data.as_bytes(), Limits::default()).unwrap();
        assert_eq!(file.total_lines(), 1000);
    }

    #[test]
    fn read_failure_propagates() {
        let err = read_lines(FailingReader, Path::new("broken.txt"), &Limits::default())
            .unwrap_err();
        assert!(matches!(
            err,
            TransferError::Io(IoError::ReadFailed { .. })
        ));
    }

    const DEFAULT_LEN: usize = crate::limits::DEFAULT_MAX_LINE_LEN;

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk on fire"))
        }
    }
}

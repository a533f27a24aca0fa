use std::time::Instant;

use bytes::{BufMut, BytesMut};
use lineport_transport::SerialTransport;
use tracing::{debug, info, warn};

use crate::config::{Framing, TransferConfig, TransferReport};
use crate::error::{Phase, ProtocolError, Result, TransferError};
use crate::limits::{FRAME_PREFIX_SIZE, METADATA_RECORD_SIZE};
use crate::metadata::{encode_metadata, FileMetadata};
use crate::text::{Line, TextFile};

/// Streams one file over a transport: the Metadata Record, then one frame
/// per line.
///
/// Every write is verified against the transport's reported byte count. The
/// first mismatch ends the session; frames already written stay written.
pub struct Sender<T> {
    transport: T,
    config: TransferConfig,
    buf: BytesMut,
}

impl<T: SerialTransport> Sender<T> {
    /// Create a sender with default configuration.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, TransferConfig::default())
    }

    /// Create a sender with explicit configuration.
    pub fn with_config(transport: T, config: TransferConfig) -> Self {
        Self {
            transport,
            config,
            buf: BytesMut::with_capacity(METADATA_RECORD_SIZE),
        }
    }

    /// Send a whole session.
    ///
    /// The header and every line are checked before the first byte is
    /// written, so bound violations never leave a half-sent session behind.
    pub fn send_file(&mut self, meta: &FileMetadata, file: &TextFile) -> Result<TransferReport> {
        self.validate(meta, file)?;
        let started = Instant::now();
        let total = file.total_lines();

        self.transport
            .set_timeouts(self.config.read_timeout, self.config.write_timeout)
            .map_err(|err| TransferError::transport(Phase::Metadata, err))?;

        info!(
            file = meta.file_name(),
            lines = total,
            bytes = file.total_bytes(),
            framing = %self.config.framing,
            "sending file"
        );

        self.send_metadata(meta)?;
        for (index, line) in file.iter().enumerate() {
            self.send_line(line, Phase::Frame { index, total })?;
        }

        let report = TransferReport {
            file_name: meta.file_name().to_string(),
            total_lines: total,
            total_bytes: file.total_bytes(),
            framing: self.config.framing,
            elapsed: started.elapsed(),
            destination: None,
        };
        info!(
            file = meta.file_name(),
            lines = total,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "file sent"
        );
        Ok(report)
    }

    /// Write the Metadata Record as a single write.
    pub fn send_metadata(&mut self, meta: &FileMetadata) -> Result<()> {
        self.buf.clear();
        encode_metadata(meta, &mut self.buf);
        write_checked(&mut self.transport, Phase::Metadata, &self.buf)?;
        debug!(file = meta.file_name(), lines = meta.total_lines(), "metadata sent");
        Ok(())
    }

    /// Write one line as one frame.
    pub fn send_line(&mut self, line: &Line, phase: Phase) -> Result<()> {
        match self.config.framing {
            Framing::Raw => write_checked(&mut self.transport, phase, line.as_ref())?,
            Framing::LengthPrefixed => {
                let prefix = frame_prefix(line.len(), phase)?;
                self.buf.clear();
                self.buf.reserve(FRAME_PREFIX_SIZE + line.len());
                self.buf.put_u32_le(prefix);
                self.buf.put_slice(line.as_ref());
                write_checked(&mut self.transport, phase, &self.buf)?;
            }
        }
        debug!(%phase, len = line.len(), "frame sent");
        Ok(())
    }

    fn validate(&self, meta: &FileMetadata, file: &TextFile) -> Result<()> {
        let limits = &self.config.limits;
        if meta.total_lines() != file.total_lines() {
            return Err(ProtocolError::LineCountMismatch {
                declared: meta.total_lines(),
                actual: file.total_lines(),
            }
            .into());
        }
        if file.total_lines() > limits.max_lines {
            return Err(ProtocolError::TooManyLines {
                count: file.total_lines(),
                max: limits.max_lines,
            }
            .into());
        }
        for (i, line) in file.iter().enumerate() {
            if line.len() > limits.max_line_len {
                return Err(ProtocolError::LineTooLong {
                    line: i + 1,
                    len: line.len(),
                    max: limits.max_line_len,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the sender and return the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Current configuration.
    pub fn config(&self) -> &TransferConfig {
        &self.config
    }
}

/// The 4-byte length prefix for a frame of `len` bytes.
fn frame_prefix(len: usize, phase: Phase) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        let line = match phase {
            Phase::Frame { index, .. } => index + 1,
            _ => 0,
        };
        TransferError::from(ProtocolError::LineTooLong {
            line,
            len,
            max: u32::MAX as usize,
        })
        .in_phase(phase)
    })
}

fn write_checked<T: SerialTransport>(transport: &mut T, phase: Phase, data: &[u8]) -> Result<()> {
    let written = transport
        .write_bytes(data)
        .map_err(|err| TransferError::transport(phase, err))?;
    if written != data.len() {
        warn!(%phase, expected = data.len(), actual = written, "short write, aborting session");
        return Err(ProtocolError::ShortWrite {
            phase,
            expected: data.len(),
            actual: written,
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use lineport_transport::{MemoryPort, TransportError};

    use super::*;
    use crate::limits::{Limits, MAX_FILE_NAME_LEN};

    fn santa() -> (FileMetadata, TextFile) {
        let file = TextFile::from_lines(
            Limits::default(),
            [&b"Santa\n"[..], &b"Tell\n"[..], &b"Me\n"[..]],
        )
        .unwrap();
        let meta = FileMetadata::new("santa.txt", file.total_lines(), &Limits::default()).unwrap();
        (meta, file)
    }

    #[test]
    fn writes_metadata_then_one_write_per_line() {
        let (meta, file) = santa();
        let mut sender = Sender::new(RecordingTransport::default());

        let report = sender.send_file(&meta, &file).unwrap();
        assert_eq!(report.total_lines, 3);
        assert_eq!(report.total_bytes, 13);

        let writes = &sender.get_ref().writes;
        assert_eq!(writes.len(), 4);
        assert_eq!(writes[0].len(), METADATA_RECORD_SIZE);
        assert_eq!(&writes[0][..9], b"santa.txt");
        assert_eq!(&writes[0][MAX_FILE_NAME_LEN..], &[3, 0, 0, 0]);
        assert_eq!(writes[1].as_ref(), b"Santa\n");
        assert_eq!(writes[2].as_ref(), b"Tell\n");
        assert_eq!(writes[3].as_ref(), b"Me\n");
    }

    #[test]
    fn short_write_aborts_remaining_frames() {
        let (meta, file) = santa();
        let transport = RecordingTransport {
            short_on_write: Some(2),
            ..RecordingTransport::default()
        };
        let mut sender = Sender::new(transport);

        let err = sender.send_file(&meta, &file).unwrap_err();
        assert!(matches!(
            err,
            TransferError::Protocol(ProtocolError::ShortWrite {
                phase: Phase::Frame { index: 1, total: 3 },
                expected: 5,
                actual: 4
            })
        ));
        assert_eq!(sender.get_ref().writes.len(), 3, "no frame after the short one");
    }

    #[test]
    fn short_metadata_write_sends_no_frames() {
        let (meta, file) = santa();
        let transport = RecordingTransport {
            short_on_write: Some(0),
            ..RecordingTransport::default()
        };
        let mut sender = Sender::new(transport);

        let err = sender.send_file(&meta, &file).unwrap_err();
        assert_eq!(err.phase(), Some(Phase::Metadata));
        assert_eq!(sender.get_ref().writes.len(), 1);
    }

    #[test]
    fn count_mismatch_rejected_before_io() {
        let (_, file) = santa();
        let meta = FileMetadata::new("santa.txt", 2, &Limits::default()).unwrap();
        let mut sender = Sender::new(RecordingTransport::default());

        let err = sender.send_file(&meta, &file).unwrap_err();
        assert!(matches!(
            err,
            TransferError::Protocol(ProtocolError::LineCountMismatch {
                declared: 2,
                actual: 3
            })
        ));
        assert!(sender.get_ref().writes.is_empty());
    }

    #[test]
    fn stricter_session_limit_rejected_before_io() {
        let (meta, file) = santa();
        let config = TransferConfig {
            limits: Limits {
                max_line_len: 5,
                ..Limits::default()
            },
            ..TransferConfig::default()
        };
        let mut sender = Sender::with_config(RecordingTransport::default(), config);

        let err = sender.send_file(&meta, &file).unwrap_err();
        assert!(matches!(
            err,
            TransferError::Protocol(ProtocolError::LineTooLong { line: 1, len: 6, max: 5 })
        ));
        assert!(sender.get_ref().writes.is_empty());
    }

    #[test]
    fn prefixed_frames_carry_length() {
        let (meta, file) = santa();
        let config = TransferConfig {
            framing: Framing::LengthPrefixed,
            ..TransferConfig::default()
        };
        let mut sender = Sender::with_config(RecordingTransport::default(), config);
        sender.send_file(&meta, &file).unwrap();

        let writes = &sender.get_ref().writes;
        assert_eq!(writes[1].as_ref(), b"\x06\x00\x00\x00Santa\n");
        assert_eq!(writes[3].as_ref(), b"\x03\x00\x00\x00Me\n");
    }

    #[test]
    fn write_timeout_maps_to_protocol_timeout() {
        let (meta, file) = santa();
        let mut sender = Sender::new(TimeoutTransport);

        let err = sender.send_file(&meta, &file).unwrap_err();
        assert!(matches!(
            err,
            TransferError::Protocol(ProtocolError::Timeout {
                phase: Phase::Metadata
            })
        ));
    }

    #[test]
    fn empty_file_sends_only_metadata() {
        let file = TextFile::new(Limits::default());
        let meta = FileMetadata::new("empty.txt", 0, &Limits::default()).unwrap();
        let (a, mut b) = MemoryPort::pair();
        let mut sender = Sender::new(a);

        sender.send_file(&meta, &file).unwrap();
        assert_eq!(b.pending(), 1);
        assert_eq!(b.read_bytes(1024).unwrap().len(), METADATA_RECORD_SIZE);
    }

    #[test]
    fn frame_prefix_carries_length() {
        let phase = Phase::Frame { index: 0, total: 1 };
        assert_eq!(frame_prefix(6, phase).unwrap(), 6);
        assert_eq!(frame_prefix(u32::MAX as usize, phase).unwrap(), u32::MAX);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn frame_prefix_rejects_length_past_u32() {
        let phase = Phase::Frame { index: 6, total: 9 };
        let len = u32::MAX as usize + 1;

        let err = frame_prefix(len, phase).unwrap_err();
        assert_eq!(err.phase(), Some(phase));
        match err {
            TransferError::Rejected {
                source: ProtocolError::LineTooLong { line, len: got, max },
                ..
            } => {
                assert_eq!(line, 7);
                assert_eq!(got, len);
                assert_eq!(max, u32::MAX as usize);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[derive(Default)]
    struct RecordingTransport {
        writes: Vec<Bytes>,
        short_on_write: Option<usize>,
    }

    impl SerialTransport for RecordingTransport {
        fn write_bytes(&mut self, data: &[u8]) -> lineport_transport::Result<usize> {
            let n = if self.short_on_write == Some(self.writes.len()) {
                data.len() - 1
            } else {
                data.len()
            };
            self.writes.push(Bytes::copy_from_slice(&data[..n]));
            Ok(n)
        }

        fn read_bytes(&mut self, _max_len: usize) -> lineport_transport::Result<Bytes> {
            Ok(Bytes::new())
        }
    }

    struct TimeoutTransport;

    impl SerialTransport for TimeoutTransport {
        fn write_bytes(&mut self, _data: &[u8]) -> lineport_transport::Result<usize> {
            Err(TransportError::Timeout)
        }

        fn read_bytes(&mut self, _max_len: usize) -> lineport_transport::Result<Bytes> {
            Err(TransportError::Timeout)
        }
    }
}

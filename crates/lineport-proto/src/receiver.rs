use bytes::{Bytes, BytesMut};
use lineport_transport::SerialTransport;
use tracing::{debug, info, warn};

use crate::config::{Framing, TransferConfig};
use crate::error::{Phase, ProtocolError, Result, TransferError};
use crate::limits::{FRAME_PREFIX_SIZE, METADATA_RECORD_SIZE};
use crate::metadata::{decode_metadata, FileMetadata};
use crate::text::{Line, TextFile};

/// Reassembles one file from a transport.
///
/// In [`Framing::Raw`] mode each line is exactly what one bounded read
/// returns: nothing on the wire tells a short line apart from a line the
/// link delivered in pieces.
pub struct Receiver<T> {
    transport: T,
    config: TransferConfig,
}

impl<T: SerialTransport> Receiver<T> {
    /// Create a receiver with default configuration.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, TransferConfig::default())
    }

    /// Create a receiver with explicit configuration.
    pub fn with_config(transport: T, config: TransferConfig) -> Self {
        Self { transport, config }
    }

    /// Receive the Metadata Record and every frame it announces.
    pub fn receive_file(&mut self) -> Result<(FileMetadata, TextFile)> {
        let meta = self.receive_metadata()?;
        let file = self.receive_lines(&meta)?;
        Ok((meta, file))
    }

    /// Read the fixed-size Metadata Record.
    ///
    /// Reads are bounded by the bytes still missing, so the record never
    /// absorbs the start of the first frame. `start_timeout` covers the wait
    /// for the first byte; the rest of the record is under `read_timeout`.
    pub fn receive_metadata(&mut self) -> Result<FileMetadata> {
        self.transport
            .set_timeouts(self.config.start_timeout, self.config.write_timeout)
            .map_err(|err| TransferError::transport(Phase::Metadata, err))?;

        let mut record = BytesMut::with_capacity(METADATA_RECORD_SIZE);
        while record.len() < METADATA_RECORD_SIZE {
            let chunk = self
                .transport
                .read_bytes(METADATA_RECORD_SIZE - record.len())
                .map_err(|err| TransferError::transport(Phase::Metadata, err))?;
            if chunk.is_empty() {
                warn!(received = record.len(), "stream ended inside metadata record");
                return Err(ProtocolError::MalformedMetadata(format!(
                    "stream ended after {} of {METADATA_RECORD_SIZE} bytes",
                    record.len()
                ))
                .into());
            }
            if record.is_empty() && self.config.start_timeout != self.config.read_timeout {
                self.transport
                    .set_timeouts(self.config.read_timeout, self.config.write_timeout)
                    .map_err(|err| TransferError::transport(Phase::Metadata, err))?;
            }
            record.extend_from_slice(&chunk);
        }

        let meta = decode_metadata(&record, &self.config.limits)
            .map_err(|err| err.in_phase(Phase::Metadata))?;
        info!(
            file = meta.file_name(),
            lines = meta.total_lines(),
            framing = %self.config.framing,
            "receiving file"
        );
        Ok(meta)
    }

    /// Read exactly `meta.total_lines()` frames.
    pub fn receive_lines(&mut self, meta: &FileMetadata) -> Result<TextFile> {
        let total = meta.total_lines();
        let first = Phase::Frame { index: 0, total };
        self.transport
            .set_timeouts(self.config.read_timeout, self.config.write_timeout)
            .map_err(|err| TransferError::transport(first, err))?;

        let mut file = TextFile::with_capacity(self.config.limits, total);
        for index in 0..total {
            let phase = Phase::Frame { index, total };
            let content = match self.config.framing {
                Framing::Raw => self.read_raw_frame(phase),
                Framing::LengthPrefixed => self.read_prefixed_frame(index, phase),
            }
            .map_err(|err| err.in_phase(phase))?;
            debug!(%phase, len = content.len(), "frame received");
            file.push(Line::new(content)).map_err(|err| err.in_phase(phase))?;
        }

        info!(
            file = meta.file_name(),
            lines = file.total_lines(),
            bytes = file.total_bytes(),
            "file received"
        );
        Ok(file)
    }

    fn read_raw_frame(&mut self, phase: Phase) -> Result<Bytes> {
        let content = self
            .transport
            .read_bytes(self.config.limits.max_line_len)
            .map_err(|err| TransferError::transport(phase, err))?;
        if content.is_empty() {
            warn!(%phase, "stream ended before all frames arrived");
            return Err(ProtocolError::UnexpectedEndOfStream { phase }.into());
        }
        Ok(content)
    }

    fn read_prefixed_frame(&mut self, index: usize, phase: Phase) -> Result<Bytes> {
        let prefix = self.read_exact(FRAME_PREFIX_SIZE, phase)?;
        let mut len = [0u8; FRAME_PREFIX_SIZE];
        len.copy_from_slice(&prefix);
        let len = u32::from_le_bytes(len) as usize;

        let max = self.config.limits.max_line_len;
        if len > max {
            return Err(ProtocolError::LineTooLong {
                line: index + 1,
                len,
                max,
            }
            .into());
        }
        if len == 0 {
            return Err(ProtocolError::EmptyLine { line: index + 1 }.into());
        }
        self.read_exact(len, phase)
    }

    fn read_exact(&mut self, len: usize, phase: Phase) -> Result<Bytes> {
        let mut out = BytesMut::with_capacity(len);
        while out.len() < len {
            let chunk = self
                .transport
                .read_bytes(len - out.len())
                .map_err(|err| TransferError::transport(phase, err))?;
            if chunk.is_empty() {
                warn!(%phase, "stream ended inside frame");
                return Err(ProtocolError::UnexpectedEndOfStream { phase }.into());
            }
            out.extend_from_slice(&chunk);
        }
        Ok(out.freeze())
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the receiver and return the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Current configuration.
    pub fn config(&self) -> &TransferConfig {
        &self.config
    }
}

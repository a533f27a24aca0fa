use std::fmt;
use std::path::PathBuf;

use lineport_transport::TransportError;

/// Where in a session an error happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Loading the source file into lines.
    Ingest,
    /// Sending or receiving the Metadata Record.
    Metadata,
    /// Sending or receiving one data frame (`index` is zero-based).
    Frame { index: usize, total: usize },
    /// Writing the destination file.
    FileWrite,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Ingest => f.write_str("ingest"),
            Phase::Metadata => f.write_str("metadata"),
            Phase::Frame { index, total } => write!(f, "frame {} of {}", index + 1, total),
            Phase::FileWrite => f.write_str("file write"),
        }
    }
}

/// Local filesystem failures.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// The source file does not exist.
    #[error("file not found: {path}")]
    NotFound { path: PathBuf },

    /// Opening or reading the source file failed.
    #[error("failed reading {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Creating or writing the destination file failed.
    #[error("failed writing {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Violations of the transfer protocol or its bounds.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The Metadata Record is truncated or does not decode.
    #[error("malformed metadata record: {0}")]
    MalformedMetadata(String),

    /// The file name does not fit the Metadata Record.
    #[error("file name is {len} bytes, max {max}")]
    FileNameTooLong { len: usize, max: usize },

    /// The file name cannot be carried or used as a destination name.
    #[error("invalid file name {name:?}: {reason}")]
    InvalidFileName { name: String, reason: &'static str },

    /// More lines than the session allows.
    #[error("too many lines ({count}, max {max})")]
    TooManyLines { count: usize, max: usize },

    /// A line longer than the maximum frame size.
    #[error("line {line} is {len} bytes, max {max}")]
    LineTooLong { line: usize, len: usize, max: usize },

    /// A zero-length line, which no frame can carry.
    #[error("line {line} is empty")]
    EmptyLine { line: usize },

    /// The declared line count does not match the lines about to be sent.
    #[error("metadata declares {declared} lines but file has {actual}")]
    LineCountMismatch { declared: usize, actual: usize },

    /// The transport accepted fewer (or more) bytes than the frame holds.
    #[error("short write during {phase}: expected {expected} bytes, wrote {actual}")]
    ShortWrite {
        phase: Phase,
        expected: usize,
        actual: usize,
    },

    /// The link ended while frames were still expected.
    #[error("unexpected end of stream during {phase}")]
    UnexpectedEndOfStream { phase: Phase },

    /// A blocking transport operation hit its timeout.
    #[error("timed out during {phase}")]
    Timeout { phase: Phase },
}

/// Any failure that ends a session.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The transport failed outside of a timeout.
    #[error("transport failed during {phase}: {source}")]
    Transport {
        phase: Phase,
        source: TransportError,
    },

    /// A bound or format violation in data received during `phase`.
    #[error("{phase} rejected: {source}")]
    Rejected {
        phase: Phase,
        #[source]
        source: ProtocolError,
    },
}

impl TransferError {
    /// Attribute a transport failure to a phase. Timeouts become
    /// [`ProtocolError::Timeout`].
    pub fn transport(phase: Phase, err: TransportError) -> Self {
        match err {
            TransportError::Timeout => ProtocolError::Timeout { phase }.into(),
            source => TransferError::Transport { phase, source },
        }
    }

    /// The session phase this error belongs to, when one is known.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            TransferError::Io(IoError::WriteFailed { .. }) => Some(Phase::FileWrite),
            TransferError::Io(_) => Some(Phase::Ingest),
            TransferError::Transport { phase, .. } | TransferError::Rejected { phase, .. } => {
                Some(*phase)
            }
            TransferError::Protocol(err) => own_phase(err),
        }
    }

    /// Tag a protocol error that carries no phase of its own with `phase`.
    pub fn in_phase(self, phase: Phase) -> Self {
        match self {
            TransferError::Protocol(source) if own_phase(&source).is_none() => {
                TransferError::Rejected { phase, source }
            }
            other => other,
        }
    }
}

fn own_phase(err: &ProtocolError) -> Option<Phase> {
    match err {
        ProtocolError::ShortWrite { phase, .. }
        | ProtocolError::UnexpectedEndOfStream { phase }
        | ProtocolError::Timeout { phase } => Some(*phase),
        ProtocolError::MalformedMetadata(_) => Some(Phase::Metadata),
        _ => None,
    }
}

pub type Result<T> = std::result::Result<T, TransferError>;

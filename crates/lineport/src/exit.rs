use std::fmt;
use std::io;

use lineport_proto::{IoError, ProtocolError, TransferError};
use lineport_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::BrokenPipe => TRANSPORT_ERROR,
        io::ErrorKind::Unsupported => INTERNAL,
        _ => FAILURE,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    let message = format!("{context}: {err}");
    match err {
        TransportError::Open { source, .. }
        | TransportError::Configure { source, .. }
        | TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => CliError::new(io_error(context, source).code, message),
        TransportError::UnsupportedBaud(_) | TransportError::PathTooLong { .. } => {
            CliError::new(USAGE, message)
        }
        TransportError::Timeout => CliError::new(TIMEOUT, message),
        TransportError::Closed => CliError::new(TRANSPORT_ERROR, message),
        TransportError::TimeoutsUnsupported => CliError::new(INTERNAL, message),
    }
}

pub fn transfer_error(context: &str, err: TransferError) -> CliError {
    let message = format!("{context}: {err}");
    match err {
        TransferError::Io(IoError::NotFound { .. }) => CliError::new(FAILURE, message),
        TransferError::Io(IoError::ReadFailed { source, .. })
        | TransferError::Io(IoError::WriteFailed { source, .. }) => {
            CliError::new(io_error(context, source).code, message)
        }
        TransferError::Transport { source, .. } => {
            CliError::new(transport_error(context, source).code, message)
        }
        TransferError::Protocol(err) | TransferError::Rejected { source: err, .. } => {
            CliError::new(protocol_code(&err), message)
        }
    }
}

fn protocol_code(err: &ProtocolError) -> i32 {
    match err {
        ProtocolError::Timeout { .. } => TIMEOUT,
        ProtocolError::ShortWrite { .. } | ProtocolError::UnexpectedEndOfStream { .. } => {
            TRANSPORT_ERROR
        }
        ProtocolError::MalformedMetadata(_)
        | ProtocolError::FileNameTooLong { .. }
        | ProtocolError::InvalidFileName { .. }
        | ProtocolError::TooManyLines { .. }
        | ProtocolError::LineTooLong { .. }
        | ProtocolError::EmptyLine { .. }
        | ProtocolError::LineCountMismatch { .. } => DATA_INVALID,
    }
}

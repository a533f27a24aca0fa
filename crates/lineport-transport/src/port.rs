use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::config::SerialConfig;
use crate::error::Result;
use crate::traits::SerialStream;

/// Prefix selecting a Unix socket link instead of a device.
pub const SOCKET_PREFIX: &str = "unix:";

/// Default device when none is given.
pub const DEFAULT_PORT: &str = "/dev/ttyS0";

/// Where a link endpoint lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSpec {
    /// A serial device node.
    Device(PathBuf),
    /// A Unix socket path (`unix:<path>`).
    Socket(PathBuf),
}

impl FromStr for PortSpec {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(path) = s.strip_prefix(SOCKET_PREFIX) {
            if path.is_empty() {
                return Err("socket port requires a path after 'unix:'".to_string());
            }
            return Ok(Self::Socket(PathBuf::from(path)));
        }
        if s.is_empty() {
            return Err("port must not be empty".to_string());
        }
        Ok(Self::Device(PathBuf::from(s)))
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device(path) => write!(f, "{}", path.display()),
            Self::Socket(path) => write!(f, "{SOCKET_PREFIX}{}", path.display()),
        }
    }
}

impl PortSpec {
    /// Open the sending end. Socket links connect to an already bound receiver.
    pub fn open_sender(&self, config: &SerialConfig) -> Result<SerialStream> {
        match self {
            Self::Device(path) => open_device(path, config),
            Self::Socket(path) => open_socket_sender(path),
        }
    }

    /// Open the receiving end. Socket links bind and wait at most
    /// `start_timeout` for one sender; `None` waits indefinitely.
    pub fn open_receiver(
        &self,
        config: &SerialConfig,
        start_timeout: Option<Duration>,
    ) -> Result<SerialStream> {
        match self {
            Self::Device(path) => open_device(path, config),
            Self::Socket(path) => open_socket_receiver(path, start_timeout),
        }
    }
}

#[cfg(unix)]
fn open_device(path: &std::path::Path, config: &SerialConfig) -> Result<SerialStream> {
    crate::serial::SerialDevice::open(path, config).map(crate::serial::SerialDevice::into_stream)
}

#[cfg(unix)]
fn open_socket_sender(path: &std::path::Path) -> Result<SerialStream> {
    crate::uds::SocketLink::connect(path)
}

#[cfg(unix)]
fn open_socket_receiver(
    path: &std::path::Path,
    start_timeout: Option<Duration>,
) -> Result<SerialStream> {
    let link = crate::uds::SocketLink::bind(path)?;
    link.accept_within(start_timeout)
}

#[cfg(not(unix))]
fn unsupported(path: &std::path::Path) -> crate::error::TransportError {
    crate::error::TransportError::Open {
        path: path.to_path_buf(),
        source: std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "serial links are only implemented for Unix hosts",
        ),
    }
}

#[cfg(not(unix))]
fn open_device(path: &std::path::Path, _config: &SerialConfig) -> Result<SerialStream> {
    Err(unsupported(path))
}

#[cfg(not(unix))]
fn open_socket_sender(path: &std::path::Path) -> Result<SerialStream> {
    Err(unsupported(path))
}

#[cfg(not(unix))]
fn open_socket_receiver(
    path: &std::path::Path,
    _start_timeout: Option<Duration>,
) -> Result<SerialStream> {
    Err(unsupported(path))
}

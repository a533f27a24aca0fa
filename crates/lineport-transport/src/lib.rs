//! Byte-oriented serial link abstraction.
//!
//! Provides the two primitives the transfer protocol is built on
//! ([`SerialTransport::write_bytes`] and [`SerialTransport::read_bytes`]) over:
//! - POSIX serial devices in raw mode (Linux/macOS)
//! - Unix domain sockets, as a cable stand-in for local testing
//! - An in-memory line that preserves write boundaries
//!
//! This is the lowest layer of lineport. Line settings (baud rate, data bits,
//! stop bits, parity) live here and must match on both ends.

pub mod config;
pub mod error;
pub mod memory;
pub mod port;
pub mod traits;

#[cfg(unix)]
pub mod serial;
#[cfg(unix)]
pub mod uds;

pub use config::{DataBits, Parity, SerialConfig, StopBits, DEFAULT_BAUD_RATE};
pub use error::{Result, TransportError};
pub use memory::MemoryPort;
pub use port::{PortSpec, DEFAULT_PORT, SOCKET_PREFIX};
pub use traits::{SerialStream, SerialTransport, StreamTransport};

#[cfg(unix)]
pub use serial::SerialDevice;
#[cfg(unix)]
pub use uds::SocketLink;

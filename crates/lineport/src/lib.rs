//! Line-by-line text file transfer over serial links.
//!
//! A sender streams a bounded text file as one fixed-size Metadata Record
//! (file name and line count) followed by one frame per line. The receiver
//! reassembles the lines and writes the file under the carried name.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial link abstraction (POSIX devices, Unix sockets, in-memory)
//! - [`proto`]: ingestion, metadata codec, sender/receiver, file materialization
//!
//! # Example
//!
//! ```no_run
//! use lineport::proto::{session, TransferConfig};
//! use lineport::transport::{PortSpec, SerialConfig};
//!
//! let port: PortSpec = "/dev/ttyUSB0".parse().unwrap();
//! let link = port.open_sender(&SerialConfig::default()).unwrap();
//! session::send_path("notes.txt", link, &TransferConfig::default(), None).unwrap();
//! ```

/// Re-export transport types.
pub mod transport {
    pub use lineport_transport::*;
}

/// Re-export protocol types.
pub mod proto {
    pub use lineport_proto::*;
}

//! Line-framed text file transfer protocol.
//!
//! A session carries one text file from a sender to a receiver:
//!
//! ```text
//! +------------------------------+---------------------+
//! | file name, NUL padded (100)  | total lines (u32 LE)|   Metadata Record
//! +------------------------------+---------------------+
//! | line 1 bytes, '\n' included                        |   frame 1
//! | ...                                                |
//! | line N bytes                                       |   frame N
//! +----------------------------------------------------+
//! ```
//!
//! Frames are unprefixed by default ([`Framing::Raw`]): the receiver takes
//! each bounded read as one whole line. [`Framing::LengthPrefixed`] adds a
//! 4-byte little-endian length before every frame for links that merge or
//! split writes.
//!
//! Bounds ([`Limits`]) are enforced on both ends: at most 1000 lines of at
//! most 10000 bytes each, and a file name of at most 100 bytes.

pub mod config;
pub mod error;
pub mod fs;
pub mod ingest;
pub mod limits;
pub mod metadata;
pub mod receiver;
pub mod sender;
pub mod session;
pub mod text;

pub use config::{Framing, TransferConfig, TransferReport};
pub use error::{IoError, Phase, ProtocolError, Result, TransferError};
pub use fs::{create_and_write, create_and_write_atomic, read_all_lines};
pub use ingest::read_lines;
pub use limits::{
    Limits, DEFAULT_MAX_LINES, DEFAULT_MAX_LINE_LEN, FRAME_PREFIX_SIZE, MAX_FILE_NAME_LEN,
    METADATA_RECORD_SIZE, TOTAL_LINES_SIZE,
};
pub use metadata::{decode_metadata, encode_metadata, FileMetadata};
pub use receiver::Receiver;
pub use sender::Sender;
pub use session::{load_for_send, receive_into, resolve_destination, send_loaded, send_path};
pub use text::{Line, TextFile};

//! Protocol bounds.
//!
//! Nothing on the wire carries these values: sender and receiver must agree
//! on them out of band. Every crossing produces a typed error.

/// Capacity of the file name field in the Metadata Record.
pub const MAX_FILE_NAME_LEN: usize = 100;

/// Width of the `total_lines` field in the Metadata Record.
pub const TOTAL_LINES_SIZE: usize = 4;

/// Metadata Record: file name (100) + total lines (4, LE) = 104 bytes.
pub const METADATA_RECORD_SIZE: usize = MAX_FILE_NAME_LEN + TOTAL_LINES_SIZE;

/// Default maximum number of lines per file.
pub const DEFAULT_MAX_LINES: usize = 1000;

/// Default maximum bytes per line, trailing line feed included.
pub const DEFAULT_MAX_LINE_LEN: usize = 10_000;

/// Length prefix width when [`Framing::LengthPrefixed`](crate::Framing) is used.
pub const FRAME_PREFIX_SIZE: usize = 4;

/// Per-session bounds on line count and line length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum number of lines (frames) in one session.
    pub max_lines: usize,
    /// Maximum bytes in one line, and the read size for one raw frame.
    pub max_line_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_MAX_LINES,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

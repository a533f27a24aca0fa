use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::limits::Limits;

/// How data frames are delimited on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// Unprefixed frames; one transport read is taken as one whole line.
    ///
    /// Nothing on the wire separates frames, so a link that merges or splits
    /// writes corrupts the session. This is the base protocol.
    #[default]
    Raw,
    /// Each frame is preceded by its length as a 4-byte little-endian integer.
    ///
    /// Protocol extension; both ends must opt in.
    LengthPrefixed,
}

impl fmt::Display for Framing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Framing::Raw => f.write_str("raw"),
            Framing::LengthPrefixed => f.write_str("prefixed"),
        }
    }
}

impl FromStr for Framing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(Framing::Raw),
            "prefixed" | "length-prefixed" => Ok(Framing::LengthPrefixed),
            other => Err(format!("unknown framing '{other}'")),
        }
    }
}

/// Configuration shared by both roles of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// Bounds agreed out of band.
    pub limits: Limits,
    /// Frame delimiting mode.
    pub framing: Framing,
    /// Receiver only: how long to wait for the Metadata Record.
    pub start_timeout: Option<Duration>,
    /// Read timeout once a session is under way.
    pub read_timeout: Option<Duration>,
    /// Write timeout for every frame.
    pub write_timeout: Option<Duration>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            framing: Framing::Raw,
            start_timeout: None,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

/// Outcome of a completed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub file_name: String,
    pub total_lines: usize,
    pub total_bytes: usize,
    pub framing: Framing,
    pub elapsed: Duration,
    /// Receiver only: where the file was written.
    pub destination: Option<PathBuf>,
}

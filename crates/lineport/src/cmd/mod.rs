use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use lineport_proto::{Framing, TransferConfig};
use lineport_transport::{DataBits, Parity, PortSpec, SerialConfig, StopBits, DEFAULT_PORT};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod receive;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a text file over the link.
    Send(SendArgs),
    /// Wait for one file on the link and write it to disk.
    Receive(ReceiveArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Receive(args) => receive::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Link and session settings. Both ends must agree on all of them.
#[derive(Args, Debug)]
pub struct LineArgs {
    /// Serial device path, or `unix:<path>` for a local socket link.
    #[arg(long, short = 'p', env = "LINEPORT_PORT", default_value = DEFAULT_PORT)]
    pub port: PortSpec,
    /// Baud rate.
    #[arg(long, env = "LINEPORT_BAUD", default_value = "9600")]
    pub baud: u32,
    /// Data bits per character (5-8).
    #[arg(long, default_value = "8", value_parser = clap::value_parser!(u8).range(5..=8))]
    pub data_bits: u8,
    /// Stop bits (1 or 2).
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u8).range(1..=2))]
    pub stop_bits: u8,
    /// Parity: none, odd or even.
    #[arg(long, default_value = "none")]
    pub parity: Parity,
    /// Frame delimiting: raw or prefixed.
    #[arg(long, default_value = "raw")]
    pub framing: Framing,
    /// Per-operation read/write timeout (e.g. 5s, 500ms); 0 waits forever.
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

impl LineArgs {
    pub fn serial_config(&self) -> CliResult<SerialConfig> {
        let data_bits = DataBits::from_count(self.data_bits).ok_or_else(|| {
            CliError::new(USAGE, format!("unsupported data bits: {}", self.data_bits))
        })?;
        let stop_bits = StopBits::from_count(self.stop_bits).ok_or_else(|| {
            CliError::new(USAGE, format!("unsupported stop bits: {}", self.stop_bits))
        })?;
        Ok(SerialConfig {
            baud_rate: self.baud,
            data_bits,
            stop_bits,
            parity: self.parity,
        })
    }

    pub fn transfer_config(&self) -> CliResult<TransferConfig> {
        let timeout = parse_timeout(&self.timeout)?;
        Ok(TransferConfig {
            framing: self.framing,
            read_timeout: timeout,
            write_timeout: timeout,
            ..TransferConfig::default()
        })
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Text file to send.
    pub file: PathBuf,
    /// Name to announce instead of the file's own name.
    #[arg(long)]
    pub name: Option<String>,
    #[command(flatten)]
    pub line: LineArgs,
}

#[derive(Args, Debug)]
pub struct ReceiveArgs {
    /// Destination directory (the sender's file name is used) or file path.
    pub dest: PathBuf,
    /// Write to a hidden temporary file and rename it once complete.
    #[arg(long)]
    pub atomic: bool,
    /// How long to wait for a sender to start (e.g. 30s); 0 waits forever.
    #[arg(long, default_value = "0")]
    pub start_timeout: String,
    #[command(flatten)]
    pub line: LineArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `5s`, `500ms` or a bare number of seconds. Zero disables the timeout.
pub fn parse_timeout(input: &str) -> CliResult<Option<Duration>> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(num) => (num, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    Ok(match (value, millis) {
        (0, _) => None,
        (ms, true) => Some(Duration::from_millis(ms)),
        (secs, false) => Some(Duration::from_secs(secs)),
    })
}

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::config::{DataBits, Parity, SerialConfig, StopBits};
use crate::error::{Result, TransportError};
use crate::traits::SerialStream;

/// A POSIX serial device (`/dev/ttyS0`, `/dev/ttyUSB0`, ...) in raw mode.
///
/// Timeouts are enforced with `poll(2)` before each read or write, so the
/// device itself stays in blocking mode with `VMIN = 1, VTIME = 0`.
pub struct SerialDevice {
    file: File,
    path: PathBuf,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

impl SerialDevice {
    /// Open `path` and apply `config`.
    pub fn open(path: impl AsRef<Path>, config: &SerialConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&path)
            .map_err(|e| TransportError::Open {
                path: path.clone(),
                source: e,
            })?;

        let device = Self {
            file,
            path,
            read_timeout: None,
            write_timeout: None,
        };
        device.configure(config)?;
        info!(path = ?device.path, %config, "opened serial device");
        Ok(device)
    }

    /// Apply line settings. Bytes queued before the call are discarded.
    pub fn configure(&self, config: &SerialConfig) -> Result<()> {
        let speed = speed_for(config.baud_rate)
            .ok_or(TransportError::UnsupportedBaud(config.baud_rate))?;
        let fd = self.file.as_raw_fd();
        let configure_err = |source: std::io::Error| TransportError::Configure {
            path: self.path.clone(),
            source,
        };

        // SAFETY: an all-zero termios is a valid value to pass to tcgetattr,
        // which overwrites it entirely.
        let mut tio: libc::termios = unsafe { std::mem::zeroed() };
        // SAFETY: `fd` is an open descriptor owned by `self.file`; `tio` is a
        // valid writable termios.
        if unsafe { libc::tcgetattr(fd, &mut tio) } != 0 {
            return Err(configure_err(std::io::Error::last_os_error()));
        }

        // SAFETY: `tio` is a valid termios obtained above.
        unsafe {
            libc::cfmakeraw(&mut tio);
            libc::cfsetispeed(&mut tio, speed);
            libc::cfsetospeed(&mut tio, speed);
        }

        tio.c_cflag &= !libc::CSIZE;
        tio.c_cflag |= match config.data_bits {
            DataBits::Five => libc::CS5,
            DataBits::Six => libc::CS6,
            DataBits::Seven => libc::CS7,
            DataBits::Eight => libc::CS8,
        };
        match config.stop_bits {
            StopBits::One => tio.c_cflag &= !libc::CSTOPB,
            StopBits::Two => tio.c_cflag |= libc::CSTOPB,
        }
        match config.parity {
            Parity::None => tio.c_cflag &= !(libc::PARENB | libc::PARODD),
            Parity::Even => {
                tio.c_cflag |= libc::PARENB;
                tio.c_cflag &= !libc::PARODD;
            }
            Parity::Odd => tio.c_cflag |= libc::PARENB | libc::PARODD,
        }
        tio.c_cflag |= libc::CLOCAL | libc::CREAD;
        tio.c_cc[libc::VMIN] = 1;
        tio.c_cc[libc::VTIME] = 0;

        // SAFETY: `fd` is open and `tio` is fully initialized.
        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tio) } != 0 {
            return Err(configure_err(std::io::Error::last_os_error()));
        }
        // SAFETY: `fd` is open.
        if unsafe { libc::tcflush(fd, libc::TCIOFLUSH) } != 0 {
            return Err(configure_err(std::io::Error::last_os_error()));
        }

        debug!(path = ?self.path, %config, "applied line settings");
        Ok(())
    }

    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout;
    }

    pub fn set_write_timeout(&mut self, timeout: Option<Duration>) {
        self.write_timeout = timeout;
    }

    /// The device path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wrap into the generic stream type.
    pub fn into_stream(self) -> SerialStream {
        SerialStream::from_device(self)
    }
}

impl Read for SerialDevice {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        wait_ready(self.file.as_raw_fd(), libc::POLLIN, self.read_timeout)?;
        self.file.read(buf)
    }
}

impl Write for SerialDevice {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        wait_ready(self.file.as_raw_fd(), libc::POLLOUT, self.write_timeout)?;
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

impl std::fmt::Debug for SerialDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialDevice")
            .field("path", &self.path)
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .finish()
    }
}

pub(crate) fn wait_ready(
    fd: std::os::fd::RawFd,
    events: libc::c_short,
    timeout: Option<Duration>,
) -> std::io::Result<()> {
    let Some(timeout) = timeout else {
        return Ok(());
    };
    let millis = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;
    let mut pfd = libc::pollfd {
        fd,
        events,
        revents: 0,
    };

    loop {
        // SAFETY: `pfd` is a valid pollfd and the count is 1.
        let rc = unsafe { libc::poll(&mut pfd, 1, millis) };
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if rc == 0 {
            return Err(std::io::Error::from(ErrorKind::TimedOut));
        }
        return Ok(());
    }
}

fn speed_for(baud: u32) -> Option<libc::speed_t> {
    let speed = match baud {
        50 => libc::B50,
        75 => libc::B75,
        110 => libc::B110,
        134 => libc::B134,
        150 => libc::B150,
        200 => libc::B200,
        300 => libc::B300,
        600 => libc::B600,
        1200 => libc::B1200,
        1800 => libc::B1800,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        230400 => libc::B230400,
        _ => return None,
    };
    Some(speed)
}

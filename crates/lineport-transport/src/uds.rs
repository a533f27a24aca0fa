use std::os::fd::AsRawFd;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::serial::wait_ready;
use crate::traits::SerialStream;

/// A Unix domain socket standing in for a serial cable.
///
/// The receiving end binds and waits for exactly one peer; the sending end
/// connects. This mirrors the operational rule that a receiver must be
/// listening before the sender starts writing.
pub struct SocketLink {
    listener: UnixListener,
    path: PathBuf,
    created_inode: (u64, u64),
}

impl SocketLink {
    /// Maximum socket path length (`sockaddr_un.sun_path`).
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Bind the receiving end at `path`, replacing a stale socket file.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let len = path.as_os_str().len();
        if len >= Self::MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path,
                len,
                max: Self::MAX_PATH_LEN,
            });
        }

        let bind_err = |path: &Path, source: std::io::Error| TransportError::Bind {
            path: path.to_path_buf(),
            source,
        };

        if let Ok(metadata) = std::fs::symlink_metadata(&path) {
            if !metadata.file_type().is_socket() {
                return Err(bind_err(
                    &path,
                    std::io::Error::new(
                        std::io::ErrorKind::AlreadyExists,
                        "existing path is not a unix socket",
                    ),
                ));
            }
            debug!(?path, "removing stale socket");
            std::fs::remove_file(&path).map_err(|e| bind_err(&path, e))?;
        }

        let listener = UnixListener::bind(&path).map_err(|e| bind_err(&path, e))?;
        let metadata = std::fs::symlink_metadata(&path).map_err(|e| bind_err(&path, e))?;

        info!(?path, "waiting for sender on unix socket link");

        Ok(Self {
            listener,
            path,
            created_inode: (metadata.dev(), metadata.ino()),
        })
    }

    /// Block until the sending end connects.
    pub fn accept(&self) -> Result<SerialStream> {
        self.accept_within(None)
    }

    /// Wait at most `timeout` for the sending end to connect.
    ///
    /// `None` waits indefinitely. Expiry is [`TransportError::Timeout`] and
    /// leaves the link bound.
    pub fn accept_within(&self, timeout: Option<Duration>) -> Result<SerialStream> {
        wait_ready(self.listener.as_raw_fd(), libc::POLLIN, timeout).map_err(|err| {
            if err.kind() == std::io::ErrorKind::TimedOut {
                TransportError::Timeout
            } else {
                TransportError::Accept(err)
            }
        })?;
        let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(path = ?self.path, "sender connected");
        Ok(SerialStream::from_socket(stream))
    }

    /// Connect the sending end to a bound link.
    pub fn connect(path: impl AsRef<Path>) -> Result<SerialStream> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).map_err(|e| TransportError::Connect {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!(?path, "connected to unix socket link");
        Ok(SerialStream::from_socket(stream))
    }

    /// The path this link is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SocketLink {
    fn drop(&mut self) {
        let Ok(metadata) = std::fs::symlink_metadata(&self.path) else {
            return;
        };
        if metadata.file_type().is_socket()
            && (metadata.dev(), metadata.ino()) == self.created_inode
        {
            debug!(path = ?self.path, "removing socket file");
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use bytes::{Bytes, BytesMut};

use crate::error::{Result, TransportError};

/// The two primitives a serial line offers.
///
/// Each call maps to exactly one underlying operation: `write_bytes` reports
/// how many bytes the driver accepted (callers verify the count), and
/// `read_bytes` returns whatever a single read produced, up to `max_len`.
/// An empty read means end of stream.
pub trait SerialTransport {
    /// Write `data` once and report how many bytes were accepted.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize>;

    /// Perform one read of at most `max_len` bytes.
    fn read_bytes(&mut self, max_len: usize) -> Result<Bytes>;

    /// Bound subsequent blocking reads and writes. `None` blocks indefinitely.
    fn set_timeouts(&mut self, read: Option<Duration>, write: Option<Duration>) -> Result<()> {
        let _ = (read, write);
        Ok(())
    }
}

impl<T: SerialTransport + ?Sized> SerialTransport for &mut T {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize> {
        (**self).write_bytes(data)
    }

    fn read_bytes(&mut self, max_len: usize) -> Result<Bytes> {
        (**self).read_bytes(max_len)
    }

    fn set_timeouts(&mut self, read: Option<Duration>, write: Option<Duration>) -> Result<()> {
        (**self).set_timeouts(read, write)
    }
}

/// An opened link endpoint: a serial device or a local socket standing in for one.
pub struct SerialStream {
    inner: SerialStreamInner,
}

enum SerialStreamInner {
    #[cfg(unix)]
    Device(crate::serial::SerialDevice),
    #[cfg(unix)]
    Socket(std::os::unix::net::UnixStream),
}

impl Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            SerialStreamInner::Device(dev) => dev.read(buf),
            #[cfg(unix)]
            SerialStreamInner::Socket(stream) => stream.read(buf),
        }
    }
}

impl Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            SerialStreamInner::Device(dev) => dev.write(buf),
            #[cfg(unix)]
            SerialStreamInner::Socket(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            SerialStreamInner::Device(dev) => dev.flush(),
            #[cfg(unix)]
            SerialStreamInner::Socket(stream) => stream.flush(),
        }
    }
}

impl SerialStream {
    #[cfg(unix)]
    pub(crate) fn from_device(dev: crate::serial::SerialDevice) -> Self {
        Self {
            inner: SerialStreamInner::Device(dev),
        }
    }

    #[cfg(unix)]
    pub(crate) fn from_socket(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: SerialStreamInner::Socket(stream),
        }
    }

    /// Set read timeout on the underlying endpoint.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            SerialStreamInner::Device(dev) => {
                dev.set_read_timeout(timeout);
                Ok(())
            }
            #[cfg(unix)]
            SerialStreamInner::Socket(stream) => {
                stream.set_read_timeout(timeout).map_err(Into::into)
            }
        }
    }

    /// Set write timeout on the underlying endpoint.
    pub fn set_write_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            SerialStreamInner::Device(dev) => {
                dev.set_write_timeout(timeout);
                Ok(())
            }
            #[cfg(unix)]
            SerialStreamInner::Socket(stream) => {
                stream.set_write_timeout(timeout).map_err(Into::into)
            }
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            #[cfg(unix)]
            SerialStreamInner::Device(_) => "serial-device",
            #[cfg(unix)]
            SerialStreamInner::Socket(_) => "unix-socket",
        }
    }
}

impl SerialTransport for SerialStream {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize> {
        write_once(self, data)
    }

    fn read_bytes(&mut self, max_len: usize) -> Result<Bytes> {
        read_once(self, max_len)
    }

    fn set_timeouts(&mut self, read: Option<Duration>, write: Option<Duration>) -> Result<()> {
        self.set_read_timeout(read)?;
        self.set_write_timeout(write)
    }
}

impl std::fmt::Debug for SerialStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialStream")
            .field("type", &self.transport_name())
            .finish()
    }
}

/// Adapts any `Read + Write` byte stream to [`SerialTransport`].
///
/// A plain stream has no way to bound a blocking call, so `set_timeouts`
/// fails with [`TransportError::TimeoutsUnsupported`] unless both timeouts are
/// `None`. Configure timeouts on the stream before wrapping and leave them
/// unset in the transfer configuration.
#[derive(Debug)]
pub struct StreamTransport<T> {
    inner: T,
}

impl<T: Read + Write> StreamTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the adapter and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + Write> SerialTransport for StreamTransport<T> {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize> {
        write_once(&mut self.inner, data)
    }

    fn read_bytes(&mut self, max_len: usize) -> Result<Bytes> {
        read_once(&mut self.inner, max_len)
    }

    fn set_timeouts(&mut self, read: Option<Duration>, write: Option<Duration>) -> Result<()> {
        if read.is_some() || write.is_some() {
            return Err(TransportError::TimeoutsUnsupported);
        }
        Ok(())
    }
}

/// One write followed by a flush. Interrupted calls are reissued.
pub(crate) fn write_once<W: Write + ?Sized>(inner: &mut W, data: &[u8]) -> Result<usize> {
    let written = loop {
        match inner.write(data) {
            Ok(n) => break n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(map_io(err)),
        }
    };

    loop {
        match inner.flush() {
            Ok(()) => return Ok(written),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(map_io(err)),
        }
    }
}

/// One read of at most `max_len` bytes. Interrupted calls are reissued.
pub(crate) fn read_once<R: Read + ?Sized>(inner: &mut R, max_len: usize) -> Result<Bytes> {
    let mut buf = BytesMut::zeroed(max_len);
    if max_len == 0 {
        return Ok(buf.freeze());
    }
    loop {
        match inner.read(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                return Ok(buf.freeze());
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(map_io(err)),
        }
    }
}

pub(crate) fn map_io(err: std::io::Error) -> TransportError {
    match err.kind() {
        ErrorKind::TimedOut | ErrorKind::WouldBlock => TransportError::Timeout,
        _ => TransportError::Io(err),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn read_once_is_bounded_by_max_len() {
        let mut transport = StreamTransport::new(Cursor::new(b"abcdef".to_vec()));
        assert_eq!(transport.read_bytes(4).unwrap().as_ref(), b"abcd");
        assert_eq!(transport.read_bytes(4).unwrap().as_ref(), b"ef");
        assert!(transport.read_bytes(4).unwrap().is_empty());
    }

    #[test]
    fn zero_length_read_does_not_touch_stream() {
        let mut transport = StreamTransport::new(Cursor::new(b"x".to_vec()));
        assert!(transport.read_bytes(0).unwrap().is_empty());
        assert_eq!(transport.read_bytes(1).unwrap().as_ref(), b"x");
    }

    #[test]
    fn write_reports_accepted_count() {
        let mut transport = StreamTransport::new(HalfWriter::default());
        assert_eq!(transport.write_bytes(b"abcd").unwrap(), 2);
        assert_eq!(transport.get_ref().data, b"ab");
    }

    #[test]
    fn interrupted_read_retries() {
        let mut transport = StreamTransport::new(InterruptedOnce {
            fired: false,
            data: b"ok".to_vec(),
        });
        assert_eq!(transport.read_bytes(8).unwrap().as_ref(), b"ok");
    }

    #[test]
    fn would_block_maps_to_timeout() {
        let mut transport = StreamTransport::new(AlwaysWouldBlock);
        assert!(matches!(
            transport.read_bytes(8),
            Err(TransportError::Timeout)
        ));
        assert!(matches!(
            transport.write_bytes(b"x"),
            Err(TransportError::Timeout)
        ));
    }

    #[test]
    fn stream_adapter_refuses_timeouts() {
        let mut transport = StreamTransport::new(Cursor::new(b"x".to_vec()));
        assert!(matches!(
            transport.set_timeouts(Some(Duration::from_secs(1)), None),
            Err(TransportError::TimeoutsUnsupported)
        ));
        assert!(matches!(
            transport.set_timeouts(None, Some(Duration::from_secs(1))),
            Err(TransportError::TimeoutsUnsupported)
        ));
        transport.set_timeouts(None, None).unwrap();
        assert_eq!(transport.read_bytes(1).unwrap().as_ref(), b"x");
    }

    #[test]
    fn mut_ref_forwards() {
        fn read_two<T: SerialTransport>(mut transport: T) -> Bytes {
            transport.read_bytes(2).unwrap()
        }

        let mut transport = StreamTransport::new(Cursor::new(b"hi!".to_vec()));
        assert_eq!(read_two(&mut transport).as_ref(), b"hi");
        assert_eq!(transport.read_bytes(2).unwrap().as_ref(), b"!");
    }

    #[derive(Default)]
    struct HalfWriter {
        data: Vec<u8>,
    }

    impl Read for HalfWriter {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Ok(0)
        }
    }

    impl Write for HalfWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let n = buf.len() / 2;
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct InterruptedOnce {
        fired: bool,
        data: Vec<u8>,
    }

    impl Read for InterruptedOnce {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.fired {
                self.fired = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let n = self.data.len().min(buf.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data.drain(..n);
            Ok(n)
        }
    }

    impl Write for InterruptedOnce {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct AlwaysWouldBlock;

    impl Read for AlwaysWouldBlock {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::WouldBlock))
        }
    }

    impl Write for AlwaysWouldBlock {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::WouldBlock))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}

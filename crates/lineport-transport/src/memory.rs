//! In-memory serial line.
//!
//! Unlike a socket, a [`MemoryPort`] preserves write boundaries: every
//! `write_bytes` call becomes one unit on the line, and a read returns at most
//! one unit (split if it exceeds `max_len`). This models a serial line where
//! the receiver drains each burst before the next one arrives.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::error::{Result, TransportError};
use crate::traits::SerialTransport;

#[derive(Default)]
struct Lane {
    units: VecDeque<Bytes>,
    writer_gone: bool,
    reader_gone: bool,
}

#[derive(Default)]
struct Shared {
    lane: Mutex<Lane>,
    ready: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Lane> {
        self.lane.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One end of an in-memory full-duplex line.
pub struct MemoryPort {
    tx: Arc<Shared>,
    rx: Arc<Shared>,
    read_timeout: Option<Duration>,
}

impl MemoryPort {
    /// Create two connected ends.
    pub fn pair() -> (MemoryPort, MemoryPort) {
        let a_to_b = Arc::new(Shared::default());
        let b_to_a = Arc::new(Shared::default());
        let a = MemoryPort {
            tx: Arc::clone(&a_to_b),
            rx: Arc::clone(&b_to_a),
            read_timeout: None,
        };
        let b = MemoryPort {
            tx: b_to_a,
            rx: a_to_b,
            read_timeout: None,
        };
        (a, b)
    }

    /// Number of written units waiting to be read on this end.
    pub fn pending(&self) -> usize {
        self.rx.lock().units.len()
    }
}

impl SerialTransport for MemoryPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize> {
        let mut lane = self.tx.lock();
        if lane.reader_gone {
            return Err(TransportError::Closed);
        }
        if !data.is_empty() {
            lane.units.push_back(Bytes::copy_from_slice(data));
            self.tx.ready.notify_all();
        }
        Ok(data.len())
    }

    fn read_bytes(&mut self, max_len: usize) -> Result<Bytes> {
        if max_len == 0 {
            return Ok(Bytes::new());
        }
        let deadline = self.read_timeout.map(|t| Instant::now() + t);
        let mut lane = self.rx.lock();

        loop {
            if let Some(mut unit) = lane.units.pop_front() {
                if unit.len() > max_len {
                    let head = unit.split_to(max_len);
                    lane.units.push_front(unit);
                    return Ok(head);
                }
                return Ok(unit);
            }
            if lane.writer_gone {
                return Ok(Bytes::new());
            }
            lane = match deadline {
                None => self
                    .rx
                    .ready
                    .wait(lane)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(TransportError::Timeout);
                    }
                    self.rx
                        .ready
                        .wait_timeout(lane, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }

    fn set_timeouts(&mut self, read: Option<Duration>, _write: Option<Duration>) -> Result<()> {
        self.read_timeout = read;
        Ok(())
    }
}

impl Drop for MemoryPort {
    fn drop(&mut self) {
        self.tx.lock().writer_gone = true;
        self.tx.ready.notify_all();
        self.rx.lock().reader_gone = true;
    }
}

impl std::fmt::Debug for MemoryPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryPort")
            .field("pending", &self.pending())
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

//! Byte transports for the lidar

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use serialport::{ClearBuffer, SerialPort};
use std::collections::VecDeque;
use std::io::{ErrorKind, Read};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::LidarError;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A source of raw lidar bytes.
pub trait Transport: Send {
    /// Read whatever bytes are available into `buffer`, returning how many were read.
    ///
    /// Returns `Ok(0)` when nothing arrived within the transport's read timeout.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, LidarError>;

    /// Discard any bytes already queued for reading.
    fn clear_input(&mut self) -> Result<(), LidarError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Serial port transport.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

/// In-memory transport fed by the test harness.
///
/// Clones share the same queue, so a test can keep a handle and inject bytes while the driver
/// owns the other.
#[derive(Clone, Default)]
pub struct MockTransport {
    rx: Arc<Mutex<VecDeque<u8>>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SerialTransport {
    pub fn open(port: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self, LidarError> {
        let serial = serialport::new(port, baud_rate)
            .timeout(read_timeout)
            .open()
            .map_err(|source| LidarError::OpenFailed {
                port: port.to_string(),
                source,
            })?;

        debug!("Opened lidar serial port {} at {} baud", port, baud_rate);

        Ok(Self { port: serial })
    }
}

impl Transport for SerialTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, LidarError> {
        match self.port.read(buffer) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(0),
            Err(e) if e.kind() == ErrorKind::Interrupted => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn clear_input(&mut self) -> Result<(), LidarError> {
        self.port.clear(ClearBuffer::Input)?;
        Ok(())
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes to be returned by later reads.
    pub fn inject_read(&self, data: &[u8]) {
        self.queue().extend(data.iter().copied());
    }

    /// Bytes still waiting to be read.
    pub fn pending(&self) -> usize {
        self.queue().len()
    }

    /// Number of live handles to this transport, including this one.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.rx)
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<u8>> {
        // A panicking test thread must not wedge the scan thread
        match self.rx.lock() {
            Ok(q) => q,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, LidarError> {
        let mut q = self.queue();
        let n = buffer.len().min(q.len());
        for (dst, src) in buffer.iter_mut().zip(q.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }
}

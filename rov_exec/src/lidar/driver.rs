//! Lidar driver and scan thread

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::{
    FrameSync, LidarError, LidarParams, SectorEstimator, SectorState, SerialTransport,
    SharedSectors, SyncStats, Transport,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Size of a single transport read.
const READ_CHUNK_SIZE: usize = 512;

/// Sleep after a read which returned nothing, so a non-blocking transport doesn't spin.
const IDLE_SLEEP: Duration = Duration::from_millis(1);

/// Transport shared between the driver and the scan thread.
///
/// The scan thread holds the lock only for the duration of one read. Taking the transport out
/// closes it, and the scan thread exits the next time it finds the slot empty.
type SharedTransport = Arc<Mutex<Option<Box<dyn Transport>>>>;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Handle to a running lidar scan thread.
pub struct LidarDriver {
    sectors: SharedSectors,
    transport: SharedTransport,
    terminator_tx: Sender<bool>,
    done_rx: Receiver<SyncStats>,
    scan_thread: Option<JoinHandle<()>>,
    join_timeout: Duration,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LidarDriver {
    /// Open the serial port named in the parameters and start scanning.
    pub fn open(params: &LidarParams) -> Result<Self, LidarError> {
        params.are_valid()?;

        let transport = SerialTransport::open(
            &params.port,
            params.baud_rate,
            Duration::from_millis(params.read_timeout_ms),
        )?;

        Self::start(Box::new(transport), params)
    }

    /// Start scanning on an already opened transport.
    pub fn start(transport: Box<dyn Transport>, params: &LidarParams) -> Result<Self, LidarError> {
        params.are_valid()?;

        let estimator = SectorEstimator::new(params);
        let sectors = SharedSectors::new(estimator.state());
        let sync = FrameSync::new(
            params.check_crc,
            Duration::from_millis(params.frame_timeout_ms),
        );

        let (terminator_tx, terminator_rx) = bounded(1);
        let (done_tx, done_rx) = bounded(1);

        let transport: SharedTransport = Arc::new(Mutex::new(Some(transport)));

        let thread_sectors = sectors.clone();
        let thread_transport = transport.clone();
        let scan_thread = thread::Builder::new()
            .name("lidar_scan".into())
            .spawn(move || {
                let stats = scan_loop(
                    &thread_transport,
                    sync,
                    estimator,
                    &thread_sectors,
                    &terminator_rx,
                );
                done_tx.send(stats).ok();
            })
            .map_err(LidarError::ThreadSpawnFailed)?;

        info!("Lidar scan thread started");

        Ok(Self {
            sectors,
            transport,
            terminator_tx,
            done_rx,
            scan_thread: Some(scan_thread),
            join_timeout: Duration::from_millis(params.join_timeout_ms),
        })
    }

    /// Latest published sector state.
    pub fn snapshot(&self) -> SectorState {
        self.sectors.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.scan_thread.is_some()
    }

    /// Stop the scan thread and release the transport.
    ///
    /// Waits at most the join timeout. If the thread has not exited by then it is detached with
    /// a warning, and the transport is taken away from it once its current read returns. Calling
    /// this on a stopped driver does nothing.
    pub fn stop(&mut self) {
        let handle = match self.scan_thread.take() {
            Some(h) => h,
            None => return,
        };

        // The thread may already have exited, in which case the channel is disconnected
        self.terminator_tx.try_send(true).ok();

        match self.done_rx.recv_timeout(self.join_timeout) {
            Ok(stats) => {
                if handle.join().is_err() {
                    warn!("Lidar scan thread panicked during shutdown");
                }
                info!(
                    "Lidar scan thread stopped: {} frames, {} CRC failures, {} malformed, \
                    {} stale partials, {} bytes skipped",
                    stats.frames,
                    stats.crc_failures,
                    stats.malformed,
                    stats.stale_partials,
                    stats.skipped_bytes
                );
            }
            Err(RecvTimeoutError::Disconnected) => {
                if handle.join().is_err() {
                    warn!("Lidar scan thread panicked");
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "Lidar scan thread did not exit within {:?}, detaching it",
                    self.join_timeout
                );
            }
        }

        self.release_transport();
    }

    /// Drop the transport, closing the port.
    fn release_transport(&mut self) {
        let released = match self.transport.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => {
                warn!("Lidar transport lock poisoned, releasing it anyway");
                poisoned.into_inner().take()
            }
        };

        if released.is_some() {
            debug!("Lidar transport released");
        }
    }
}

impl Drop for LidarDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Body of the scan thread. Returns the synchroniser statistics when terminated.
fn scan_loop(
    transport: &SharedTransport,
    mut sync: FrameSync,
    mut estimator: SectorEstimator,
    sectors: &SharedSectors,
    terminator_rx: &Receiver<bool>,
) -> SyncStats {
    if let Some(Err(e)) = with_transport(transport, |t| t.clear_input()) {
        warn!("Could not flush the lidar input buffer: {}", e);
    }

    let mut buf = [0u8; READ_CHUNK_SIZE];
    let mut read_failing = false;

    while !do_terminate(terminator_rx) {
        let read = match with_transport(transport, |t| t.read(&mut buf)) {
            Some(r) => r,
            None => {
                debug!("Lidar transport has been released");
                break;
            }
        };

        let num_read = match read {
            Ok(n) => {
                if read_failing {
                    info!("Lidar reads recovered");
                    read_failing = false;
                }
                n
            }
            Err(e) => {
                // Only report the first of a run of failures
                if !read_failing {
                    warn!("Lidar read failed: {}", e);
                    read_failing = true;
                }
                0
            }
        };

        if num_read > 0 {
            sync.push(&buf[..num_read]);
        }

        while let Some(packet) = sync.next_packet(Instant::now()) {
            sectors.publish(estimator.apply_packet(&packet));
        }

        if num_read == 0 {
            thread::sleep(IDLE_SLEEP);
        }
    }

    debug!("Lidar scan thread terminating");

    sync.stats()
}

/// Run `f` on the transport while holding its lock. Returns `None` once it has been released.
fn with_transport<T, F>(transport: &SharedTransport, f: F) -> Option<T>
where
    F: FnOnce(&mut Box<dyn Transport>) -> T,
{
    let mut slot = match transport.lock() {
        Ok(s) => s,
        Err(_) => {
            warn!("Lidar transport lock poisoned");
            return None;
        }
    };

    slot.as_mut().map(f)
}

/// True if the driver has asked the thread to stop, or has gone away.
fn do_terminate(terminator_rx: &Receiver<bool>) -> bool {
    match terminator_rx.try_recv() {
        Ok(t) => t,
        Err(TryRecvError::Empty) => false,
        Err(TryRecvError::Disconnected) => true,
    }
}

//! LD06 frame parsing
//!
//! A frame on the wire is:
//!
//! | Offset | Size | Content                                    |
//! |--------|------|--------------------------------------------|
//! | 0      | 1    | Header `0x54`                              |
//! | 1      | 1    | Ver/len `0x2C`                             |
//! | 2      | 2    | Rotation speed (unused)                    |
//! | 4      | 2    | Start angle, LE, 0.01 degree units         |
//! | 6      | 36   | 12 points of LE distance (mm) + intensity  |
//! | 42     | 2    | End angle, LE, 0.01 degree units           |
//! | 44     | 2    | Timestamp (unused)                         |
//! | 46     | 1    | CRC8 over bytes 0..46                      |
//!
//! Offsets inside this module are relative to the payload, which starts after the two header
//! bytes.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, trace};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::{RangeSample, SectorBounds, FULL_TURN_DEG};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

pub const HEADER: [u8; 2] = [0x54, 0x2C];

pub const HEADER_SIZE: usize = 2;

pub const PAYLOAD_SIZE: usize = 45;

pub const FRAME_SIZE: usize = HEADER_SIZE + PAYLOAD_SIZE;

pub const POINTS_PER_PACKET: usize = 12;

const START_ANGLE_OFFSET: usize = 2;
const FIRST_POINT_OFFSET: usize = 4;
const POINT_STRIDE: usize = 3;
const END_ANGLE_OFFSET: usize = 40;
const CRC_OFFSET: usize = PAYLOAD_SIZE - 1;

/// Raw angles are in hundredths of a degree.
const ANGLE_SCALE: f64 = 100.0;

/// Largest raw angle the sensor reports.
const MAX_RAW_ANGLE: u16 = 36000;

/// Widest start to end sweep accepted for one packet.
///
/// Units: degrees
const MAX_PACKET_SPAN_DEG: f64 = FULL_TURN_DEG / POINTS_PER_PACKET as f64;

const MM_PER_CM: f64 = 10.0;

/// Polynomial of the LD06 CRC8.
const CRC8_POLY: u8 = 0x4D;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A decoded lidar packet.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// Units: degrees
    pub start_angle_deg: f64,

    /// Units: degrees
    pub end_angle_deg: f64,

    /// Units: millimeters
    pub distances_mm: [u16; POINTS_PER_PACKET],
}

/// Counters kept by the frame synchroniser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Frames successfully decoded.
    pub frames: u64,

    /// Bytes thrown away while hunting for a header.
    pub skipped_bytes: u64,

    /// Frames rejected by the CRC check.
    pub crc_failures: u64,

    /// Partial frames abandoned after the frame timeout.
    pub stale_partials: u64,

    /// Complete frames rejected because their angles made no sense.
    pub malformed: u64,
}

/// Accumulates raw serial bytes and splits them into packets.
pub struct FrameSync {
    buffer: VecDeque<u8>,
    check_crc: bool,
    frame_timeout: Duration,

    /// When the partial frame currently at the head of the buffer was first seen.
    partial_since: Option<Instant>,

    stats: SyncStats,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PacketError {
    #[error("Expected a 45 byte payload, found {0} bytes")]
    WrongPayloadLength(usize),

    #[error("Raw angle {0} is beyond a full turn")]
    AngleOutOfRange(u16),

    #[error("Packet sweeps {0:.2} degrees, more than a packet can cover")]
    SpanTooWide(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Packet {
    /// Parse a packet from a payload (the frame without its two header bytes).
    ///
    /// Angles beyond a full turn, or a sweep wider than one packet can cover, mean the payload
    /// is not a real frame (for example a truncated frame followed by part of the next one).
    pub fn parse(payload: &[u8]) -> Result<Self, PacketError> {
        if payload.len() != PAYLOAD_SIZE {
            return Err(PacketError::WrongPayloadLength(payload.len()));
        }

        let mut distances_mm = [0u16; POINTS_PER_PACKET];
        for (i, d) in distances_mm.iter_mut().enumerate() {
            let offset = FIRST_POINT_OFFSET + i * POINT_STRIDE;
            *d = LittleEndian::read_u16(&payload[offset..offset + 2]);
        }

        let packet = Self {
            start_angle_deg: raw_angle_to_deg(&payload[START_ANGLE_OFFSET..])?,
            end_angle_deg: raw_angle_to_deg(&payload[END_ANGLE_OFFSET..])?,
            distances_mm,
        };

        let span = packet.angle_step_deg() * (POINTS_PER_PACKET - 1) as f64;
        if span > MAX_PACKET_SPAN_DEG {
            return Err(PacketError::SpanTooWide(span));
        }

        Ok(packet)
    }

    /// Angular step between consecutive points.
    ///
    /// A packet whose end angle is below its start angle has crossed 0 and is unwrapped.
    pub fn angle_step_deg(&self) -> f64 {
        let mut end = self.end_angle_deg;
        if end < self.start_angle_deg {
            end += FULL_TURN_DEG;
        }

        (end - self.start_angle_deg) / (POINTS_PER_PACKET - 1) as f64
    }

    /// Raw sensor angle and distance in centimeters of each point.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        let step = self.angle_step_deg();
        let start = self.start_angle_deg;

        self.distances_mm
            .iter()
            .enumerate()
            .map(move |(i, d)| (start + (i as f64) * step, (*d as f64) / MM_PER_CM))
    }

    /// Decode every point into a classified sample.
    pub fn samples<'a>(
        &'a self,
        mount_offset_deg: f64,
        bounds: &'a SectorBounds,
    ) -> impl Iterator<Item = RangeSample> + 'a {
        self.points()
            .map(move |(a, d)| RangeSample::new(a, d, mount_offset_deg, bounds))
    }
}

impl FrameSync {
    pub fn new(check_crc: bool, frame_timeout: Duration) -> Self {
        Self {
            buffer: VecDeque::with_capacity(4 * FRAME_SIZE),
            check_crc,
            frame_timeout,
            partial_since: None,
            stats: SyncStats::default(),
        }
    }

    /// Append freshly read bytes.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend(data.iter().copied());
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    /// Number of bytes waiting in the buffer.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Pull the next complete packet out of the buffer, if there is one.
    ///
    /// `now` is used to expire partial frames which have waited longer than the frame timeout.
    pub fn next_packet(&mut self, now: Instant) -> Option<Packet> {
        loop {
            if !self.align_to_header() {
                return None;
            }

            if self.buffer.len() < FRAME_SIZE {
                let since = *self.partial_since.get_or_insert(now);

                if now.saturating_duration_since(since) >= self.frame_timeout {
                    // Give up on this header and hunt for the next one
                    debug!("Discarding stale partial frame ({} bytes)", self.buffer.len());
                    self.buffer.pop_front();
                    self.partial_since = None;
                    self.stats.stale_partials += 1;
                    continue;
                }

                return None;
            }

            self.partial_since = None;

            let frame: Vec<u8> = self.buffer.iter().take(FRAME_SIZE).copied().collect();

            if self.check_crc && crc8(&frame[..FRAME_SIZE - 1]) != frame[FRAME_SIZE - 1] {
                // The header may have been a false match inside another frame
                debug!("Lidar frame failed CRC, resyncing");
                self.buffer.pop_front();
                self.stats.crc_failures += 1;
                continue;
            }

            match Packet::parse(&frame[HEADER_SIZE..]) {
                Ok(p) => {
                    self.buffer.drain(..FRAME_SIZE);
                    self.stats.frames += 1;
                    trace!(
                        "Lidar frame {:.2} to {:.2} deg",
                        p.start_angle_deg,
                        p.end_angle_deg
                    );
                    return Some(p);
                }
                Err(e) => {
                    // Same as a CRC failure, the real next header may be inside this frame
                    debug!("Dropping lidar frame: {}", e);
                    self.buffer.pop_front();
                    self.stats.malformed += 1;
                }
            }
        }
    }

    /// Drop bytes until the buffer starts with a header. Returns false if no header is present.
    fn align_to_header(&mut self) -> bool {
        let pos = {
            let (a, b) = self.buffer.as_slices();
            find_header(a, b)
        };

        match pos {
            Some(i) => {
                if i > 0 {
                    self.buffer.drain(..i);
                    self.stats.skipped_bytes += i as u64;
                    self.partial_since = None;
                }
                true
            }
            None => {
                // Keep a trailing first header byte, its partner may be in the next read
                let keep = match self.buffer.back() {
                    Some(&b) if b == HEADER[0] => 1,
                    _ => 0,
                };
                let drop = self.buffer.len() - keep;
                if drop > 0 {
                    self.buffer.drain(..drop);
                    self.stats.skipped_bytes += drop as u64;
                    self.partial_since = None;
                }
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the LD06 CRC8 (polynomial `0x4D`, initial value 0) of some bytes.
pub fn crc8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |mut crc, byte| {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ CRC8_POLY
            } else {
                crc << 1
            };
        }
        crc
    })
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn raw_angle_to_deg(bytes: &[u8]) -> Result<f64, PacketError> {
    let raw = LittleEndian::read_u16(bytes);
    if raw > MAX_RAW_ANGLE {
        return Err(PacketError::AngleOutOfRange(raw));
    }

    Ok((raw as f64) / ANGLE_SCALE)
}

/// Find the first index of the two byte header in a ring buffer split into two slices.
fn find_header(a: &[u8], b: &[u8]) -> Option<usize> {
    let len = a.len() + b.len();
    let at = |i: usize| if i < a.len() { a[i] } else { b[i - a.len()] };

    (0..len.saturating_sub(1)).find(|&i| at(i) == HEADER[0] && at(i + 1) == HEADER[1])
}

//! # Lidar module
//!
//! Decodes the byte stream of an LD06-style 2D lidar into the three sector distances (front,
//! left, right) used by steering control.
//!
//! The driver runs a background scan thread which owns the serial transport. Each complete
//! frame is checked, split into samples, classified into sectors and folded into the sector
//! estimate. The estimate is published as a whole after every frame, so readers on the control
//! loop always see a consistent triple.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod driver;
mod estimator;
mod packet;
mod params;
mod sector;
mod transport;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use driver::*;
pub use estimator::*;
pub use packet::*;
pub use params::*;
pub use sector::*;
pub use transport::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors that can occur in the lidar driver.
#[derive(Debug, thiserror::Error)]
pub enum LidarError {
    #[error("Could not open the lidar serial port {port}: {source}")]
    OpenFailed {
        port: String,
        source: serialport::Error,
    },

    #[error("Lidar serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("Lidar I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not start the lidar scan thread: {0}")]
    ThreadSpawnFailed(std::io::Error),

    #[error("Invalid lidar parameters: {0}")]
    InvalidParams(String),

    #[error("Malformed lidar packet: {0}")]
    Packet(#[from] PacketError),
}

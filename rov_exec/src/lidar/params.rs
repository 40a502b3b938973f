//! Parameters structure for the lidar driver

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::{LidarError, SectorBounds};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the lidar driver.
#[derive(Debug, Clone, Deserialize)]
pub struct LidarParams {
    // ---- SERIAL ----
    /// Path to the serial device the lidar is attached to.
    pub port: String,

    /// Serial baud rate.
    pub baud_rate: u32,

    /// Timeout of a single read on the serial port.
    ///
    /// Units: milliseconds
    pub read_timeout_ms: u64,

    /// Maximum time a partial frame may sit in the buffer before its header byte is discarded
    /// and the parser resyncs.
    ///
    /// Units: milliseconds
    pub frame_timeout_ms: u64,

    /// Maximum time to wait for the scan thread to exit when stopping.
    ///
    /// Units: milliseconds
    pub join_timeout_ms: u64,

    /// If true frames failing the CRC8 check are discarded.
    pub check_crc: bool,

    // ---- GEOMETRY ----
    /// Offset added to every raw sample angle to convert it into a rover-relative heading.
    ///
    /// Units: degrees
    pub mount_offset_deg: f64,

    /// Sector boundaries in the rover-relative heading frame.
    pub sectors: SectorBounds,

    // ---- ESTIMATION ----
    /// Samples at or beyond this distance are treated as invalid.
    ///
    /// Units: centimeters
    pub max_valid_dist_cm: f64,

    /// Distance reported for a sector with no information.
    ///
    /// Units: centimeters
    pub unknown_dist_cm: f64,

    /// Amount a sector estimate relaxes towards `unknown_dist_cm` for every frame which sweeps
    /// the sector without any closer return.
    ///
    /// Units: centimeters
    pub decay_step_cm: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for LidarParams {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".into(),
            baud_rate: 230_400,
            read_timeout_ms: 10,
            frame_timeout_ms: 1000,
            join_timeout_ms: 1000,
            check_crc: true,
            mount_offset_deg: 90.0,
            sectors: SectorBounds::default(),
            max_valid_dist_cm: 250.0,
            unknown_dist_cm: 999.0,
            decay_step_cm: 1.0,
        }
    }
}

impl LidarParams {
    /// Check the parameters are consistent.
    pub fn are_valid(&self) -> Result<(), LidarError> {
        if self.port.is_empty() {
            return Err(LidarError::InvalidParams("empty serial port path".into()));
        }
        if self.baud_rate == 0 {
            return Err(LidarError::InvalidParams("baud rate must be non-zero".into()));
        }
        if !(self.max_valid_dist_cm > 0.0) {
            return Err(LidarError::InvalidParams(format!(
                "max_valid_dist_cm must be positive, found {}",
                self.max_valid_dist_cm
            )));
        }
        if !(self.unknown_dist_cm >= self.max_valid_dist_cm) {
            return Err(LidarError::InvalidParams(format!(
                "unknown_dist_cm ({}) must not be below max_valid_dist_cm ({})",
                self.unknown_dist_cm, self.max_valid_dist_cm
            )));
        }
        if !(self.decay_step_cm > 0.0) {
            return Err(LidarError::InvalidParams(format!(
                "decay_step_cm must be positive, found {}",
                self.decay_step_cm
            )));
        }
        if !self.mount_offset_deg.is_finite() {
            return Err(LidarError::InvalidParams("mount_offset_deg must be finite".into()));
        }

        self.sectors.are_valid()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_params_valid() {
        let p = LidarParams::default();
        assert!(p.are_valid().is_ok());
        assert!(p.check_crc);
    }

    #[test]
    fn test_invalid_params() {
        let mut p = LidarParams::default();
        p.decay_step_cm = 0.0;
        assert!(p.are_valid().is_err());

        let mut p = LidarParams::default();
        p.unknown_dist_cm = 100.0;
        assert!(p.are_valid().is_err());

        let mut p = LidarParams::default();
        p.port = String::new();
        assert!(p.are_valid().is_err());
    }
}

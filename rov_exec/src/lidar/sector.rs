//! Sector classification of lidar samples

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use util::maths::rem_euclid;

use super::LidarError;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Degrees in a full revolution.
pub const FULL_TURN_DEG: f64 = 360.0;

/// Distance reported for a sector that has never seen a valid return.
///
/// Units: centimeters
pub const UNKNOWN_DIST_CM: f64 = 999.0;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The angular sector a sample belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Sector {
    Front,
    Left,
    Right,

    /// Behind the rover, or not a usable heading.
    Ignored,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Sector boundaries, as `[start, end)` pairs of rover-relative headings.
///
/// The front sector wraps through 0, so its start is greater than its end.
///
/// Units: degrees
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct SectorBounds {
    pub front_start_deg: f64,
    pub front_end_deg: f64,
    pub left_start_deg: f64,
    pub left_end_deg: f64,
    pub right_start_deg: f64,
    pub right_end_deg: f64,
}

/// A single decoded lidar return.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeSample {
    /// Rover-relative heading of the sample in `[0, 360)`.
    ///
    /// Units: degrees
    pub heading_deg: f64,

    /// Measured distance.
    ///
    /// Units: centimeters
    pub distance_cm: f64,

    pub sector: Sector,
}

/// Closest obstacle distance in each sector.
///
/// Units: centimeters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SectorState {
    pub front_cm: f64,
    pub left_cm: f64,
    pub right_cm: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Sector {
    /// Classify a rover-relative heading into a sector.
    ///
    /// Headings outside `[0, 360)` are wrapped first. Non-finite headings are `Ignored`.
    pub fn classify(heading_deg: f64, bounds: &SectorBounds) -> Self {
        if !heading_deg.is_finite() {
            return Sector::Ignored;
        }

        let h = normalise_heading(heading_deg);

        if in_range(h, bounds.front_start_deg, bounds.front_end_deg) {
            Sector::Front
        } else if in_range(h, bounds.left_start_deg, bounds.left_end_deg) {
            Sector::Left
        } else if in_range(h, bounds.right_start_deg, bounds.right_end_deg) {
            Sector::Right
        } else {
            Sector::Ignored
        }
    }
}

impl Default for SectorBounds {
    fn default() -> Self {
        Self {
            front_start_deg: 340.0,
            front_end_deg: 20.0,
            left_start_deg: 270.0,
            left_end_deg: 340.0,
            right_start_deg: 20.0,
            right_end_deg: 90.0,
        }
    }
}

impl SectorBounds {
    /// Check every bound lies within `[0, 360]`.
    pub fn are_valid(&self) -> Result<(), LidarError> {
        let all = [
            self.front_start_deg,
            self.front_end_deg,
            self.left_start_deg,
            self.left_end_deg,
            self.right_start_deg,
            self.right_end_deg,
        ];

        match all.iter().find(|b| !(**b >= 0.0 && **b <= FULL_TURN_DEG)) {
            Some(b) => Err(LidarError::InvalidParams(format!(
                "sector bound {} outside [0, 360]",
                b
            ))),
            None => Ok(()),
        }
    }
}

impl RangeSample {
    /// Build a sample from a raw sensor angle, applying the mount offset and classifying it.
    pub fn new(
        raw_angle_deg: f64,
        distance_cm: f64,
        mount_offset_deg: f64,
        bounds: &SectorBounds,
    ) -> Self {
        let heading_deg = normalise_heading(raw_angle_deg + mount_offset_deg);

        Self {
            heading_deg,
            distance_cm,
            sector: Sector::classify(heading_deg, bounds),
        }
    }
}

impl SectorState {
    /// A state where every sector reports the given unknown distance.
    pub fn unknown(unknown_dist_cm: f64) -> Self {
        Self {
            front_cm: unknown_dist_cm,
            left_cm: unknown_dist_cm,
            right_cm: unknown_dist_cm,
        }
    }

    /// Distance for a sector, `None` for `Sector::Ignored`.
    pub fn get(&self, sector: Sector) -> Option<f64> {
        match sector {
            Sector::Front => Some(self.front_cm),
            Sector::Left => Some(self.left_cm),
            Sector::Right => Some(self.right_cm),
            Sector::Ignored => None,
        }
    }

    pub(crate) fn get_mut(&mut self, sector: Sector) -> Option<&mut f64> {
        match sector {
            Sector::Front => Some(&mut self.front_cm),
            Sector::Left => Some(&mut self.left_cm),
            Sector::Right => Some(&mut self.right_cm),
            Sector::Ignored => None,
        }
    }
}

impl Default for SectorState {
    fn default() -> Self {
        Self::unknown(UNKNOWN_DIST_CM)
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Wrap a heading into `[0, 360)`.
fn normalise_heading(heading_deg: f64) -> f64 {
    let h = rem_euclid(heading_deg, FULL_TURN_DEG);

    // Rounding can land tiny negative inputs exactly on 360
    if h >= FULL_TURN_DEG {
        0.0
    } else {
        h
    }
}

/// True if `h` is in `[start, end)`, wrapping through 0 when `start > end`.
fn in_range(h: f64, start: f64, end: f64) -> bool {
    if start > end {
        h >= start || h < end
    } else {
        h >= start && h < end
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_classify_boundaries() {
        let b = SectorBounds::default();

        assert_eq!(Sector::classify(0.0, &b), Sector::Front);
        assert_eq!(Sector::classify(340.0, &b), Sector::Front);
        assert_eq!(Sector::classify(19.999, &b), Sector::Front);
        assert_eq!(Sector::classify(20.0, &b), Sector::Right);
        assert_eq!(Sector::classify(89.9, &b), Sector::Right);
        assert_eq!(Sector::classify(90.0, &b), Sector::Ignored);
        assert_eq!(Sector::classify(180.0, &b), Sector::Ignored);
        assert_eq!(Sector::classify(269.9, &b), Sector::Ignored);
        assert_eq!(Sector::classify(270.0, &b), Sector::Left);
        assert_eq!(Sector::classify(339.9, &b), Sector::Left);
    }

    #[test]
    fn test_classify_wraps_and_rejects_nan() {
        let b = SectorBounds::default();

        assert_eq!(Sector::classify(360.0, &b), Sector::Front);
        assert_eq!(Sector::classify(-10.0, &b), Sector::Front);
        assert_eq!(Sector::classify(-80.0, &b), Sector::Left);
        assert_eq!(Sector::classify(400.0, &b), Sector::Right);
        assert_eq!(Sector::classify(std::f64::NAN, &b), Sector::Ignored);
        assert_eq!(Sector::classify(std::f64::INFINITY, &b), Sector::Ignored);
    }

    #[test]
    fn test_sample_mount_offset() {
        let b = SectorBounds::default();

        // Sensor zero points 90 degrees left of the rover's front
        let s = RangeSample::new(270.0, 50.0, 90.0, &b);
        assert_eq!(s.heading_deg, 0.0);
        assert_eq!(s.sector, Sector::Front);

        let s = RangeSample::new(200.0, 50.0, 90.0, &b);
        assert_eq!(s.heading_deg, 290.0);
        assert_eq!(s.sector, Sector::Left);
    }

    #[test]
    fn test_bounds_validation() {
        assert!(SectorBounds::default().are_valid().is_ok());

        let mut b = SectorBounds::default();
        b.left_end_deg = 361.0;
        assert!(b.are_valid().is_err());
    }
}

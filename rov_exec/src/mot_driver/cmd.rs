//! Wheel command types

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Normalised left and right wheel demands, nominally in `[-1, 1]`.
///
/// Positive is forwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MotionCommand {
    pub left: f64,
    pub right: f64,
}

/// Signed signals actually written to the H-bridge channels, in `[-1, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WheelSignals {
    pub left: f64,
    pub right: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotionCommand {
    pub fn new(left: f64, right: f64) -> Self {
        Self { left, right }
    }

    /// Same demand on both wheels.
    pub fn straight(speed: f64) -> Self {
        Self::new(speed, speed)
    }

    pub fn stop() -> Self {
        Self::default()
    }
}

impl WheelSignals {
    pub fn is_stopped(&self) -> bool {
        self.left == 0.0 && self.right == 0.0
    }
}

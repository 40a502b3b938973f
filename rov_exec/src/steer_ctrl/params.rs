//! Parameters structure for SteerCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::SteerCtrlError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for steering control.
#[derive(Debug, Clone, Deserialize)]
pub struct SteerCtrlParams {
    // ---- SPEED ----
    /// Speed when the path ahead is clear.
    pub default_speed: f64,

    /// Lowest speed used while slowing.
    pub min_approach_speed: f64,

    // ---- THRESHOLDS ----
    /// Front distance below which the rover slows.
    ///
    /// Units: centimeters
    pub slowdown_dist_cm: f64,

    /// Front distance at which the proportional slowdown law reaches zero.
    ///
    /// Units: centimeters
    pub stopping_dist_cm: f64,

    /// Front distance below which the escape manoeuvre runs.
    ///
    /// Units: centimeters
    pub critical_dist_cm: f64,

    /// Side distance below which the rover steers away from a wall.
    ///
    /// Units: centimeters
    pub side_cushion_dist_cm: f64,

    // ---- STEERING ----
    /// Turn demand per centimeter of side cushion intrusion.
    pub steer_sensitivity: f64,

    /// Fixed turn towards the clearer side while slowing.
    pub obstacle_avoidance_bias: f64,

    /// Largest turn demand in either direction.
    pub max_turn: f64,

    pub escape: EscapeParams,
}

/// Timings and speeds of the escape manoeuvre.
#[derive(Debug, Clone, Deserialize)]
pub struct EscapeParams {
    /// Units: seconds
    pub pause_s: f64,

    /// Reverse demand, as a positive magnitude.
    pub reverse_speed: f64,

    /// Units: seconds
    pub reverse_duration_s: f64,

    /// Units: seconds
    pub settle_s: f64,

    /// Units: seconds
    pub pivot_duration_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SteerCtrlParams {
    fn default() -> Self {
        Self {
            default_speed: 0.55,
            min_approach_speed: 0.25,
            slowdown_dist_cm: 55.0,
            stopping_dist_cm: 25.0,
            critical_dist_cm: 15.0,
            side_cushion_dist_cm: 35.0,
            steer_sensitivity: 0.005,
            obstacle_avoidance_bias: 0.10,
            max_turn: 0.25,
            escape: EscapeParams::default(),
        }
    }
}

impl Default for EscapeParams {
    fn default() -> Self {
        Self {
            pause_s: 0.2,
            reverse_speed: 0.3,
            reverse_duration_s: 0.5,
            settle_s: 0.1,
            pivot_duration_s: 0.4,
        }
    }
}

impl EscapeParams {
    /// All pauses zeroed, for running the manoeuvre without waiting.
    pub fn instant(&self) -> Self {
        Self {
            pause_s: 0.0,
            reverse_duration_s: 0.0,
            settle_s: 0.0,
            pivot_duration_s: 0.0,
            ..self.clone()
        }
    }
}

impl SteerCtrlParams {
    /// Check thresholds and speeds are consistent.
    pub fn are_valid(&self) -> Result<(), SteerCtrlError> {
        let err = |m: String| Err(SteerCtrlError::InvalidParams(m));

        if !(self.critical_dist_cm <= self.stopping_dist_cm
            && self.stopping_dist_cm < self.slowdown_dist_cm)
        {
            return err(format!(
                "expected critical ({}) <= stopping ({}) < slowdown ({})",
                self.critical_dist_cm, self.stopping_dist_cm, self.slowdown_dist_cm
            ));
        }
        if !(self.critical_dist_cm >= 0.0) {
            return err(format!(
                "critical_dist_cm must not be negative, found {}",
                self.critical_dist_cm
            ));
        }
        if !(self.default_speed > 0.0 && self.default_speed <= 1.0) {
            return err(format!(
                "default_speed must be in (0, 1], found {}",
                self.default_speed
            ));
        }
        if !(self.min_approach_speed >= 0.0 && self.min_approach_speed <= self.default_speed) {
            return err(format!(
                "min_approach_speed must be in [0, default_speed], found {}",
                self.min_approach_speed
            ));
        }
        if !(self.side_cushion_dist_cm >= 0.0) {
            return err(format!(
                "side_cushion_dist_cm must not be negative, found {}",
                self.side_cushion_dist_cm
            ));
        }
        if !(self.steer_sensitivity >= 0.0
            && self.obstacle_avoidance_bias >= 0.0
            && self.max_turn >= 0.0)
        {
            return err("steering gains and max_turn must not be negative".into());
        }

        let e = &self.escape;
        if !(e.reverse_speed > 0.0 && e.reverse_speed <= 1.0) {
            return err(format!(
                "escape reverse_speed must be in (0, 1], found {}",
                e.reverse_speed
            ));
        }
        let durations = [e.pause_s, e.reverse_duration_s, e.settle_s, e.pivot_duration_s];
        if !durations.iter().all(|d| *d >= 0.0) {
            return err(format!("escape durations must not be negative, found {:?}", durations));
        }

        Ok(())
    }
}

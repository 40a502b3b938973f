//! Parameters structure for the motor driver

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::MotDriverError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the motor driver.
#[derive(Debug, Clone, Deserialize)]
pub struct MotDriverParams {
    // ---- STALL COMPENSATION ----
    /// Smallest signal that reliably turns the wheels. Any non-zero demand is lifted to at
    /// least this value.
    pub stall_threshold: f64,

    /// Demands with a magnitude below this are treated as zero.
    pub dead_zone: f64,

    // ---- RAMPING ----
    /// Size of each ramp increment, in normalised speed.
    pub ramp_step: f64,

    /// Delay between ramp increments.
    ///
    /// Units: seconds
    pub ramp_step_delay_s: f64,

    /// Signal used on both wheels during tank turns.
    pub turn_speed: f64,

    // ---- TRIM ----
    /// Gain applied to left wheel demands to correct drift.
    pub left_trim: f64,

    /// Gain applied to right wheel demands to correct drift.
    pub right_trim: f64,

    // ---- HARDWARE ----
    /// PWM frequency of the speed pins.
    ///
    /// Units: hertz
    pub pwm_frequency_hz: f64,

    pub pins: GpioPins,
}

/// BCM pin numbers of the H-bridge connections.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GpioPins {
    pub stby: u8,
    pub pwm_a: u8,
    pub ain1: u8,
    pub ain2: u8,
    pub pwm_b: u8,
    pub bin1: u8,
    pub bin2: u8,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for MotDriverParams {
    fn default() -> Self {
        Self {
            stall_threshold: 0.25,
            dead_zone: 0.05,
            ramp_step: 0.05,
            ramp_step_delay_s: 0.02,
            turn_speed: 0.6,
            left_trim: 1.0,
            right_trim: 1.0,
            pwm_frequency_hz: 100.0,
            pins: GpioPins::default(),
        }
    }
}

impl Default for GpioPins {
    fn default() -> Self {
        Self {
            stby: 26,
            pwm_a: 17,
            ain1: 6,
            ain2: 5,
            pwm_b: 27,
            bin1: 24,
            bin2: 23,
        }
    }
}

impl MotDriverParams {
    pub fn are_valid(&self) -> Result<(), MotDriverError> {
        let err = |m: String| Err(MotDriverError::InvalidParams(m));

        if !(self.stall_threshold >= 0.0 && self.stall_threshold < 1.0) {
            return err(format!(
                "stall_threshold must be in [0, 1), found {}",
                self.stall_threshold
            ));
        }
        if !(self.dead_zone >= 0.0 && self.dead_zone < 1.0) {
            return err(format!("dead_zone must be in [0, 1), found {}", self.dead_zone));
        }
        if !(self.ramp_step > 0.0 && self.ramp_step <= 1.0) {
            return err(format!("ramp_step must be in (0, 1], found {}", self.ramp_step));
        }
        if !(self.ramp_step_delay_s >= 0.0) {
            return err(format!(
                "ramp_step_delay_s must not be negative, found {}",
                self.ramp_step_delay_s
            ));
        }
        if !(self.turn_speed > 0.0 && self.turn_speed <= 1.0) {
            return err(format!("turn_speed must be in (0, 1], found {}", self.turn_speed));
        }
        if !(self.left_trim >= 0.0 && self.right_trim >= 0.0) {
            return err(format!(
                "wheel trims must not be negative, found {} and {}",
                self.left_trim, self.right_trim
            ));
        }
        if !(self.pwm_frequency_hz > 0.0) {
            return err(format!(
                "pwm_frequency_hz must be positive, found {}",
                self.pwm_frequency_hz
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_params_validation() {
        assert!(MotDriverParams::default().are_valid().is_ok());

        let mut p = MotDriverParams::default();
        p.stall_threshold = 1.0;
        assert!(p.are_valid().is_err());

        let mut p = MotDriverParams::default();
        p.ramp_step = 0.0;
        assert!(p.are_valid().is_err());

        let mut p = MotDriverParams::default();
        p.ramp_step_delay_s = std::f64::NAN;
        assert!(p.are_valid().is_err());
    }
}

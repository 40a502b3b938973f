//! Implementations for the MotDriver state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace, warn};

// Internal
use super::{MotDriverError, MotDriverParams, MotionCommand, MotorHal, Wheel, WheelSignals};
use util::{maths::clamp, time::sleep_s};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Motor driver state.
pub struct MotDriver<H: MotorHal> {
    params: MotDriverParams,
    hal: H,

    /// Signal both wheels were last ramped to. Only ramped moves and tank turns touch this.
    ramp_speed: f64,

    /// Signals currently on the pins.
    applied: WheelSignals,

    shut_down: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<H: MotorHal> MotDriver<H> {
    /// Enable the H-bridge and zero both channels.
    pub fn new(params: MotDriverParams, hal: H) -> Result<Self, MotDriverError> {
        params.are_valid()?;

        let mut driver = Self {
            params,
            hal,
            ramp_speed: 0.0,
            applied: WheelSignals::default(),
            shut_down: false,
        };

        driver.hal.set_standby(true)?;
        driver.apply(0.0, 0.0)?;

        debug!("Motor driver enabled");

        Ok(driver)
    }

    /// Map a normalised demand onto the motor's usable signal range.
    ///
    /// The demand is clamped to `[-1, 1]`. Magnitudes below the dead zone give zero, anything
    /// else is lifted above the stall threshold, keeping its sign.
    pub fn remap(&self, demand: f64) -> f64 {
        if demand.is_nan() {
            return 0.0;
        }

        let v = clamp(demand, -1.0, 1.0);
        if v.abs() < self.params.dead_zone {
            return 0.0;
        }

        let stall = self.params.stall_threshold;
        v.signum() * (stall + v.abs() * (1.0 - stall))
    }

    /// Apply a wheel command immediately, without ramping.
    ///
    /// Wheel trims are applied before the remap.
    pub fn drive(&mut self, cmd: MotionCommand) -> Result<WheelSignals, MotDriverError> {
        self.check_live()?;

        let left = self.remap(cmd.left * self.params.left_trim);
        let right = self.remap(cmd.right * self.params.right_trim);
        self.apply(left, right)?;

        Ok(self.applied)
    }

    /// Ramp both wheels to the same speed.
    ///
    /// Blocks for one ramp delay per ramp step between the current and target signals.
    pub fn set_speed(&mut self, speed: f64) -> Result<(), MotDriverError> {
        self.check_live()?;

        let target = self.remap(speed);
        let step = self.params.ramp_step;

        while (self.ramp_speed - target).abs() > step {
            self.ramp_speed += step * (target - self.ramp_speed).signum();
            self.apply(self.ramp_speed, self.ramp_speed)?;
            sleep_s(self.params.ramp_step_delay_s);
        }

        // Land exactly on the target
        self.ramp_speed = target;
        self.apply(target, target)?;

        trace!("Ramped to {:.3}", target);

        Ok(())
    }

    /// Ramp both wheels to a straight-line speed. Negative is backwards.
    pub fn move_straight(&mut self, speed: f64) -> Result<(), MotDriverError> {
        self.set_speed(speed)
    }

    /// Stop both wheels.
    ///
    /// With `force` the signals are zeroed immediately, otherwise speed is ramped down. Does
    /// nothing once the driver has been shut down.
    pub fn stop(&mut self, force: bool) -> Result<(), MotDriverError> {
        if self.shut_down {
            return Ok(());
        }

        if force {
            self.ramp_speed = 0.0;
            self.apply(0.0, 0.0)
        } else {
            self.set_speed(0.0)
        }
    }

    /// Tank turn on the spot towards the left.
    pub fn turn_left(&mut self) -> Result<(), MotDriverError> {
        let s = self.params.turn_speed;
        self.tank_turn(-s, s)
    }

    /// Tank turn on the spot towards the right.
    pub fn turn_right(&mut self) -> Result<(), MotDriverError> {
        let s = self.params.turn_speed;
        self.tank_turn(s, -s)
    }

    /// Ramp to a stop and disable the H-bridge.
    ///
    /// Safe to call more than once.
    pub fn cleanup(&mut self) -> Result<(), MotDriverError> {
        if self.shut_down {
            return Ok(());
        }

        let ramp_result = self.set_speed(0.0);

        // Whatever happened during the ramp, leave the pins zeroed and the bridge disabled
        let zero_result = self.apply(0.0, 0.0);
        let stby_result = self.hal.set_standby(false);
        self.ramp_speed = 0.0;
        self.shut_down = true;

        debug!("Motor driver shut down");

        ramp_result?;
        zero_result?;
        stby_result?;

        Ok(())
    }

    /// Signals currently on the pins.
    pub fn applied(&self) -> WheelSignals {
        self.applied
    }

    /// Signal the last ramped move reached.
    pub fn ramp_speed(&self) -> f64 {
        self.ramp_speed
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn params(&self) -> &MotDriverParams {
        &self.params
    }

    pub fn hal(&self) -> &H {
        &self.hal
    }

    fn tank_turn(&mut self, left: f64, right: f64) -> Result<(), MotDriverError> {
        self.check_live()?;

        // Ramped moves assume both wheels share a speed, which no longer holds
        self.ramp_speed = 0.0;
        self.apply(left, right)
    }

    fn check_live(&self) -> Result<(), MotDriverError> {
        if self.shut_down {
            Err(MotDriverError::ShutDown)
        } else {
            Ok(())
        }
    }

    /// Write signed signals to both channels.
    fn apply(&mut self, left: f64, right: f64) -> Result<(), MotDriverError> {
        let left = clamp(left, -1.0, 1.0);
        let right = clamp(right, -1.0, 1.0);

        self.set_channel(Wheel::Left, left)?;
        self.set_channel(Wheel::Right, right)?;

        self.applied = WheelSignals { left, right };

        Ok(())
    }

    fn set_channel(&mut self, wheel: Wheel, signal: f64) -> Result<(), MotDriverError> {
        if signal > 0.0 {
            self.hal.set_direction(wheel, true, false)?;
            self.hal.set_duty_cycle(wheel, signal)?;
        } else if signal < 0.0 {
            self.hal.set_direction(wheel, false, true)?;
            self.hal.set_duty_cycle(wheel, -signal)?;
        } else {
            self.hal.set_direction(wheel, false, false)?;
            self.hal.set_duty_cycle(wheel, 0.0)?;
        }

        Ok(())
    }
}

impl<H: MotorHal> Drop for MotDriver<H> {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            warn!("Motor driver cleanup on drop failed: {}", e);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mot_driver::SimHal;

    fn fast_params() -> MotDriverParams {
        let mut p = MotDriverParams::default();
        p.ramp_step_delay_s = 0.0;
        p
    }

    fn driver() -> (MotDriver<SimHal>, SimHal) {
        let hal = SimHal::new();
        let d = MotDriver::new(fast_params(), hal.clone()).unwrap();
        (d, hal)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_remap() {
        let (d, _) = driver();

        assert_eq!(d.remap(0.0), 0.0);
        assert_eq!(d.remap(0.049), 0.0);
        assert_eq!(d.remap(-0.049), 0.0);
        assert!(approx(d.remap(0.05), 0.25 + 0.05 * 0.75));
        assert!(approx(d.remap(0.5), 0.625));
        assert!(approx(d.remap(-0.5), -0.625));
        assert!(approx(d.remap(1.0), 1.0));
        assert!(approx(d.remap(3.0), 1.0));
        assert!(approx(d.remap(-3.0), -1.0));
        assert_eq!(d.remap(std::f64::NAN), 0.0);
    }

    #[test]
    fn test_drive_sets_pins() {
        let (mut d, hal) = driver();

        let s = d.drive(MotionCommand::new(0.6, -0.6)).unwrap();
        assert!(approx(s.left, 0.7));
        assert!(approx(s.right, -0.7));

        let state = hal.state();
        assert!(state.standby_enabled);
        assert!(state.left.in1 && !state.left.in2);
        assert!(!state.right.in1 && state.right.in2);
        assert!(approx(state.right.duty, 0.7));

        // Drive doesn't touch the ramp
        assert_eq!(d.ramp_speed(), 0.0);

        d.drive(MotionCommand::stop()).unwrap();
        let state = hal.state();
        assert_eq!((state.left.in1, state.left.in2, state.left.duty), (false, false, 0.0));
    }

    #[test]
    fn test_drive_applies_trim() {
        let hal = SimHal::new();
        let mut p = fast_params();
        p.left_trim = 0.5;
        let mut d = MotDriver::new(p, hal).unwrap();

        let s = d.drive(MotionCommand::straight(0.8)).unwrap();
        assert!(approx(s.left, 0.25 + 0.4 * 0.75));
        assert!(approx(s.right, 0.25 + 0.8 * 0.75));
    }

    #[test]
    fn test_ramp_is_monotonic_and_lands_on_target() {
        let (mut d, hal) = driver();

        d.set_speed(0.5).unwrap();
        assert!(approx(d.ramp_speed(), 0.625));

        let history = hal.state().wheel_history(Wheel::Left);
        // Initial zero, then the ramp
        let ramp = &history[1..];
        for pair in ramp.windows(2) {
            assert!(pair[1] >= pair[0]);
            assert!(pair[1] - pair[0] <= 0.05 + 1e-9);
        }
        assert!(approx(*ramp.last().unwrap(), 0.625));

        // Ramp down stops exactly at zero
        d.stop(false).unwrap();
        assert_eq!(d.applied(), WheelSignals::default());
    }

    #[test]
    fn test_force_stop_is_immediate() {
        let (mut d, hal) = driver();

        d.move_straight(1.0).unwrap();
        let before = hal.state().history.len();

        d.stop(true).unwrap();
        assert_eq!(hal.state().history.len(), before + 2);
        assert!(d.applied().is_stopped());
        assert_eq!(d.ramp_speed(), 0.0);
    }

    #[test]
    fn test_turns_bypass_remap() {
        let (mut d, _) = driver();

        d.move_straight(0.4).unwrap();
        d.turn_left().unwrap();
        assert_eq!(d.applied(), WheelSignals { left: -0.6, right: 0.6 });
        assert_eq!(d.ramp_speed(), 0.0);

        d.turn_right().unwrap();
        assert_eq!(d.applied(), WheelSignals { left: 0.6, right: -0.6 });
    }

    #[test]
    fn test_cleanup_idempotent() {
        let (mut d, hal) = driver();

        d.move_straight(0.8).unwrap();
        d.cleanup().unwrap();
        d.cleanup().unwrap();
        d.stop(false).unwrap();
        d.stop(true).unwrap();

        let state = hal.state();
        assert!(!state.standby_enabled);
        assert_eq!(state.left.signed(), 0.0);
        assert_eq!(state.right.signed(), 0.0);

        assert!(matches!(
            d.drive(MotionCommand::straight(0.5)),
            Err(MotDriverError::ShutDown)
        ));
    }

    #[test]
    fn test_drop_disables_bridge() {
        let hal = SimHal::new();
        {
            let mut d = MotDriver::new(fast_params(), hal.clone()).unwrap();
            d.drive(MotionCommand::straight(0.5)).unwrap();
        }
        assert!(!hal.state().standby_enabled);
    }
}

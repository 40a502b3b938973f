//! Motor hardware abstraction

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Low level access to the H-bridge.
pub trait MotorHal {
    /// Set the PWM duty cycle of a wheel's channel.
    ///
    /// `duty` must be between 0.0 and 1.0, other values are rejected.
    fn set_duty_cycle(&mut self, wheel: Wheel, duty: f64) -> Result<(), HalError>;

    /// Set the two direction inputs of a wheel's channel.
    fn set_direction(&mut self, wheel: Wheel, in1: bool, in2: bool) -> Result<(), HalError>;

    /// Enable (true) or disable the driver via its standby pin.
    fn set_standby(&mut self, enabled: bool) -> Result<(), HalError>;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Wheel {
    Left,
    Right,
}

#[derive(Debug, thiserror::Error)]
pub enum HalError {
    #[error("Duty cycle must be between 0.0 and 1.0, found {0}")]
    InvalidDutyCycle(f64),

    #[error("GPIO error: {0}")]
    Gpio(String),
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Simulated motor hardware.
///
/// Clones share their state, so a handle kept outside the driver sees every write.
#[derive(Debug, Clone, Default)]
pub struct SimHal {
    state: Arc<Mutex<SimHalState>>,
}

/// Pin level state of the simulated H-bridge.
#[derive(Debug, Clone, Default)]
pub struct SimHalState {
    pub standby_enabled: bool,
    pub left: SimChannel,
    pub right: SimChannel,

    /// Every signed signal written, in order.
    pub history: Vec<(Wheel, f64)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimChannel {
    pub duty: f64,
    pub in1: bool,
    pub in2: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T: MotorHal + ?Sized> MotorHal for Box<T> {
    fn set_duty_cycle(&mut self, wheel: Wheel, duty: f64) -> Result<(), HalError> {
        (**self).set_duty_cycle(wheel, duty)
    }

    fn set_direction(&mut self, wheel: Wheel, in1: bool, in2: bool) -> Result<(), HalError> {
        (**self).set_direction(wheel, in1, in2)
    }

    fn set_standby(&mut self, enabled: bool) -> Result<(), HalError> {
        (**self).set_standby(enabled)
    }
}

impl SimChannel {
    /// The signed signal the pins currently represent.
    pub fn signed(&self) -> f64 {
        match (self.in1, self.in2) {
            (true, false) => self.duty,
            (false, true) => -self.duty,
            _ => 0.0,
        }
    }
}

impl SimHalState {
    pub fn channel(&self, wheel: Wheel) -> &SimChannel {
        match wheel {
            Wheel::Left => &self.left,
            Wheel::Right => &self.right,
        }
    }

    fn channel_mut(&mut self, wheel: Wheel) -> &mut SimChannel {
        match wheel {
            Wheel::Left => &mut self.left,
            Wheel::Right => &mut self.right,
        }
    }

    /// Signed signals written to one wheel, in order.
    pub fn wheel_history(&self, wheel: Wheel) -> Vec<f64> {
        self.history
            .iter()
            .filter(|(w, _)| *w == wheel)
            .map(|(_, s)| *s)
            .collect()
    }
}

impl SimHal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current simulated state.
    pub fn state(&self) -> SimHalState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, SimHalState> {
        match self.state.lock() {
            Ok(s) => s,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl MotorHal for SimHal {
    fn set_duty_cycle(&mut self, wheel: Wheel, duty: f64) -> Result<(), HalError> {
        if !(0.0..=1.0).contains(&duty) {
            return Err(HalError::InvalidDutyCycle(duty));
        }

        let mut state = self.lock();
        let channel = state.channel_mut(wheel);
        channel.duty = duty;
        let signed = channel.signed();
        state.history.push((wheel, signed));

        Ok(())
    }

    fn set_direction(&mut self, wheel: Wheel, in1: bool, in2: bool) -> Result<(), HalError> {
        let mut state = self.lock();
        let channel = state.channel_mut(wheel);
        channel.in1 = in1;
        channel.in2 = in2;

        Ok(())
    }

    fn set_standby(&mut self, enabled: bool) -> Result<(), HalError> {
        self.lock().standby_enabled = enabled;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sim_rejects_bad_duty() {
        let mut hal = SimHal::new();

        assert!(matches!(
            hal.set_duty_cycle(Wheel::Left, 1.5),
            Err(HalError::InvalidDutyCycle(_))
        ));
        assert!(hal.set_duty_cycle(Wheel::Left, std::f64::NAN).is_err());
        assert!(hal.set_duty_cycle(Wheel::Left, 1.0).is_ok());
    }

    #[test]
    fn test_sim_signed_signal() {
        let mut hal = SimHal::new();
        let observer = hal.clone();

        hal.set_direction(Wheel::Right, false, true).unwrap();
        hal.set_duty_cycle(Wheel::Right, 0.4).unwrap();

        let s = observer.state();
        assert_eq!(s.right.signed(), -0.4);
        assert_eq!(s.left.signed(), 0.0);
        assert_eq!(s.wheel_history(Wheel::Right), vec![-0.4]);
    }
}

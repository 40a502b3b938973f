//! # Rover
//!
//! One control tick: sector snapshot in, steering decision, actuation, event out.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use crate::{
    event_log::{Action, Event, EventSink},
    lidar::SectorState,
    mot_driver::{MotDriver, MotDriverError, MotorHal, WheelSignals},
    steer_ctrl::{ControllerPhase, EscapeReport, StatusReport, SteerCtrl, SteerCtrlError, SteerDemand},
};
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The controller, the motors it drives and the sink it reports to.
pub struct Rover<H: MotorHal, S: EventSink> {
    steer_ctrl: SteerCtrl,
    mot_driver: MotDriver<H>,
    sink: S,
}

/// Outcome of a single control tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CycleReport {
    pub steer: StatusReport,

    /// Signals on the motors at the end of the tick.
    pub applied: WheelSignals,

    /// Set if the tick ran the escape manoeuvre.
    pub escape: Option<EscapeReport>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RoverError {
    #[error(transparent)]
    SteerCtrl(#[from] SteerCtrlError),

    #[error(transparent)]
    MotDriver(#[from] MotDriverError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<H: MotorHal, S: EventSink> Rover<H, S> {
    pub fn new(steer_ctrl: SteerCtrl, mot_driver: MotDriver<H>, sink: S) -> Self {
        Self {
            steer_ctrl,
            mot_driver,
            sink,
        }
    }

    /// Run one control tick against a sector snapshot.
    ///
    /// Blocks for the escape manoeuvre if the front is inside the critical distance.
    pub fn step(&mut self, sectors: &SectorState) -> Result<CycleReport, RoverError> {
        let (demand, steer) = self.steer_ctrl.proc(sectors)?;

        let escape = match demand {
            SteerDemand::Drive(cmd) => {
                self.mot_driver.drive(cmd)?;

                let action = match steer.phase {
                    ControllerPhase::Slowing => Action::Slow,
                    _ => Action::Drive,
                };
                self.sink.record(Event::drive(action, *sectors, &cmd));

                None
            }
            SteerDemand::Escape(pivot) => Some(self.steer_ctrl.run_escape(
                pivot,
                sectors,
                &mut self.mot_driver,
                &mut self.sink,
            )?),
        };

        Ok(CycleReport {
            steer,
            applied: self.mot_driver.applied(),
            escape,
        })
    }

    /// Record an event outside of the normal tick, such as start up or shut down.
    pub fn record(&mut self, event: Event) {
        self.sink.record(event);
    }

    /// Ramp the motors to a stop and disable them. Safe to call more than once.
    pub fn shutdown_actuation(&mut self) -> Result<(), RoverError> {
        self.mot_driver.cleanup()?;
        Ok(())
    }

    /// Flush and close the event sink.
    pub fn shutdown_events(&mut self) {
        self.sink.shutdown();
    }

    pub fn steer_ctrl(&self) -> &SteerCtrl {
        &self.steer_ctrl
    }

    pub fn mot_driver(&self) -> &MotDriver<H> {
        &self.mot_driver
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        event_log::EventBuffer,
        mot_driver::{MotDriverParams, SimHal},
        steer_ctrl::SteerCtrlParams,
    };

    fn rover() -> Rover<SimHal, EventBuffer> {
        let mut steer_params = SteerCtrlParams::default();
        steer_params.escape = steer_params.escape.instant();

        let mut mot_params = MotDriverParams::default();
        mot_params.ramp_step_delay_s = 0.0;

        Rover::new(
            SteerCtrl::init(steer_params).unwrap(),
            MotDriver::new(mot_params, SimHal::new()).unwrap(),
            EventBuffer::new(),
        )
    }

    fn sectors(front_cm: f64) -> SectorState {
        SectorState {
            front_cm,
            left_cm: 999.0,
            right_cm: 999.0,
        }
    }

    #[test]
    fn test_tick_records_one_event() {
        let mut r = rover();

        let report = r.step(&sectors(200.0)).unwrap();
        assert_eq!(report.steer.phase, ControllerPhase::Cruising);
        assert!(report.escape.is_none());
        assert!((report.applied.left - (0.25 + 0.55 * 0.75)).abs() < 1e-9);

        let report = r.step(&sectors(40.0)).unwrap();
        assert_eq!(report.steer.phase, ControllerPhase::Slowing);

        assert_eq!(r.sink().actions(), vec![Action::Drive, Action::Slow]);
        assert_eq!(r.sink().events[0].notes, "L=0.55 R=0.55");
    }

    #[test]
    fn test_critical_tick_escapes() {
        let mut r = rover();

        let report = r.step(&sectors(5.0)).unwrap();
        assert_eq!(report.steer.phase, ControllerPhase::CriticalEscape);
        assert_eq!(report.escape.map(|e| e.pivot), Some(crate::steer_ctrl::PivotDir::Right));
        assert!(report.applied.is_stopped());
        assert_eq!(r.sink().actions().last(), Some(&Action::EscapeDone));
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let mut r = rover();

        r.step(&sectors(200.0)).unwrap();
        r.shutdown_actuation().unwrap();
        r.shutdown_actuation().unwrap();
        r.shutdown_events();

        assert!(r.mot_driver().is_shut_down());
        assert!(r.sink().shut_down);
        assert!(r.step(&sectors(200.0)).is_err());
    }
}

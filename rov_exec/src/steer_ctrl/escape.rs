//! Critical obstacle escape manoeuvre

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, warn};
use serde::Serialize;
use std::time::Instant;

use super::{ControllerPhase, PivotDir, SteerCtrl, SteerCtrlError};
use crate::{
    event_log::{Action, Event, EventSink},
    lidar::SectorState,
    mot_driver::{MotDriver, MotionCommand, MotorHal},
};
use util::time::sleep_s;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Summary of a completed escape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EscapeReport {
    pub pivot: PivotDir,

    /// Wall time spent in the manoeuvre.
    ///
    /// Units: seconds
    pub duration_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SteerCtrl {
    /// Run the escape manoeuvre to completion.
    ///
    /// Blocks for the whole sequence: stop, pause, reverse, stop, settle, pivot, stop. Each
    /// milestone is recorded to the sink against the sector distances which triggered the
    /// escape. If the motors fail part way through a forced stop is attempted before the error
    /// is returned.
    pub fn run_escape<H, S>(
        &mut self,
        pivot: PivotDir,
        sectors: &SectorState,
        mot: &mut MotDriver<H>,
        sink: &mut S,
    ) -> Result<EscapeReport, SteerCtrlError>
    where
        H: MotorHal,
        S: EventSink + ?Sized,
    {
        warn!(
            "Critical obstacle at {:.1} cm, escaping towards the {:?}",
            sectors.front_cm, pivot
        );

        let start = Instant::now();

        if let Err(e) = self.escape_sequence(pivot, sectors, mot, sink) {
            if let Err(stop_err) = mot.stop(true) {
                warn!("Could not stop motors after failed escape: {}", stop_err);
            }
            return Err(e);
        }

        let duration_s = start.elapsed().as_secs_f64();
        sink.record(Event::new(
            Action::EscapeDone,
            *sectors,
            format!("{:.2}s", duration_s),
        ));

        info!("Escape complete in {:.2} s", duration_s);

        Ok(EscapeReport { pivot, duration_s })
    }

    fn escape_sequence<H, S>(
        &mut self,
        pivot: PivotDir,
        sectors: &SectorState,
        mot: &mut MotDriver<H>,
        sink: &mut S,
    ) -> Result<(), SteerCtrlError>
    where
        H: MotorHal,
        S: EventSink + ?Sized,
    {
        let esc = self.params.escape.clone();

        self.set_phase(ControllerPhase::CriticalEscape);

        // Stop dead
        mot.stop(true)?;
        sink.record(Event::new(
            Action::EscapeStop,
            *sectors,
            format!("front={:.1}cm", sectors.front_cm),
        ));
        sleep_s(esc.pause_s);

        // Back away
        let reverse = MotionCommand::straight(-esc.reverse_speed);
        mot.drive(reverse)?;
        sink.record(Event::drive(Action::Backward, *sectors, &reverse));
        sleep_s(esc.reverse_duration_s);

        mot.stop(false)?;
        sleep_s(esc.settle_s);

        // Turn towards the clearer side
        self.set_phase(ControllerPhase::Pivoting);
        let action = match pivot {
            PivotDir::Left => {
                mot.turn_left()?;
                Action::PivotLeft
            }
            PivotDir::Right => {
                mot.turn_right()?;
                Action::PivotRight
            }
        };
        let applied = mot.applied();
        sink.record(Event::drive(
            action,
            *sectors,
            &MotionCommand::new(applied.left, applied.right),
        ));
        sleep_s(esc.pivot_duration_s);

        mot.stop(false)?;

        Ok(())
    }
}

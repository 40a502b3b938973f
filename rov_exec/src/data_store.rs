//! # Data Store

use crate::{rover::CycleReport, steer_ctrl::ControllerPhase};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    /// Session elapsed time at the start of the cycle
    pub elapsed_s: f64,

    // Control
    /// Phase of the most recent control tick
    pub phase: Option<ControllerPhase>,

    /// Number of escape manoeuvres run
    pub num_escapes: u64,

    /// Set if the current cycle ran an escape, so its overrun is expected
    pub escaped_this_cycle: bool,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,

    /// Total number of cycle overruns, escapes excluded
    pub num_cycle_overruns: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle, and sets the 1Hz cycle flag.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64) {
        let cycles_per_second = (cycle_frequency_hz as u128).max(1);
        self.is_1_hz_cycle = self.num_cycles % cycles_per_second == 0;

        self.escaped_this_cycle = false;

        self.elapsed_s = util::session::get_elapsed_seconds();
    }

    /// Store the result of this cycle's control tick.
    pub fn store_report(&mut self, report: CycleReport) {
        self.phase = Some(report.steer.phase);
        if report.escape.is_some() {
            self.num_escapes += 1;
            self.escaped_this_cycle = true;
        }
    }

    /// Perform actions required at the end of a cycle.
    ///
    /// `overran` is true if the cycle took longer than its period. Overruns caused by an escape
    /// are expected and not counted.
    pub fn cycle_end(&mut self, overran: bool) {
        if overran && !self.escaped_this_cycle {
            self.num_consec_cycle_overruns += 1;
            self.num_cycle_overruns += 1;
        } else {
            self.num_consec_cycle_overruns = 0;
        }

        self.num_cycles += 1;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        mot_driver::WheelSignals,
        steer_ctrl::{EscapeReport, PivotDir, StatusReport},
    };

    fn report(escape: bool) -> CycleReport {
        CycleReport {
            steer: StatusReport {
                phase: ControllerPhase::CriticalEscape,
                phase_changed: true,
                base_speed: 0.0,
                turn: 0.0,
                turn_limited: false,
            },
            applied: WheelSignals::default(),
            escape: if escape {
                Some(EscapeReport {
                    pivot: PivotDir::Left,
                    duration_s: 1.2,
                })
            } else {
                None
            },
        }
    }

    #[test]
    fn test_overruns_skip_escapes() {
        let mut ds = DataStore::default();

        ds.cycle_start(62.5);
        assert!(ds.is_1_hz_cycle);
        ds.store_report(report(true));
        ds.cycle_end(true);
        assert_eq!(ds.num_cycle_overruns, 0);
        assert_eq!(ds.num_escapes, 1);

        ds.cycle_start(62.5);
        assert!(!ds.is_1_hz_cycle);
        ds.store_report(report(false));
        ds.cycle_end(true);
        ds.cycle_start(62.5);
        ds.cycle_end(true);
        assert_eq!(ds.num_consec_cycle_overruns, 2);

        ds.cycle_start(62.5);
        ds.cycle_end(false);
        assert_eq!(ds.num_consec_cycle_overruns, 0);
        assert_eq!(ds.num_cycle_overruns, 2);
        assert_eq!(ds.num_cycles, 4);
        assert_eq!(ds.phase, Some(ControllerPhase::CriticalEscape));
    }
}

//! Implementations for the SteerCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use serde::Serialize;

// Internal
use super::{ControllerPhase, PivotDir, SteerCtrlError, SteerCtrlParams, SteerDemand};
use crate::{lidar::SectorState, mot_driver::MotionCommand};
use util::{
    maths::{clamp, lin_map},
    module::State,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Steering control module state
#[derive(Debug, Clone)]
pub struct SteerCtrl {
    pub(crate) params: SteerCtrlParams,

    /// Phase of the last tick, `None` before the first.
    pub(crate) phase: Option<ControllerPhase>,
}

/// Status report for SteerCtrl processing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatusReport {
    pub phase: ControllerPhase,

    /// True if the phase differs from the previous tick's.
    pub phase_changed: bool,

    pub base_speed: f64,

    pub turn: f64,

    /// True if the turn demand hit the max turn limit.
    pub turn_limited: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for SteerCtrl {
    type InitData = SteerCtrlParams;
    type InitError = SteerCtrlError;

    type InputData = SectorState;
    type OutputData = SteerDemand;
    type StatusReport = StatusReport;
    type ProcError = SteerCtrlError;

    /// Initialise the SteerCtrl module.
    fn init(init_data: Self::InitData) -> Result<Self, Self::InitError> {
        init_data.are_valid()?;

        Ok(Self {
            params: init_data,
            phase: None,
        })
    }

    /// Decide this tick's demand from the latest sector distances.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let sectors = input_data;

        let phase = self.classify_phase(sectors.front_cm);
        let phase_changed = self.set_phase(phase);

        let (turn, turn_limited) = self.calc_turn(sectors, phase);

        let (demand, base_speed) = match phase {
            ControllerPhase::CriticalEscape | ControllerPhase::Pivoting => {
                (SteerDemand::Escape(Self::pivot_dir(sectors)), 0.0)
            }
            _ => {
                let base_speed = self.calc_base_speed(sectors.front_cm);
                let cmd = MotionCommand::new(base_speed + turn, base_speed - turn);
                (SteerDemand::Drive(cmd), base_speed)
            }
        };

        trace!(
            "SteerCtrl: {:?} base {:.3} turn {:.3} -> {:?}",
            phase,
            base_speed,
            turn,
            demand
        );

        Ok((
            demand,
            StatusReport {
                phase,
                phase_changed,
                base_speed,
                turn,
                turn_limited,
            },
        ))
    }
}

impl SteerCtrl {
    pub fn params(&self) -> &SteerCtrlParams {
        &self.params
    }

    /// Phase of the most recent tick.
    pub fn phase(&self) -> Option<ControllerPhase> {
        self.phase
    }

    /// Phase implied by a front distance.
    ///
    /// Anything not at or beyond the critical distance, including NaN, is critical.
    pub fn classify_phase(&self, front_cm: f64) -> ControllerPhase {
        if !(front_cm >= self.params.critical_dist_cm) {
            ControllerPhase::CriticalEscape
        } else if front_cm < self.params.slowdown_dist_cm {
            ControllerPhase::Slowing
        } else {
            ControllerPhase::Cruising
        }
    }

    /// Forward speed for a front distance outside the critical zone.
    pub fn calc_base_speed(&self, front_cm: f64) -> f64 {
        let p = &self.params;

        if front_cm >= p.slowdown_dist_cm {
            return p.default_speed;
        }

        let proportional = lin_map(
            (p.stopping_dist_cm, p.slowdown_dist_cm),
            (0.0, p.default_speed),
            front_cm,
        );

        clamp(proportional, p.min_approach_speed, p.default_speed)
    }

    /// Turn demand, positive steering right. Also returns true if the limit was hit.
    pub fn calc_turn(&self, sectors: &SectorState, phase: ControllerPhase) -> (f64, bool) {
        let p = &self.params;
        let mut turn = 0.0;

        // Push away from a close wall on either side
        if sectors.left_cm < p.side_cushion_dist_cm {
            turn += (p.side_cushion_dist_cm - sectors.left_cm) * p.steer_sensitivity;
        }
        if sectors.right_cm < p.side_cushion_dist_cm {
            turn -= (p.side_cushion_dist_cm - sectors.right_cm) * p.steer_sensitivity;
        }

        // Start curving towards the clearer side before reaching the critical distance
        if phase == ControllerPhase::Slowing {
            if sectors.left_cm < sectors.right_cm {
                turn += p.obstacle_avoidance_bias;
            } else {
                turn -= p.obstacle_avoidance_bias;
            }
        }

        let limited = clamp(turn, -p.max_turn, p.max_turn);

        (limited, limited != turn)
    }

    /// Pivot towards whichever side has more room. Ties pivot right.
    pub fn pivot_dir(sectors: &SectorState) -> PivotDir {
        if sectors.left_cm > sectors.right_cm {
            PivotDir::Left
        } else {
            PivotDir::Right
        }
    }

    /// Record the current phase, returning true if it changed.
    pub(crate) fn set_phase(&mut self, phase: ControllerPhase) -> bool {
        let changed = self.phase != Some(phase);

        if changed {
            match self.phase {
                Some(prev) => debug!("SteerCtrl phase {} -> {}", prev, phase),
                None => debug!("SteerCtrl phase {}", phase),
            }
            self.phase = Some(phase);
        }

        changed
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ctrl() -> SteerCtrl {
        SteerCtrl::init(SteerCtrlParams::default()).unwrap()
    }

    fn sectors(front_cm: f64, left_cm: f64, right_cm: f64) -> SectorState {
        SectorState {
            front_cm,
            left_cm,
            right_cm,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_cruising_at_default_speed() {
        let mut c = ctrl();

        let (demand, report) = c.proc(&sectors(120.0, 999.0, 999.0)).unwrap();
        assert_eq!(report.phase, ControllerPhase::Cruising);
        assert!(report.phase_changed);
        assert_eq!(report.base_speed, 0.55);
        assert_eq!(demand, SteerDemand::Drive(MotionCommand::new(0.55, 0.55)));

        // Exactly on the slowdown threshold still cruises
        let (_, report) = c.proc(&sectors(55.0, 999.0, 999.0)).unwrap();
        assert_eq!(report.phase, ControllerPhase::Cruising);
        assert!(!report.phase_changed);
    }

    #[test]
    fn test_proportional_slowdown() {
        let c = ctrl();

        // Midpoint of stopping and slowdown gives half the default speed
        assert!(approx(c.calc_base_speed(40.0), 0.275));
        // Near the slowdown distance, close to default
        assert!(approx(c.calc_base_speed(54.0), 0.55 * 29.0 / 30.0));
        // Below the proportional range the minimum approach speed holds
        assert_eq!(c.calc_base_speed(26.0), 0.25);
        assert_eq!(c.calc_base_speed(20.0), 0.25);
        assert_eq!(c.calc_base_speed(15.0), 0.25);
    }

    #[test]
    fn test_phase_boundaries() {
        let c = ctrl();

        assert_eq!(c.classify_phase(999.0), ControllerPhase::Cruising);
        assert_eq!(c.classify_phase(54.9), ControllerPhase::Slowing);
        assert_eq!(c.classify_phase(15.0), ControllerPhase::Slowing);
        assert_eq!(c.classify_phase(14.9), ControllerPhase::CriticalEscape);
        assert_eq!(c.classify_phase(0.0), ControllerPhase::CriticalEscape);
        assert_eq!(c.classify_phase(std::f64::NAN), ControllerPhase::CriticalEscape);
    }

    #[test]
    fn test_side_cushion_push() {
        let c = ctrl();

        // Left wall 15 cm inside the cushion pushes right
        let (turn, limited) = c.calc_turn(&sectors(999.0, 20.0, 999.0), ControllerPhase::Cruising);
        assert!(approx(turn, 0.075));
        assert!(!limited);

        // Right wall pushes left
        let (turn, _) = c.calc_turn(&sectors(999.0, 999.0, 25.0), ControllerPhase::Cruising);
        assert!(approx(turn, -0.05));

        // Both walls balance out
        let (turn, _) = c.calc_turn(&sectors(999.0, 30.0, 30.0), ControllerPhase::Cruising);
        assert!(approx(turn, 0.0));

        // Beyond the cushion there is no push
        let (turn, _) = c.calc_turn(&sectors(999.0, 35.0, 80.0), ControllerPhase::Cruising);
        assert_eq!(turn, 0.0);
    }

    #[test]
    fn test_avoidance_bias_and_limit() {
        let mut c = ctrl();

        // Slowing with the left tighter than the right biases right
        let (demand, report) = c.proc(&sectors(40.0, 100.0, 200.0)).unwrap();
        assert_eq!(report.phase, ControllerPhase::Slowing);
        assert!(approx(report.turn, 0.10));
        match demand {
            SteerDemand::Drive(cmd) => {
                assert!(approx(cmd.left, 0.375));
                assert!(approx(cmd.right, 0.175));
            }
            d => panic!("Expected a drive demand, got {:?}", d),
        }

        // A very close left wall while slowing saturates the turn
        let (_, report) = c.proc(&sectors(40.0, 0.5, 200.0)).unwrap();
        assert!(approx(report.turn, 0.25));
        assert!(report.turn_limited);

        // Equal sides bias left
        let (turn, _) = c.calc_turn(&sectors(40.0, 999.0, 999.0), ControllerPhase::Slowing);
        assert!(approx(turn, -0.10));
    }

    #[test]
    fn test_critical_requests_escape_to_clearer_side() {
        let mut c = ctrl();

        let (demand, report) = c.proc(&sectors(10.0, 80.0, 30.0)).unwrap();
        assert_eq!(report.phase, ControllerPhase::CriticalEscape);
        assert_eq!(demand, SteerDemand::Escape(PivotDir::Left));

        let (demand, _) = c.proc(&sectors(10.0, 30.0, 80.0)).unwrap();
        assert_eq!(demand, SteerDemand::Escape(PivotDir::Right));
    }
}

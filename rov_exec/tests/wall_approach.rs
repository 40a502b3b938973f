//! End to end scenario: a wall closing in directly ahead of the rover.

mod common;

use common::{front_frame, wait_for};
use rov_lib::{
    event_log::{Action, EventBuffer},
    lidar::{LidarDriver, LidarParams, MockTransport},
    mot_driver::{MotDriver, MotDriverParams, SimHal},
    rover::Rover,
    steer_ctrl::{ControllerPhase, SteerCtrl, SteerCtrlParams},
    strategy::ObstacleStrategy,
};
use util::module::State;

#[test]
fn test_wall_closing_in() {
    // ---- SETUP ----

    let mut lidar_params = LidarParams::default();
    // Lets one clear packet lift the front estimate back out of the critical zone
    lidar_params.decay_step_cm = 60.0;

    let mut steer_params = SteerCtrlParams::default();
    steer_params.escape = steer_params.escape.instant();

    let mut mot_params = MotDriverParams::default();
    mot_params.ramp_step_delay_s = 0.0;

    let mock = MockTransport::new();
    let driver = LidarDriver::start(Box::new(mock.clone()), &lidar_params).unwrap();
    let mut strategy = ObstacleStrategy::from_lidar(driver, steer_params.critical_dist_cm);

    let hal = SimHal::new();
    let mut rover = Rover::new(
        SteerCtrl::init(steer_params).unwrap(),
        MotDriver::new(mot_params, hal.clone()).unwrap(),
        EventBuffer::new(),
    );

    // ---- APPROACH ----

    let mut phases = Vec::new();
    let mut escapes = 0;

    let mut tick = |rover: &mut Rover<SimHal, EventBuffer>, expected_front: f64| {
        assert!(
            wait_for(|| strategy.check_path().sectors.front_cm == expected_front),
            "front never reached {} cm",
            expected_front
        );

        let check = strategy.check_path();
        let report = rover.step(&check.sectors).unwrap();
        if report.escape.is_some() {
            escapes += 1;
        }
        phases.push(report.steer.phase);
        (check, report)
    };

    for d in (1..=10).rev().map(|i| i as f64 * 20.0) {
        mock.inject_read(&front_frame(d));
        let (check, _) = tick(&mut rover, d);
        assert!(check.is_safe);
    }

    // Wall at 5 cm
    mock.inject_read(&front_frame(5.0));
    let (check, report) = tick(&mut rover, 5.0);
    assert!(!check.is_safe);
    assert!(report.applied.is_stopped());

    // ---- RECOVERY ----

    // The wall is gone, the estimate relaxes by one decay step
    mock.inject_read(&front_frame(200.0));
    let (_, report) = tick(&mut rover, 65.0);
    assert_eq!(report.steer.phase, ControllerPhase::Cruising);
    assert!(report.applied.left > 0.0 && report.applied.right > 0.0);

    drop(tick);

    // ---- CHECKS ----

    let mut transitions = phases.clone();
    transitions.dedup();
    assert_eq!(
        transitions,
        vec![
            ControllerPhase::Cruising,
            ControllerPhase::Slowing,
            ControllerPhase::CriticalEscape,
            ControllerPhase::Cruising
        ]
    );
    assert_eq!(escapes, 1);

    let actions = rover.sink().actions();
    assert_eq!(actions.iter().filter(|a| **a == Action::EscapeStop).count(), 1);
    assert_eq!(actions.iter().filter(|a| **a == Action::EscapeDone).count(), 1);
    assert!(actions.contains(&Action::Slow));

    // One event per normal tick plus four escape milestones
    assert_eq!(actions.len(), phases.len() - 1 + 4);

    // Escape pivoted right (both sides unknown) and finished stopped
    assert!(actions.contains(&Action::PivotRight));
    assert!(hal.state().standby_enabled);

    strategy.stop();
    rover.shutdown_actuation().unwrap();
    assert!(!hal.state().standby_enabled);
}

//! The parameter files shipped in the repository must load and validate.

use std::path::PathBuf;

use rov_lib::{
    lidar::{LidarParams, SectorBounds},
    mot_driver::MotDriverParams,
    params::RovExecParams,
    steer_ctrl::SteerCtrlParams,
};
use util::params::load_from_path;

fn params_path(file: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("params")
        .join(file)
}

#[test]
fn test_shipped_params_valid() {
    let exec: RovExecParams = load_from_path(params_path("rov_exec.toml")).unwrap();
    exec.are_valid().unwrap();

    let lidar: LidarParams = load_from_path(params_path("lidar.toml")).unwrap();
    lidar.are_valid().unwrap();
    assert_eq!(lidar.sectors, SectorBounds::default());

    let steer: SteerCtrlParams = load_from_path(params_path("steer_ctrl.toml")).unwrap();
    steer.are_valid().unwrap();

    let mot: MotDriverParams = load_from_path(params_path("mot_driver.toml")).unwrap();
    mot.are_valid().unwrap();
    assert_eq!(mot.pins.stby, 26);
}

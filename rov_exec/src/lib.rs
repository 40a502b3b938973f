//! # Rover library.
//!
//! This library allows other crates in the workspace to access items defined inside the rover 
//! crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Global data store - cycle bookkeeping for the executable
pub mod data_store;

/// Event log - structured record of every control decision
pub mod event_log;

/// Lidar driver - decodes the lidar byte stream into sector distances
pub mod lidar;

/// Motor driver - stall compensation, ramping and the H-bridge hardware interface
pub mod mot_driver;

/// Executable parameters
pub mod params;

/// Rover - wires one control tick together
pub mod rover;

/// Steering control - safety state machine and proportional steering
pub mod steer_ctrl;

/// Obstacle sensing strategies
pub mod strategy;

//! # Steering control module
//!
//! Decides, once per control tick, how fast the rover should go and how hard it should turn,
//! based on the closest obstacle in the front, left and right sectors.
//!
//! The speed follows a small state machine on the front distance:
//!
//! - `Cruising` while the front is clear of the slowdown distance, at the default speed.
//! - `Slowing` inside the slowdown band, with speed falling linearly towards the stopping
//!   distance, never below the minimum approach speed.
//! - `CriticalEscape` inside the critical distance, which hands over to a blocking escape
//!   manoeuvre (stop, reverse, stop, pivot towards the clearer side, stop).
//!
//! Steering is a proportional push away from any side wall inside the side cushion, plus a fixed
//! bias towards the clearer side while slowing.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod escape;
mod params;
mod state;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use escape::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;
use std::fmt;

use crate::mot_driver::{MotDriverError, MotionCommand};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Phase of the controller's safety state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ControllerPhase {
    Cruising,
    Slowing,
    CriticalEscape,

    /// Turning on the spot at the end of an escape.
    Pivoting,
}

/// Direction of an on-the-spot pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PivotDir {
    Left,
    Right,
}

/// What the controller wants done this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SteerDemand {
    /// Drive the wheels with this command.
    Drive(MotionCommand),

    /// Run the escape manoeuvre, finishing with a pivot in this direction.
    Escape(PivotDir),
}

#[derive(Debug, thiserror::Error)]
pub enum SteerCtrlError {
    #[error("Invalid steering parameters: {0}")]
    InvalidParams(String),

    #[error("Motor driver error during escape: {0}")]
    MotDriver(#[from] MotDriverError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl fmt::Display for ControllerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ControllerPhase::Cruising => "Cruising",
            ControllerPhase::Slowing => "Slowing",
            ControllerPhase::CriticalEscape => "CriticalEscape",
            ControllerPhase::Pivoting => "Pivoting",
        })
    }
}

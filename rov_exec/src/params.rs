//! # Rover Executable Parameters
//!
//! This module provide parameters for the rover executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;
use std::str::FromStr;
use util::logger::LevelFilter;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RovExecParams {
    /// Target period of one control cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Directory, relative to the software root, that sessions are created in
    pub sessions_dir: String,

    /// Minimum level of log messages, one of "info", "debug" or "trace"
    pub log_level: String,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RovExecParamsError {
    #[error("Cycle period must be positive, found {0}")]
    InvalidCyclePeriod(f64),

    #[error("Unknown log level \"{0}\"")]
    InvalidLogLevel(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for RovExecParams {
    fn default() -> Self {
        Self {
            cycle_period_s: 0.016,
            sessions_dir: "sessions".into(),
            log_level: "debug".into(),
        }
    }
}

impl RovExecParams {
    pub fn are_valid(&self) -> Result<(), RovExecParamsError> {
        if !(self.cycle_period_s > 0.0 && self.cycle_period_s.is_finite()) {
            return Err(RovExecParamsError::InvalidCyclePeriod(self.cycle_period_s));
        }
        self.log_level_filter()?;
        Ok(())
    }

    /// Number of cycles per second
    pub fn cycle_frequency_hz(&self) -> f64 {
        1.0 / self.cycle_period_s
    }

    pub fn log_level_filter(&self) -> Result<LevelFilter, RovExecParamsError> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| RovExecParamsError::InvalidLogLevel(self.log_level.clone()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_exec_params() {
        let p = RovExecParams::default();
        assert!(p.are_valid().is_ok());
        assert!((p.cycle_frequency_hz() - 62.5).abs() < 1e-9);
        assert_eq!(p.log_level_filter().unwrap(), LevelFilter::Debug);

        let mut p = RovExecParams::default();
        p.log_level = "loud".into();
        assert!(matches!(p.are_valid(), Err(RovExecParamsError::InvalidLogLevel(_))));

        let mut p = RovExecParams::default();
        p.cycle_period_s = 0.0;
        assert!(p.are_valid().is_err());
    }
}

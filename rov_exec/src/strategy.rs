//! # Obstacle sensing strategies
//!
//! The executive asks a strategy whether the path ahead is clear. Only the lidar strategy is
//! available, the camera and fusion modes are recognised so they can be rejected before any
//! hardware is touched.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::info;
use std::fmt;
use std::str::FromStr;

use crate::lidar::{LidarDriver, LidarError, LidarParams, SectorState};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Sensing mode selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyMode {
    Lidar,
    Camera,
    Fusion,
}

/// A running obstacle sensing strategy.
pub enum ObstacleStrategy {
    Lidar(LidarStrategy),
}

#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error("Unknown strategy mode \"{0}\", expected one of lidar, camera, fusion")]
    UnknownMode(String),

    #[error("The {0} strategy is not supported")]
    Unsupported(StrategyMode),

    #[error(transparent)]
    Lidar(#[from] LidarError),
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Result of checking the path ahead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathCheck {
    /// True if nothing is inside the critical distance ahead.
    pub is_safe: bool,

    pub sectors: SectorState,
}

/// Lidar-only obstacle sensing.
pub struct LidarStrategy {
    driver: LidarDriver,
    critical_dist_cm: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl StrategyMode {
    pub const ALL: [&'static str; 3] = ["lidar", "camera", "fusion"];

    /// Fail unless this mode has an implementation.
    pub fn ensure_supported(self) -> Result<(), StrategyError> {
        match self {
            StrategyMode::Lidar => Ok(()),
            m => Err(StrategyError::Unsupported(m)),
        }
    }
}

impl FromStr for StrategyMode {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lidar" => Ok(StrategyMode::Lidar),
            "camera" => Ok(StrategyMode::Camera),
            "fusion" => Ok(StrategyMode::Fusion),
            _ => Err(StrategyError::UnknownMode(s.to_string())),
        }
    }
}

impl fmt::Display for StrategyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StrategyMode::Lidar => "lidar",
            StrategyMode::Camera => "camera",
            StrategyMode::Fusion => "fusion",
        })
    }
}

impl ObstacleStrategy {
    /// Start the strategy for a mode, opening its sensors.
    pub fn open(
        mode: StrategyMode,
        lidar_params: &LidarParams,
        critical_dist_cm: f64,
    ) -> Result<Self, StrategyError> {
        mode.ensure_supported()?;

        match mode {
            StrategyMode::Lidar => Ok(Self::from_lidar(
                LidarDriver::open(lidar_params)?,
                critical_dist_cm,
            )),
            m => Err(StrategyError::Unsupported(m)),
        }
    }

    /// Wrap an already started lidar driver.
    pub fn from_lidar(driver: LidarDriver, critical_dist_cm: f64) -> Self {
        ObstacleStrategy::Lidar(LidarStrategy {
            driver,
            critical_dist_cm,
        })
    }

    pub fn mode(&self) -> StrategyMode {
        match self {
            ObstacleStrategy::Lidar(_) => StrategyMode::Lidar,
        }
    }

    /// Check the path ahead using the latest sensor data.
    pub fn check_path(&self) -> PathCheck {
        match self {
            ObstacleStrategy::Lidar(l) => {
                let sectors = l.driver.snapshot();
                PathCheck {
                    is_safe: sectors.front_cm >= l.critical_dist_cm,
                    sectors,
                }
            }
        }
    }

    /// Stop the strategy's sensors. Safe to call more than once.
    pub fn stop(&mut self) {
        match self {
            ObstacleStrategy::Lidar(l) => {
                if l.driver.is_running() {
                    l.driver.stop();
                    info!("Lidar strategy stopped");
                }
            }
        }
    }
}

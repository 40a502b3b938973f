//! # Motor driver module
//!
//! Turns normalised wheel commands into signed signals for a two channel H-bridge (TB6612FNG
//! style), compensating for the motors' stall region and ramping speed changes where asked.
//!
//! The hardware sits behind the [`MotorHal`] trait, with [`GpioHal`] driving real pins on a
//! Raspberry Pi and [`SimHal`] recording outputs everywhere else.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cmd;
mod hal;
mod params;
mod state;

#[cfg(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64")))]
mod gpio;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use cmd::*;
pub use hal::*;
pub use params::*;
pub use state::*;

#[cfg(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64")))]
pub use gpio::GpioHal;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

#[cfg(not(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64"))))]
use log::warn;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised by the motor driver.
#[derive(Debug, thiserror::Error)]
pub enum MotDriverError {
    #[error("Motor HAL error: {0}")]
    Hal(#[from] HalError),

    #[error("Invalid motor driver parameters: {0}")]
    InvalidParams(String),

    #[error("The motor driver has been shut down")]
    ShutDown,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Open the motor hardware for this host.
///
/// On a Raspberry Pi this claims the GPIO pins given in the parameters.
#[cfg(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64")))]
pub fn open_hal(params: &MotDriverParams) -> Result<Box<dyn MotorHal + Send>, HalError> {
    Ok(Box::new(GpioHal::new(&params.pins, params.pwm_frequency_hz)?))
}

/// Open the motor hardware for this host.
///
/// There is no GPIO on this host, so a simulated HAL is returned.
#[cfg(not(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64"))))]
pub fn open_hal(_params: &MotDriverParams) -> Result<Box<dyn MotorHal + Send>, HalError> {
    warn!("No GPIO available on this host, motors will be simulated");
    Ok(Box::new(SimHal::new()))
}

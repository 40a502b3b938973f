//! # Motor calibration
//!
//! Drives both wheels straight at a fixed speed for a while so the wheel trims can be tuned
//! until the rover tracks straight.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use color_eyre::{eyre::WrapErr, Report};
use log::info;
use structopt::StructOpt;

use rov_lib::mot_driver::{self, MotDriver, MotDriverParams, MotionCommand};
use util::{
    logger::{logger_init, LevelFilter},
    params,
    session::Session,
    time::sleep_s,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drive straight to calibrate the wheel trims
#[derive(Debug, StructOpt)]
#[structopt(name = "mot_calib")]
struct Cli {
    /// Normalised drive speed
    #[structopt(long, default_value = "0.7")]
    speed: f64,

    /// Left wheel trim, overrides the parameter file
    #[structopt(long)]
    left_trim: Option<f64>,

    /// Right wheel trim, overrides the parameter file
    #[structopt(long)]
    right_trim: Option<f64>,

    /// How long to drive for
    ///
    /// Units: seconds
    #[structopt(long, default_value = "5.0")]
    duration: f64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let cli = Cli::from_args();

    let session = Session::new("mot_calib", "sessions").wrap_err("Failed to create the session")?;
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    let mut mot_params: MotDriverParams =
        params::load("mot_driver.toml").wrap_err("Could not load mot_driver params")?;
    if let Some(t) = cli.left_trim {
        mot_params.left_trim = t;
    }
    if let Some(t) = cli.right_trim {
        mot_params.right_trim = t;
    }

    info!(
        "Calibration run: speed {:.2}, trims L {:.2} R {:.2}, {:.1} s",
        cli.speed, mot_params.left_trim, mot_params.right_trim, cli.duration
    );

    let hal = mot_driver::open_hal(&mot_params).wrap_err("Failed to open the motor hardware")?;
    let mut mot = MotDriver::new(mot_params, hal).wrap_err("Failed to initialise MotDriver")?;

    // The driver cleans up on drop, so an error here still leaves the motors stopped
    let applied = mot
        .drive(MotionCommand::straight(cli.speed))
        .wrap_err("Failed to drive the motors")?;
    info!("Driving at L {:.3} R {:.3}", applied.left, applied.right);

    sleep_s(cli.duration);

    mot.stop(false).wrap_err("Failed to stop the motors")?;
    mot.cleanup().wrap_err("Failed to shut down the motor driver")?;

    info!("Calibration run complete");

    Ok(())
}

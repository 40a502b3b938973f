//! Main rover-side executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise: command line, session, logging, parameters, motors, obstacle sensing and
//!       the event log
//!     - Main loop, at a fixed period:
//!         - Check the path ahead using the latest sector snapshot
//!         - Steering control processing, escaping from critical obstacles
//!         - Motor actuation and event recording
//!     - Shutdown on Ctrl-C: motors, then sensors, then the event log
//!
//! # Modules
//!
//! All cyclic modules (e.g. `steer_ctrl`) shall provide a public struct implementing the
//! `util::module::State` trait.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use rov_lib::{
    data_store::DataStore,
    event_log::{Action, Event, EventLog, EventSink},
    lidar::LidarParams,
    mot_driver::{self, MotDriver, MotDriverParams, MotorHal},
    params::RovExecParams,
    rover::Rover,
    steer_ctrl::{SteerCtrl, SteerCtrlParams},
    strategy::{ObstacleStrategy, StrategyMode},
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use util::{
    logger::logger_init,
    module::State,
    params::{self, LoadError},
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Reactive obstacle avoidance rover executable
#[derive(Debug, StructOpt)]
#[structopt(name = "rov_exec")]
struct Cli {
    /// Obstacle sensing mode
    #[structopt(
        short,
        long,
        possible_values = &StrategyMode::ALL,
        case_insensitive = true
    )]
    mode: StrategyMode,

    /// Lidar serial port, overrides the lidar parameter file
    #[structopt(long)]
    port: Option<String>,

    /// Directory containing the parameter files, defaults to $ROVER_SW_ROOT/params
    #[structopt(long, parse(from_os_str))]
    params_dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- COMMAND LINE ----

    let cli = Cli::from_args();

    // Reject modes with no implementation before anything is opened
    cli.mode
        .ensure_supported()
        .wrap_err("Cannot start the requested obstacle sensing mode")?;

    // ---- EARLY INITIALISATION ----

    let exec_params: RovExecParams = load_params(cli.params_dir.as_deref(), "rov_exec.toml")
        .wrap_err("Could not load exec params")?;
    exec_params
        .are_valid()
        .wrap_err("Invalid exec params")?;

    // Initialise session
    let session = Session::new("rov_exec", &exec_params.sessions_dir)
        .wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(exec_params.log_level_filter()?, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Rover Executable\n");
    info!("Obstacle sensing mode: {}", cli.mode);
    info!("Session directory: {:?}\n", session.session_root);

    // Must be installed before any hardware is opened
    let running = setup_ctrl_c_handler().wrap_err("Failed to install the Ctrl-C handler")?;

    // ---- LOAD PARAMETERS ----

    let mut lidar_params: LidarParams = load_params(cli.params_dir.as_deref(), "lidar.toml")
        .wrap_err("Could not load lidar params")?;
    if let Some(port) = cli.port {
        info!("Lidar port overridden to {}", port);
        lidar_params.port = port;
    }
    lidar_params.are_valid().wrap_err("Invalid lidar params")?;

    let steer_params: SteerCtrlParams =
        load_params(cli.params_dir.as_deref(), "steer_ctrl.toml")
            .wrap_err("Could not load steer_ctrl params")?;
    let mot_params: MotDriverParams = load_params(cli.params_dir.as_deref(), "mot_driver.toml")
        .wrap_err("Could not load mot_driver params")?;

    info!("Parameters loaded");

    // ---- INITIALISE MODULES ----

    let critical_dist_cm = steer_params.critical_dist_cm;
    let steer_ctrl = SteerCtrl::init(steer_params).wrap_err("Failed to initialise SteerCtrl")?;

    let hal = mot_driver::open_hal(&mot_params).wrap_err("Failed to open the motor hardware")?;
    let mot = MotDriver::new(mot_params, hal).wrap_err("Failed to initialise MotDriver")?;
    info!("MotDriver init complete");

    let mut strategy = ObstacleStrategy::open(cli.mode, &lidar_params, critical_dist_cm)
        .wrap_err("Failed to start the obstacle sensing strategy")?;
    info!("{} strategy started", strategy.mode());

    let event_log = EventLog::new(&session, cli.mode).wrap_err("Failed to open the event log")?;

    let mut rover = Rover::new(steer_ctrl, mot, event_log);
    rover.record(Event::new(
        Action::Init,
        strategy.check_path().sectors,
        format!("mode={}", cli.mode),
    ));

    info!("Initialisation complete, starting main loop\n");

    // ---- MAIN LOOP ----

    let loop_result = run(&mut rover, &strategy, &exec_params, &running);

    // ---- SHUTDOWN ----

    info!("Shutting down");

    rover.record(Event::new(
        Action::Stop,
        strategy.check_path().sectors,
        "",
    ));

    match rover.shutdown_actuation() {
        Ok(()) => info!("Motors stopped"),
        Err(e) => error!("Motor shutdown failed: {}", e),
    }

    strategy.stop();
    info!("Obstacle sensing stopped");

    rover.shutdown_events();

    let ds = loop_result?;
    info!(
        "End of execution after {:.1} s: {} cycles, {} escapes, {} overruns",
        ds.elapsed_s, ds.num_cycles, ds.num_escapes, ds.num_cycle_overruns
    );
    if let Some(phase) = ds.phase {
        info!("    Final phase: {}", phase);
    }

    Ok(())
}

/// Run control cycles until the running flag is cleared.
fn run<H, S>(
    rover: &mut Rover<H, S>,
    strategy: &ObstacleStrategy,
    exec_params: &RovExecParams,
    running: &AtomicBool,
) -> Result<DataStore, Report>
where
    H: MotorHal,
    S: EventSink,
{
    let mut ds = DataStore::default();
    let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s);

    while running.load(Ordering::SeqCst) {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(exec_params.cycle_frequency_hz());

        // ---- SENSING ----

        let check = strategy.check_path();
        if !check.is_safe {
            debug!("Path blocked at {:.1} cm", check.sectors.front_cm);
        }

        // ---- CONTROL AND ACTUATION ----

        let report = rover
            .step(&check.sectors)
            .wrap_err("Control cycle failed")?;
        ds.store_report(report);

        if ds.is_1_hz_cycle {
            debug!(
                "Phase {:?}, sectors F {:.1} L {:.1} R {:.1}, motors L {:.2} R {:.2}",
                report.steer.phase,
                check.sectors.front_cm,
                check.sectors.left_cm,
                check.sectors.right_cm,
                report.applied.left,
                report.applied.right
            );
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => {
                ds.cycle_end(false);
                thread::sleep(d);
            }
            None => {
                // Escapes are allowed to hold the loop up
                if !ds.escaped_this_cycle {
                    warn!(
                        "Cycle overran by {:.06} s",
                        cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
                    );
                }
                ds.cycle_end(true);
            }
        }
    }

    Ok(ds)
}

/// Load a parameter file from the given directory, or the default parameter directory.
fn load_params<P: DeserializeOwned>(dir: Option<&Path>, file: &str) -> Result<P, LoadError> {
    match dir {
        Some(d) => params::load_from_path(d.join(file)),
        None => params::load(file),
    }
}

/// Set up a Ctrl-C handler that clears the returned flag.
fn setup_ctrl_c_handler() -> Result<Arc<AtomicBool>, ctrlc::Error> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    Ok(running)
}

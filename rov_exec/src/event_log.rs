//! # Event log
//!
//! Structured, append-only record of what the rover decided on each control tick. Rows go to a
//! CSV file in the session directory through a background archiver, so recording an event never
//! waits on disk.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use chrono::Local;
use log::{info, warn};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::{lidar::SectorState, mot_driver::MotionCommand, strategy::StrategyMode};
use util::{
    archive::{ArchiveError, Archiver},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Column names of the event log.
pub const EVENT_LOG_HEADER: [&str; 7] = [
    "Timestamp",
    "Mode",
    "Front_Dist_cm",
    "Left_Dist_cm",
    "Right_Dist_cm",
    "Action",
    "Notes",
];

/// Wall clock format of the timestamp column.
const TIMESTAMP_FORMAT: &str = "%H:%M:%S%.3f";

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Destination for controller events.
///
/// Recording is infallible to the caller, implementations log their own failures.
pub trait EventSink {
    fn record(&mut self, event: Event);

    /// Flush and close the sink. Safe to call more than once.
    fn shutdown(&mut self) {}
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// What the rover did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Init,
    Drive,
    Slow,
    EscapeStop,
    Backward,
    PivotLeft,
    PivotRight,
    EscapeDone,
    Stop,
}

#[derive(Debug, thiserror::Error)]
pub enum EventLogError {
    #[error("Could not open the event log: {0}")]
    Archive(#[from] ArchiveError),
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single controller event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub action: Action,

    /// Sector distances the decision was based on.
    pub sectors: SectorState,

    pub notes: String,
}

/// CSV backed event sink.
pub struct EventLog {
    mode: String,
    archiver: Archiver<EventRecord>,
    closed: bool,
}

/// Event sink which keeps every event in memory.
#[derive(Debug, Default)]
pub struct EventBuffer {
    pub events: Vec<Event>,
    pub shut_down: bool,
}

/// Row of the CSV file, in column order.
#[derive(Debug, Serialize)]
struct EventRecord {
    timestamp: String,
    mode: String,
    front_cm: String,
    left_cm: String,
    right_cm: String,
    action: &'static str,
    notes: String,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::Init => "INIT",
            Action::Drive => "DRIVE",
            Action::Slow => "SLOW",
            Action::EscapeStop => "ESCAPE_STOP",
            Action::Backward => "BACKWARD",
            Action::PivotLeft => "PIVOT_LEFT",
            Action::PivotRight => "PIVOT_RIGHT",
            Action::EscapeDone => "ESCAPE_DONE",
            Action::Stop => "STOP",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Event {
    pub fn new<S: Into<String>>(action: Action, sectors: SectorState, notes: S) -> Self {
        Self {
            action,
            sectors,
            notes: notes.into(),
        }
    }

    /// An event for a normal drive tick, noting the commanded wheel speeds.
    pub fn drive(action: Action, sectors: SectorState, cmd: &MotionCommand) -> Self {
        Self::new(action, sectors, format!("L={:.2} R={:.2}", cmd.left, cmd.right))
    }
}

impl EventLog {
    /// Open `events_<mode>.csv` in the session directory.
    pub fn new(session: &Session, mode: StrategyMode) -> Result<Self, EventLogError> {
        Self::from_path(
            session.file_path(format!("events_{}.csv", mode)),
            &mode.to_string(),
        )
    }

    pub fn from_path<P: AsRef<Path>>(path: P, mode: &str) -> Result<Self, EventLogError> {
        let archiver = Archiver::from_path(path, &EVENT_LOG_HEADER)?;

        info!("Event log: {:?}", archiver.path());

        Ok(Self {
            mode: mode.to_string(),
            archiver,
            closed: false,
        })
    }

    pub fn path(&self) -> PathBuf {
        self.archiver.path().to_path_buf()
    }
}

impl EventSink for EventLog {
    fn record(&mut self, event: Event) {
        self.archiver.serialise(EventRecord {
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            mode: self.mode.clone(),
            front_cm: format!("{:.1}", event.sectors.front_cm),
            left_cm: format!("{:.1}", event.sectors.left_cm),
            right_cm: format!("{:.1}", event.sectors.right_cm),
            action: event.action.label(),
            notes: event.notes,
        });
    }

    fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        match self.archiver.close() {
            Ok(()) => info!("Event log flushed"),
            Err(e) => warn!("Event log did not close cleanly: {}", e),
        }
    }
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Action labels in the order they were recorded.
    pub fn actions(&self) -> Vec<Action> {
        self.events.iter().map(|e| e.action).collect()
    }
}

impl EventSink for EventBuffer {
    fn record(&mut self, event: Event) {
        self.events.push(event);
    }

    fn shutdown(&mut self) {
        self.shut_down = true;
    }
}

impl<T: EventSink + ?Sized> EventSink for Box<T> {
    fn record(&mut self, event: Event) {
        (**self).record(event)
    }

    fn shutdown(&mut self) {
        (**self).shutdown()
    }
}

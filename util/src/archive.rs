//! Background CSV archiving
//!
//! An [`Archiver`] owns a writer thread fed by a channel, so that callers on a
//! time-critical loop never wait on disk I/O. Records are appended to the
//! file in the order they were sent.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use crossbeam_channel::{unbounded, Receiver, Sender};
use csv::{Writer, WriterBuilder};
use log::warn;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files from a background thread.
pub struct Archiver<T> {
    path: PathBuf,
    sender: Option<Sender<T>>,
    writer_thread: Option<JoinHandle<Result<(), ArchiveError>>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur while archiving.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Archive file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("The archive writer thread panicked")]
    WriterPanicked,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T> Archiver<T>
where
    T: Serialize + Send + 'static,
{
    /// Create a new archive file at the given path, writing the header row
    /// immediately, and start the writer thread.
    ///
    /// Any existing file at the path is truncated.
    pub fn from_path<P: AsRef<Path>>(path: P, header: &[&str]) -> Result<Self, ArchiveError> {
        let path = path.as_ref().to_path_buf();

        let file = File::create(&path)?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

        if !header.is_empty() {
            writer.write_record(header)?;
            writer.flush()?;
        }

        let (sender, receiver) = unbounded();

        let writer_thread = thread::Builder::new()
            .name("archiver".into())
            .spawn(move || writer_thread(writer, receiver))?;

        Ok(Self {
            path,
            sender: Some(sender),
            writer_thread: Some(writer_thread),
        })
    }

    /// Queue a record to be written to the archive.
    ///
    /// Never blocks. If the archive has been closed the record is dropped with
    /// a warning.
    pub fn serialise(&self, record: T) {
        match self.sender {
            Some(ref s) => {
                if let Err(e) = s.send(record) {
                    warn!("Could not queue record for archive {:?}: {}", self.path, e);
                }
            }
            None => warn!("Archive {:?} is closed, record dropped", self.path),
        }
    }

    /// Path of the archive file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the archive, waiting for all queued records to be written.
    ///
    /// Calling this more than once is harmless.
    pub fn close(&mut self) -> Result<(), ArchiveError> {
        // Dropping the sender ends the writer's receive loop once the queue is drained
        self.sender.take();

        match self.writer_thread.take() {
            Some(handle) => match handle.join() {
                Ok(r) => r,
                Err(_) => Err(ArchiveError::WriterPanicked),
            },
            None => Ok(()),
        }
    }
}

impl<T> Drop for Archiver<T> {
    fn drop(&mut self) {
        self.sender.take();

        if let Some(handle) = self.writer_thread.take() {
            match handle.join() {
                Ok(Ok(())) => (),
                Ok(Err(e)) => warn!("Archive {:?} closed with error: {}", self.path, e),
                Err(_) => warn!("Archive {:?} writer thread panicked", self.path),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn writer_thread<T: Serialize>(
    mut writer: Writer<File>,
    receiver: Receiver<T>,
) -> Result<(), ArchiveError> {
    for record in receiver.iter() {
        // A failed row is reported and skipped, the archive carries on
        if let Err(e) = writer.serialize(&record) {
            warn!("Could not write archive record: {}", e);
            continue;
        }
        if let Err(e) = writer.flush() {
            warn!("Could not flush archive: {}", e);
        }
    }

    writer.flush()?;

    Ok(())
}

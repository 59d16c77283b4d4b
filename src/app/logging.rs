//! Job log: the append-only, human-readable trace of one invocation.
//!
//! This is separate from the diagnostic `log` output on stderr. Every block
//! is written and flushed immediately so the host can tail the file while the
//! request is in flight.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use log::{debug, warn};

use crate::error_handling::JobError;
use crate::job::JobDescriptor;

/// Append-only sink for the job log.
pub struct JobLog {
    writer: Box<dyn Write + Send>,
}

impl std::fmt::Debug for JobLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobLog").finish_non_exhaustive()
    }
}

impl JobLog {
    /// Opens `path` for appending, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `JobError::JobLog` if the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self, JobError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        debug!("Appending job log to {}", path.display());
        Ok(Self::from_writer(file))
    }

    /// Wraps any writer (used by tests and embedders).
    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Box::new(writer),
        }
    }

    /// A job log that drops everything.
    pub fn discard() -> Self {
        Self::from_writer(io::sink())
    }

    /// Opens the log named by the job's `log_file`, or discards output when there is none.
    pub fn for_job(job: &JobDescriptor) -> Result<Self, JobError> {
        match job.log_file() {
            Some(path) => Self::open(&path),
            None => {
                warn!("Job has no log_file; job log output is discarded");
                Ok(Self::discard())
            }
        }
    }

    /// First block: the outgoing request line.
    pub fn request(&mut self, method: &str, url: &str) -> Result<(), JobError> {
        self.write(&format!("Sending HTTP {} to URL:\n{}\n", method, url))
    }

    /// A labelled block preceded by a blank line.
    pub fn block(&mut self, label: &str, body: &str) -> Result<(), JobError> {
        self.write(&format!("\n{}\n{}\n", label, body))
    }

    /// A single line preceded by a blank line.
    pub fn line(&mut self, text: &str) -> Result<(), JobError> {
        self.write(&format!("\n{}\n", text))
    }

    fn write(&mut self, text: &str) -> Result<(), JobError> {
        self.writer.write_all(text.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }
}

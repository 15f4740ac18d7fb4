//! Failure sink for orphaned payments.
//!
//! When the gateway has charged a customer but the order cannot be stored,
//! the full payload is appended to a JSON-lines file for manual
//! reconciliation (`saumara-cli reconcile <file>`) and logged at ERROR, which
//! the Sentry layer turns into an event.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use saumara_core::PaymentFailure;
use thiserror::Error;

/// Errors writing or reading the failure log.
#[derive(Debug, Error)]
pub enum FailureLogError {
    #[error("failure log I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failure log line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },
    #[error("failed to serialize failure record: {0}")]
    Serialize(serde_json::Error),
}

/// Somewhere to put charges that did not become orders.
///
/// The checkout service calls sinks on the blocking thread pool, so
/// implementations may do synchronous I/O.
pub trait FailureSink: Send + Sync {
    /// Record one orphaned payment.
    ///
    /// # Errors
    ///
    /// Returns an error if the record could not be written.
    fn record(&self, failure: &PaymentFailure) -> Result<(), FailureLogError>;
}

/// Append-only JSON-lines file.
#[derive(Debug)]
pub struct JsonlFailureLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlFailureLog {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record in a failure log. Blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a line is not a
    /// failure record.
    pub fn read_all(path: &Path) -> Result<Vec<PaymentFailure>, FailureLogError> {
        let file = std::fs::File::open(path)?;
        let mut failures = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let failure = serde_json::from_str(&line).map_err(|source| FailureLogError::Parse {
                line: index.saturating_add(1),
                source,
            })?;
            failures.push(failure);
        }
        Ok(failures)
    }
}

impl FailureSink for JsonlFailureLog {
    fn record(&self, failure: &PaymentFailure) -> Result<(), FailureLogError> {
        let mut line = serde_json::to_string(failure).map_err(FailureLogError::Serialize)?;
        line.push('\n');

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

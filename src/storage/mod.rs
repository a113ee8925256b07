//! Output sinks for extraction outcomes
//!
//! Accepted signals and failures go to separate append-only files. The engine
//! never writes; the runner routes each outcome to the matching sink.

pub mod csv_writer;
pub mod error_log;

use crate::extraction::{ExtractionFailure, Signal};
use anyhow::Result;

pub use csv_writer::CsvSignalWriter;
pub use error_log::JsonlFailureLog;

/// Destination for accepted signals
#[cfg_attr(test, mockall::automock)]
pub trait SignalSink: Send {
    fn write_signal(&mut self, signal: &Signal) -> Result<()>;
}

/// Destination for rejected messages
#[cfg_attr(test, mockall::automock)]
pub trait FailureSink: Send {
    fn write_failure(&mut self, failure: &ExtractionFailure) -> Result<()>;
}

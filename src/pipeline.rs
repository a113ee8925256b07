//! Extraction runner
//!
//! Fans a batch of messages out over blocking worker tasks and routes each
//! outcome to its sink. `buffered` yields results in input order, so the sinks
//! see messages in the order the feed delivered them.

use crate::extraction::{ErrorKind, ExtractionOutcome, RawMessage, SignalExtractor};
use crate::storage::{FailureSink, SignalSink};
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use log::{error, info};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub received: usize,
    /// Dropped by the keyword filter before extraction
    pub filtered: usize,
    pub accepted: usize,
    pub rejected: BTreeMap<ErrorKind, usize>,
    pub sink_errors: usize,
}

impl RunStats {
    pub fn record(&mut self, outcome: Option<&ExtractionOutcome>) {
        self.received += 1;
        match outcome {
            None => self.filtered += 1,
            Some(ExtractionOutcome::Signal(_)) => self.accepted += 1,
            Some(ExtractionOutcome::Failure(failure)) => {
                *self.rejected.entry(failure.kind).or_insert(0) += 1;
            }
        }
    }

    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }

    pub fn log_summary(&self) {
        info!("=== Extraction Summary ===");
        info!("Messages received: {}", self.received);
        info!("Filtered (not signal-shaped): {}", self.filtered);
        info!("Signals accepted: {}", self.accepted);
        info!("Rejected: {}", self.rejected_total());
        for (kind, count) in &self.rejected {
            info!("  {}: {}", kind, count);
        }
        if self.sink_errors > 0 {
            error!("Sink write errors: {}", self.sink_errors);
        }
    }
}

/// Send one outcome to the sink that owns it
pub fn route_outcome(
    outcome: &ExtractionOutcome,
    signals: &mut dyn SignalSink,
    failures: &mut dyn FailureSink,
) -> Result<()> {
    match outcome {
        ExtractionOutcome::Signal(signal) => signals.write_signal(signal),
        ExtractionOutcome::Failure(failure) => failures.write_failure(failure),
    }
}

/// Extract every message with up to `concurrency` in flight and route the results
///
/// A failing sink write is logged and counted; it does not stop the run.
pub async fn run_messages(
    extractor: Arc<SignalExtractor>,
    messages: Vec<RawMessage>,
    concurrency: usize,
    signals: &mut dyn SignalSink,
    failures: &mut dyn FailureSink,
) -> Result<RunStats> {
    let mut stats = RunStats::default();
    info!(
        "Processing {} messages (concurrency: {})",
        messages.len(),
        concurrency
    );

    let mut outcomes = stream::iter(messages.into_iter().map(|message| {
        let extractor = Arc::clone(&extractor);
        tokio::task::spawn_blocking(move || {
            let outcome = extractor.process(&message);
            (message.meta.message_id, outcome)
        })
    }))
    .buffered(concurrency.max(1));

    while let Some(joined) = outcomes.next().await {
        let (message_id, outcome) = joined.context("extraction task failed")?;
        stats.record(outcome.as_ref());
        if let Some(outcome) = outcome {
            if let Err(e) = route_outcome(&outcome, signals, failures) {
                error!("Failed to store outcome of message {}: {:#}", message_id, e);
                stats.sink_errors += 1;
            }
        }
    }

    Ok(stats)
}

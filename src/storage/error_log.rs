//! JSON-lines log of rejected messages

use super::FailureSink;
use crate::extraction::{ErrorKind, ExtractionFailure};
use anyhow::{Context, Result};
use log::{info, warn};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Appends one JSON object per failure
#[derive(Debug, Clone)]
pub struct JsonlFailureLog {
    path: PathBuf,
}

impl JsonlFailureLog {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let log = Self { path: path.into() };
        if let Some(parent) = log.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        info!("Failure log initialized: {}", log.path.display());
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every logged failure; unparseable lines are skipped
    pub fn read_failures(&self) -> Result<Vec<ExtractionFailure>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;

        let mut failures = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(failure) => failures.push(failure),
                Err(e) => warn!(
                    "Skipping unreadable failure record at {}:{}: {}",
                    self.path.display(),
                    index + 1,
                    e
                ),
            }
        }
        Ok(failures)
    }

    /// Number of logged failures
    pub fn failure_count(&self) -> Result<usize> {
        Ok(self.read_failures()?.len())
    }

    /// Logged failures grouped by kind
    pub fn counts_by_kind(&self) -> Result<BTreeMap<ErrorKind, usize>> {
        let mut counts = BTreeMap::new();
        for failure in self.read_failures()? {
            *counts.entry(failure.kind).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

impl FailureSink for JsonlFailureLog {
    fn write_failure(&mut self, failure: &ExtractionFailure) -> Result<()> {
        let line = serde_json::to_string(failure)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        writeln!(file, "{}", line)?;
        warn!(
            "Logged extraction error: @{} - {}",
            failure.channel_id, failure.reason
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::CandidateFields;
    use chrono::{TimeZone, Utc};

    fn failure(message_id: i64, kind: ErrorKind) -> ExtractionFailure {
        let ts = Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap();
        ExtractionFailure {
            message_id,
            channel_id: "goldfxsignals".to_string(),
            posted_at: ts,
            raw_text: "XAUUSD BUY 2650\nSL 2660".to_string(),
            fields: CandidateFields {
                symbol: Some("XAUUSD".to_string()),
                ..CandidateFields::default()
            },
            kind,
            reason: "test".to_string(),
            occurred_at: ts,
        }
    }

    #[test]
    fn test_append_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = JsonlFailureLog::new(dir.path().join("logs/errors.jsonl")).unwrap();
        assert_eq!(log.failure_count().unwrap(), 0);

        log.write_failure(&failure(1, ErrorKind::PriceLogicViolation))
            .unwrap();
        log.write_failure(&failure(2, ErrorKind::NoPatternMatch))
            .unwrap();
        log.write_failure(&failure(3, ErrorKind::PriceLogicViolation))
            .unwrap();

        let failures = log.read_failures().unwrap();
        assert_eq!(failures.len(), 3);
        assert_eq!(failures[0], failure(1, ErrorKind::PriceLogicViolation));

        let counts = log.counts_by_kind().unwrap();
        assert_eq!(counts[&ErrorKind::PriceLogicViolation], 2);
        assert_eq!(counts[&ErrorKind::NoPatternMatch], 1);
    }

    #[test]
    fn test_each_record_is_one_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("errors.jsonl");
        let mut log = JsonlFailureLog::new(&path).unwrap();
        log.write_failure(&failure(7, ErrorKind::MissingRequiredField))
            .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(contents.trim()).unwrap();
        assert_eq!(value["error_kind"], "missing_required_field");
        assert_eq!(value["raw_text"], "XAUUSD BUY 2650\nSL 2660");
    }

    #[test]
    fn test_garbage_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("errors.jsonl");
        let mut log = JsonlFailureLog::new(&path).unwrap();
        log.write_failure(&failure(1, ErrorKind::SymbolNotAdmissible))
            .unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "not json").unwrap();

        assert_eq!(log.failure_count().unwrap(), 1);
    }
}

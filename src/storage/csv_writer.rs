//! Append-only CSV file of accepted signals

use super::SignalSink;
use crate::extraction::{EntryPrice, Signal};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use log::info;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// Column order of the output file
pub const FIELD_NAMES: [&str; 16] = [
    "message_id",
    "channel_id",
    "posted_at",
    "symbol",
    "direction",
    "entry_price",
    "entry_price_min",
    "entry_price_max",
    "stop_loss",
    "take_profit_1",
    "take_profit_2",
    "take_profit_3",
    "take_profit_4",
    "confidence_score",
    "notes",
    "extracted_at",
];

/// One CSV row; field order must match [`FIELD_NAMES`]
#[derive(Debug, Serialize)]
struct SignalRow<'a> {
    message_id: i64,
    channel_id: &'a str,
    posted_at: String,
    symbol: &'a str,
    direction: &'a str,
    entry_price: Option<f64>,
    entry_price_min: Option<f64>,
    entry_price_max: Option<f64>,
    stop_loss: Option<f64>,
    take_profit_1: Option<f64>,
    take_profit_2: Option<f64>,
    take_profit_3: Option<f64>,
    take_profit_4: Option<f64>,
    confidence_score: f64,
    notes: &'a str,
    extracted_at: String,
}

impl<'a> SignalRow<'a> {
    fn from_signal(signal: &'a Signal) -> Self {
        let (entry_price, entry_price_min, entry_price_max) = match signal.entry {
            EntryPrice::Single(price) => (Some(price), None, None),
            EntryPrice::Range { min, max } => (None, Some(min), Some(max)),
        };
        Self {
            message_id: signal.message_id,
            channel_id: &signal.channel_id,
            posted_at: signal.posted_at.to_rfc3339(),
            symbol: &signal.symbol,
            direction: signal.direction.as_str(),
            entry_price,
            entry_price_min,
            entry_price_max,
            stop_loss: signal.stop_loss,
            take_profit_1: signal.take_profit(1),
            take_profit_2: signal.take_profit(2),
            take_profit_3: signal.take_profit(3),
            take_profit_4: signal.take_profit(4),
            confidence_score: signal.confidence,
            notes: signal.notes.as_deref().unwrap_or(""),
            extracted_at: signal.extracted_at.to_rfc3339(),
        }
    }
}

/// Writes signals to a CSV file, one row per signal
#[derive(Debug, Clone)]
pub struct CsvSignalWriter {
    path: PathBuf,
}

impl CsvSignalWriter {
    /// Open (or create with header) the CSV file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let writer = Self { path: path.into() };
        if let Some(parent) = writer.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        if !writer.path.exists() {
            writer.write_header()?;
            info!("Created new CSV file with header: {}", writer.path.display());
        }
        info!("CSV writer initialized: {}", writer.path.display());
        Ok(writer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_header(&self) -> Result<()> {
        let mut wtr = csv::Writer::from_path(&self.path)
            .with_context(|| format!("failed to create {}", self.path.display()))?;
        wtr.write_record(FIELD_NAMES)?;
        wtr.flush()?;
        Ok(())
    }

    fn append_writer(&self) -> Result<csv::Writer<fs::File>> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        Ok(csv::WriterBuilder::new().has_headers(false).from_writer(file))
    }

    /// Number of data rows in the file
    pub fn signal_count(&self) -> Result<usize> {
        if !self.path.exists() {
            return Ok(0);
        }
        let mut rdr = csv::Reader::from_path(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let mut count = 0;
        for record in rdr.records() {
            record?;
            count += 1;
        }
        Ok(count)
    }

    /// Drop rows whose `extracted_at` is older than `max_age` before `now`
    ///
    /// Rows with an unreadable timestamp are dropped as well. Returns the number
    /// of rows removed.
    pub fn cleanup_old_records(&mut self, max_age: Duration, now: DateTime<Utc>) -> Result<usize> {
        if !self.path.exists() {
            return Ok(0);
        }
        let cutoff = now - max_age;

        let mut rdr = csv::Reader::from_path(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let column = rdr
            .headers()?
            .iter()
            .position(|name| name == "extracted_at")
            .context("CSV file has no extracted_at column")?;

        let mut kept = Vec::new();
        let mut removed = 0;
        for record in rdr.records() {
            let record = record?;
            let fresh = record
                .get(column)
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .is_some_and(|ts| ts.with_timezone(&Utc) >= cutoff);
            if fresh {
                kept.push(record);
            } else {
                removed += 1;
            }
        }

        if removed > 0 {
            let mut wtr = csv::Writer::from_path(&self.path)?;
            wtr.write_record(FIELD_NAMES)?;
            for record in &kept {
                wtr.write_record(record)?;
            }
            wtr.flush()?;
            info!(
                "Cleaned up {} old records (older than {}h)",
                removed,
                max_age.num_hours()
            );
        }
        Ok(removed)
    }
}

impl SignalSink for CsvSignalWriter {
    fn write_signal(&mut self, signal: &Signal) -> Result<()> {
        let mut wtr = self.append_writer()?;
        wtr.serialize(SignalRow::from_signal(signal))
            .context("CSV write failed")?;
        wtr.flush()?;
        info!(
            "Wrote signal to CSV: {} {} (message_id: {})",
            signal.symbol, signal.direction, signal.message_id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::Direction;
    use chrono::TimeZone;

    fn signal(message_id: i64, extracted_at: DateTime<Utc>) -> Signal {
        Signal {
            message_id,
            channel_id: "garygoldlegacy".to_string(),
            posted_at: Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap(),
            symbol: "XAUUSD".to_string(),
            direction: Direction::Buy,
            entry: EntryPrice::from_pair(4930.0, 4925.0),
            stop_loss: Some(4922.0),
            take_profits: vec![4935.0, 4940.0],
            confidence: 1.0,
            notes: None,
            extracted_at,
        }
    }

    #[test]
    fn test_header_then_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/signals.csv");
        let mut writer = CsvSignalWriter::new(&path).unwrap();
        let now = Utc::now();
        writer.write_signal(&signal(1, now)).unwrap();
        writer.write_signal(&signal(2, now)).unwrap();
        writer.write_signal(&signal(3, now)).unwrap();

        assert_eq!(writer.signal_count().unwrap(), 3);

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), FIELD_NAMES.to_vec());
        let first = rdr.records().next().unwrap().unwrap();
        assert_eq!(&first[0], "1");
        assert_eq!(&first[4], "BUY");
        assert_eq!(&first[5], "");
        assert_eq!(&first[6], "4925.0");
        assert_eq!(&first[7], "4930.0");
        assert_eq!(&first[9], "4935.0");
        assert_eq!(&first[11], "");
    }

    #[test]
    fn test_reopen_does_not_duplicate_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signals.csv");
        CsvSignalWriter::new(&path)
            .unwrap()
            .write_signal(&signal(1, Utc::now()))
            .unwrap();
        let writer = CsvSignalWriter::new(&path).unwrap();
        assert_eq!(writer.signal_count().unwrap(), 1);
    }

    #[test]
    fn test_cleanup_old_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = CsvSignalWriter::new(dir.path().join("signals.csv")).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 20, 0, 0).unwrap();
        for (id, age) in [(1, 13), (2, 2), (3, 0)] {
            writer
                .write_signal(&signal(id, now - Duration::hours(age)))
                .unwrap();
        }

        let removed = writer.cleanup_old_records(Duration::hours(12), now).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(writer.signal_count().unwrap(), 2);
        assert_eq!(writer.cleanup_old_records(Duration::hours(12), now).unwrap(), 0);
    }
}

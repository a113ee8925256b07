use anyhow::Result;
use signal_extractor::extraction::ErrorKind;
use signal_extractor::feed;
use signal_extractor::pipeline;
use signal_extractor::storage::{CsvSignalWriter, JsonlFailureLog};
use signal_extractor::SignalExtractor;
use std::io::Cursor;
use std::sync::Arc;

#[cfg(test)]
mod pipeline_tests {
    use super::*;

    const FEED: &str = r#"{"message_id": 101, "channel_id": "nickalphatrader", "posted_at": "2026-01-15T09:30:00Z", "text": "GOLD SELL\nGold sell now @4746.50-4750.50\nsl: 4752.50\ntp1: 4730\ntp2: 4720"}
{"message_id": 102, "channel_id": "garygoldlegacy", "posted_at": "2026-01-15T09:31:00Z", "text": "GARY GOLD LEGACY\nGold Buy Now @ 4930-4925\nsl:4922\ntp1:4935\ntp2:4940"}
{"message_id": 103, "channel_id": "nickalphatrader", "posted_at": "2026-01-15T09:32:00Z", "text": "Good morning traders! Remember to manage your risk today!"}
{"message_id": 104, "channel_id": "nickalphatrader", "posted_at": "2026-01-15T09:33:00Z", "text": "Gold sell now @4740\nsl: 4750\ntp1: 4760"}
not a message
{"message_id": 105, "channel_id": "garygoldlegacy", "posted_at": "2026-01-15T09:34:00Z", "text": "Gold buy now @4740"}
"#;

    #[tokio::test]
    async fn test_feed_to_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let csv_path = dir.path().join("out/signals.csv");
        let log_path = dir.path().join("out/errors.jsonl");

        let messages = feed::read_messages(Cursor::new(FEED))?;
        assert_eq!(messages.len(), 5);

        let extractor = Arc::new(SignalExtractor::new()?);
        let mut signals = CsvSignalWriter::new(&csv_path)?;
        let mut failures = JsonlFailureLog::new(&log_path)?;

        let stats =
            pipeline::run_messages(extractor, messages, 4, &mut signals, &mut failures).await?;

        assert_eq!(stats.received, 5);
        assert_eq!(stats.filtered, 1);
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.rejected.get(&ErrorKind::PriceLogicViolation), Some(&1));
        assert_eq!(
            stats.rejected.get(&ErrorKind::ConfidenceBelowThreshold),
            Some(&1)
        );

        assert_eq!(signals.signal_count()?, 2);
        assert_eq!(failures.failure_count()?, 2);

        let mut reader = csv::Reader::from_path(&csv_path)?;
        let ids: Vec<String> = reader
            .records()
            .map(|record| record.map(|r| r[0].to_string()))
            .collect::<Result<_, _>>()?;
        assert_eq!(ids, vec!["101", "102"]);

        let logged = failures.read_failures()?;
        assert_eq!(logged[0].message_id, 104);
        assert_eq!(logged[1].message_id, 105);
        assert_eq!(logged[1].raw_text, "Gold buy now @4740");
        Ok(())
    }

    #[tokio::test]
    async fn test_second_run_appends() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let csv_path = dir.path().join("signals.csv");
        let extractor = Arc::new(SignalExtractor::new()?);

        for _ in 0..2 {
            let messages = feed::read_messages(Cursor::new(FEED))?;
            let mut signals = CsvSignalWriter::new(&csv_path)?;
            let mut failures = JsonlFailureLog::new(dir.path().join("errors.jsonl"))?;
            pipeline::run_messages(
                Arc::clone(&extractor),
                messages,
                2,
                &mut signals,
                &mut failures,
            )
            .await?;
        }

        assert_eq!(CsvSignalWriter::new(&csv_path)?.signal_count()?, 4);
        Ok(())
    }
}

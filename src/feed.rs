//! Message feed
//!
//! Reads chat messages as JSON lines, one `RawMessage` per line:
//! `{"message_id": 1, "channel_id": "...", "posted_at": "...", "text": "..."}`

use crate::extraction::RawMessage;
use anyhow::{Context, Result};
use log::{info, warn};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Parse every well-formed line; blank lines are ignored, malformed ones logged and skipped
pub fn read_messages(reader: impl BufRead) -> Result<Vec<RawMessage>> {
    let mut messages = Vec::new();
    let mut skipped = 0;

    for (index, raw) in reader.split(b'\n').enumerate() {
        let raw = raw.context("failed to read message feed")?;
        let line = match String::from_utf8(raw) {
            Ok(line) => line,
            Err(e) => {
                skipped += 1;
                warn!("Skipping line {}: not valid UTF-8 ({})", index + 1, e);
                continue;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<RawMessage>(line) {
            Ok(message) => messages.push(message),
            Err(e) => {
                skipped += 1;
                warn!("Skipping malformed message on line {}: {}", index + 1, e);
            }
        }
    }

    if skipped > 0 {
        warn!("Skipped {} malformed feed lines", skipped);
    }
    Ok(messages)
}

/// Read from a file, or from stdin when `source` is `-`
pub fn read_messages_from(source: &str) -> Result<Vec<RawMessage>> {
    let messages = if source == "-" {
        read_messages(io::stdin().lock())?
    } else {
        let path = Path::new(source);
        let file =
            File::open(path).with_context(|| format!("failed to open feed {}", path.display()))?;
        read_messages(BufReader::new(file))?
    };
    info!("Loaded {} messages from {}", messages.len(), source);
    Ok(messages)
}

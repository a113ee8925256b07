//! Data types flowing through the extraction engine
//!
//! `CandidateFields` is the per-call working state built by the matcher.
//! `Signal` and `ExtractionFailure` are the only values handed back to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Provenance metadata supplied with every message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageMeta {
    pub message_id: i64,
    pub channel_id: String,
    pub posted_at: DateTime<Utc>,
}

impl MessageMeta {
    pub fn new(message_id: i64, channel_id: impl Into<String>, posted_at: DateTime<Utc>) -> Self {
        Self {
            message_id,
            channel_id: channel_id.into(),
            posted_at,
        }
    }
}

/// A chat message as delivered by the feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(flatten)]
    pub meta: MessageMeta,
    pub text: String,
}

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry price: a single level or an ordered zone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPrice {
    Single(f64),
    Range { min: f64, max: f64 },
}

impl EntryPrice {
    /// Build an entry from two prices in any written order.
    ///
    /// Equal bounds collapse to `Single` so a `Range` always has `min < max`.
    pub fn from_pair(a: f64, b: f64) -> Self {
        if a == b {
            EntryPrice::Single(a)
        } else {
            EntryPrice::Range {
                min: a.min(b),
                max: a.max(b),
            }
        }
    }

    pub fn low(&self) -> f64 {
        match *self {
            EntryPrice::Single(price) => price,
            EntryPrice::Range { min, .. } => min,
        }
    }

    pub fn high(&self) -> f64 {
        match *self {
            EntryPrice::Single(price) => price,
            EntryPrice::Range { max, .. } => max,
        }
    }

    pub fn midpoint(&self) -> f64 {
        (self.low() + self.high()) / 2.0
    }

    /// Bound a stop-loss must clear: the low edge for BUY, the high edge for SELL
    pub fn stop_reference(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Buy => self.low(),
            Direction::Sell => self.high(),
        }
    }

    /// Bound every take-profit must clear: the high edge for BUY, the low edge for SELL
    pub fn target_reference(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Buy => self.high(),
            Direction::Sell => self.low(),
        }
    }
}

/// Take-profit distance expressed in pips, e.g. "TP 30-100pips"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipTargets {
    pub near: u32,
    pub far: Option<u32>,
}

/// Fields captured from one message; every field may be absent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateFields {
    pub symbol: Option<String>,
    pub direction: Option<Direction>,
    pub entry: Option<EntryPrice>,
    pub stop_loss: Option<f64>,
    pub take_profits: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit_pips: Option<PipTargets>,
    /// True when `take_profits` were computed from `take_profit_pips`
    #[serde(default)]
    pub take_profits_derived: bool,
}

impl CandidateFields {
    pub fn is_empty(&self) -> bool {
        self.symbol.is_none()
            && self.direction.is_none()
            && self.entry.is_none()
            && self.stop_loss.is_none()
            && self.take_profits.is_empty()
            && self.take_profit_pips.is_none()
    }
}

/// Why an extraction was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NoPatternMatch,
    MissingRequiredField,
    PriceLogicViolation,
    SymbolNotAdmissible,
    ConfidenceBelowThreshold,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NoPatternMatch => "no_pattern_match",
            ErrorKind::MissingRequiredField => "missing_required_field",
            ErrorKind::PriceLogicViolation => "price_logic_violation",
            ErrorKind::SymbolNotAdmissible => "symbol_not_admissible",
            ErrorKind::ConfidenceBelowThreshold => "confidence_below_threshold",
        };
        f.write_str(name)
    }
}

/// A validated trade instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub message_id: i64,
    pub channel_id: String,
    pub posted_at: DateTime<Utc>,
    pub symbol: String,
    pub direction: Direction,
    pub entry: EntryPrice,
    pub stop_loss: Option<f64>,
    pub take_profits: Vec<f64>,
    pub confidence: f64,
    pub notes: Option<String>,
    pub extracted_at: DateTime<Utc>,
}

impl Signal {
    /// Take-profit by 1-based level, as written in "tp1", "tp2", ...
    pub fn take_profit(&self, level: usize) -> Option<f64> {
        level
            .checked_sub(1)
            .and_then(|idx| self.take_profits.get(idx))
            .copied()
    }
}

/// A rejected message with everything needed to diagnose it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionFailure {
    pub message_id: i64,
    pub channel_id: String,
    pub posted_at: DateTime<Utc>,
    pub raw_text: String,
    pub fields: CandidateFields,
    #[serde(rename = "error_kind")]
    pub kind: ErrorKind,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Result of one `extract` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    Signal(Signal),
    Failure(ExtractionFailure),
}

impl ExtractionOutcome {
    pub fn is_signal(&self) -> bool {
        matches!(self, ExtractionOutcome::Signal(_))
    }

    pub fn signal(&self) -> Option<&Signal> {
        match self {
            ExtractionOutcome::Signal(signal) => Some(signal),
            ExtractionOutcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ExtractionFailure> {
        match self {
            ExtractionOutcome::Signal(_) => None,
            ExtractionOutcome::Failure(failure) => Some(failure),
        }
    }
}

//! Confidence Scorer
//!
//! Weighted sum over which fields were found. Each field contributes its full
//! weight when present and nothing when absent, except take-profits, which earn
//! partial credit when only a single level was found.

use super::models::CandidateFields;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-field weights; all weights together must sum to 1.0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceWeights {
    pub symbol: f64,
    pub direction: f64,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    /// Share of the score driven by the posting channel's reliability
    #[serde(default)]
    pub channel: f64,
    /// Fraction of `take_profit` credited when exactly one level is found
    #[serde(default = "default_partial_take_profit_credit")]
    pub partial_take_profit_credit: f64,
}

fn default_partial_take_profit_credit() -> f64 {
    0.5
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            symbol: 0.25,
            direction: 0.25,
            entry: 0.20,
            stop_loss: 0.15,
            take_profit: 0.15,
            channel: 0.0,
            partial_take_profit_credit: default_partial_take_profit_credit(),
        }
    }
}

impl ConfidenceWeights {
    fn total(&self) -> f64 {
        self.symbol + self.direction + self.entry + self.stop_loss + self.take_profit + self.channel
    }

    /// Validate weights sum to 1.0 and each lies in [0, 1]
    pub fn validate(&self) -> Result<()> {
        let weights = [
            ("symbol", self.symbol),
            ("direction", self.direction),
            ("entry", self.entry),
            ("stop_loss", self.stop_loss),
            ("take_profit", self.take_profit),
            ("channel", self.channel),
        ];
        if let Some((name, value)) = weights
            .iter()
            .find(|(_, value)| !(0.0..=1.0).contains(value))
        {
            return Err(anyhow::anyhow!(
                "Confidence weight '{}' must be between 0.0 and 1.0, got: {}",
                name,
                value
            ));
        }

        let total = self.total();
        if (total - 1.0).abs() > 0.001 {
            return Err(anyhow::anyhow!(
                "Confidence weights must sum to 1.0, got: {:.3}",
                total
            ));
        }

        if !(0.0..=1.0).contains(&self.partial_take_profit_credit) {
            return Err(anyhow::anyhow!(
                "Partial take profit credit must be between 0.0 and 1.0, got: {}",
                self.partial_take_profit_credit
            ));
        }
        Ok(())
    }
}

/// Score plus advisory notes about what was missing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confidence {
    pub score: f64,
    pub notes: Vec<String>,
}

impl Confidence {
    /// Notes joined for display, or `None` when there is nothing to report
    pub fn joined_notes(&self) -> Option<String> {
        if self.notes.is_empty() {
            None
        } else {
            Some(self.notes.join("; "))
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    weights: ConfidenceWeights,
    channel_reliability: HashMap<String, f64>,
}

impl ConfidenceScorer {
    pub fn new(weights: ConfidenceWeights) -> Result<Self> {
        Self::with_channel_reliability(weights, HashMap::new())
    }

    pub fn with_channel_reliability(
        weights: ConfidenceWeights,
        channel_reliability: HashMap<String, f64>,
    ) -> Result<Self> {
        weights.validate()?;
        if let Some((channel, value)) = channel_reliability
            .iter()
            .find(|(_, value)| !(0.0..=1.0).contains(*value))
        {
            return Err(anyhow::anyhow!(
                "Channel reliability for '{}' must be between 0.0 and 1.0, got: {}",
                channel,
                value
            ));
        }
        Ok(Self {
            weights,
            channel_reliability,
        })
    }

    pub fn weights(&self) -> &ConfidenceWeights {
        &self.weights
    }

    /// Reliability of a channel; unknown channels are fully trusted
    pub fn channel_reliability(&self, channel_id: &str) -> f64 {
        self.channel_reliability
            .get(channel_id)
            .copied()
            .unwrap_or(1.0)
    }

    /// Score `fields`, rounded to two decimals
    pub fn score(&self, fields: &CandidateFields, channel_id: &str) -> Confidence {
        let weights = &self.weights;
        let mut score = 0.0;
        let mut notes = Vec::new();

        if fields.symbol.is_some() {
            score += weights.symbol;
        } else {
            notes.push("No symbol found".to_string());
        }

        if fields.direction.is_some() {
            score += weights.direction;
        } else {
            notes.push("No direction found".to_string());
        }

        if fields.entry.is_some() {
            score += weights.entry;
        } else {
            notes.push("No entry price provided".to_string());
        }

        if fields.stop_loss.is_some() {
            score += weights.stop_loss;
        } else {
            notes.push("No stop loss provided".to_string());
        }

        match fields.take_profits.len() {
            0 => notes.push("No take profit provided".to_string()),
            1 => {
                score += weights.take_profit * weights.partial_take_profit_credit;
                notes.push("Only 1 take profit found".to_string());
            }
            _ => score += weights.take_profit,
        }
        if fields.take_profits_derived {
            notes.push("Take profits derived from pip distance".to_string());
        }

        score += weights.channel * self.channel_reliability(channel_id);

        Confidence {
            score: round_score(score).clamp(0.0, 1.0),
            notes,
        }
    }
}

fn round_score(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}

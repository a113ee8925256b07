//! Signal Extractor
//!
//! Public entry point of the engine. Sequences matcher, scorer and validator
//! and returns exactly one outcome per message. Holds only read-only state, so
//! a single instance can serve any number of concurrent callers.

use super::matcher::PatternMatcher;
use super::models::{
    CandidateFields, ErrorKind, ExtractionFailure, ExtractionOutcome, MessageMeta, RawMessage,
    Signal,
};
use super::normalize::{SymbolAliases, default_symbol_aliases};
use super::patterns::{PatternLibrary, PatternLibrarySpec};
use super::scorer::{ConfidenceScorer, ConfidenceWeights};
use super::validator::{Rejection, SignalValidator};
use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Configuration injected into the extractor at construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    #[serde(default = "default_admissible_symbols")]
    pub admissible_symbols: Vec<String>,
    #[serde(default = "default_symbol_aliases")]
    pub symbol_aliases: SymbolAliases,
    #[serde(default)]
    pub confidence_weights: ConfidenceWeights,
    /// Channel id -> reliability in [0, 1], used by the `channel` weight
    #[serde(default)]
    pub channel_confidence: HashMap<String, f64>,
    #[serde(default)]
    pub patterns: PatternLibrarySpec,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            admissible_symbols: default_admissible_symbols(),
            symbol_aliases: default_symbol_aliases(),
            confidence_weights: ConfidenceWeights::default(),
            channel_confidence: HashMap::new(),
            patterns: PatternLibrarySpec::default(),
        }
    }
}

fn default_min_confidence() -> f64 {
    0.75
}

fn default_admissible_symbols() -> Vec<String> {
    [
        "XAUUSD", "EURUSD", "GBPUSD", "BTCUSD", "USDJPY", "AUDUSD", "USDCAD", "NZDUSD", "USDCHF",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Extraction engine
#[derive(Debug, Clone)]
pub struct SignalExtractor {
    matcher: PatternMatcher,
    scorer: ConfidenceScorer,
    validator: SignalValidator,
}

impl SignalExtractor {
    /// Create extractor with the built-in dialects and reference weighting
    pub fn new() -> Result<Self> {
        Self::with_config(ExtractorConfig::default())
    }

    /// Create extractor from configuration; invalid configuration is refused here
    pub fn with_config(config: ExtractorConfig) -> Result<Self> {
        let library = Arc::new(PatternLibrary::compile(&config.patterns)?);
        let matcher = PatternMatcher::new(library, config.symbol_aliases);
        let scorer = ConfidenceScorer::with_channel_reliability(
            config.confidence_weights,
            config.channel_confidence,
        )?;
        let validator = SignalValidator::new(&config.admissible_symbols, config.min_confidence)?;

        info!(
            "Signal extractor initialized (min_confidence: {:.2}, {} admissible symbols)",
            config.min_confidence,
            config.admissible_symbols.len()
        );

        Ok(Self {
            matcher,
            scorer,
            validator,
        })
    }

    pub fn matcher(&self) -> &PatternMatcher {
        &self.matcher
    }

    pub fn scorer(&self) -> &ConfidenceScorer {
        &self.scorer
    }

    pub fn validator(&self) -> &SignalValidator {
        &self.validator
    }

    /// Quick keyword filter run before any pattern matching
    pub fn is_signal(&self, text: &str) -> bool {
        self.matcher.is_signal(text)
    }

    /// Gate then extract; `None` when the quick filter discards the message
    pub fn process(&self, message: &RawMessage) -> Option<ExtractionOutcome> {
        if !self.is_signal(&message.text) {
            debug!(
                "Message {} (@{}) skipped by keyword filter",
                message.meta.message_id, message.meta.channel_id
            );
            return None;
        }
        Some(self.extract(&message.text, &message.meta))
    }

    /// Run matcher, scorer and validator over one message
    ///
    /// Stamps `extracted_at` with the wall clock, so two calls differ in that
    /// field only. Use [`extract_at`](Self::extract_at) for repeatable output.
    pub fn extract(&self, text: &str, meta: &MessageMeta) -> ExtractionOutcome {
        self.extract_at(text, meta, Utc::now())
    }

    /// As [`extract`](Self::extract) with an explicit extraction timestamp;
    /// identical inputs give identical outcomes
    pub fn extract_at(
        &self,
        text: &str,
        meta: &MessageMeta,
        now: DateTime<Utc>,
    ) -> ExtractionOutcome {
        debug!(
            "Extracting signal from message {} (@{})",
            meta.message_id, meta.channel_id
        );

        let fields = self.matcher.match_fields(text);
        if fields.is_empty() {
            let rejection = Rejection::new(
                ErrorKind::NoPatternMatch,
                "No signal fields recognized in message",
            );
            return self.failure(text, meta, fields, rejection, now);
        }

        let confidence = self.scorer.score(&fields, &meta.channel_id);

        match self.validator.validate(&fields, &confidence) {
            Ok(validated) => {
                info!(
                    "Extracted signal: {} {} (confidence: {:.2})",
                    validated.symbol, validated.direction, confidence.score
                );
                ExtractionOutcome::Signal(Signal {
                    message_id: meta.message_id,
                    channel_id: meta.channel_id.clone(),
                    posted_at: meta.posted_at,
                    symbol: validated.symbol,
                    direction: validated.direction,
                    entry: validated.entry,
                    stop_loss: fields.stop_loss,
                    take_profits: fields.take_profits,
                    confidence: confidence.score,
                    notes: confidence.joined_notes(),
                    extracted_at: now,
                })
            }
            Err(rejection) => self.failure(text, meta, fields, rejection, now),
        }
    }

    fn failure(
        &self,
        text: &str,
        meta: &MessageMeta,
        fields: CandidateFields,
        rejection: Rejection,
        now: DateTime<Utc>,
    ) -> ExtractionOutcome {
        warn!(
            "Extraction failed for message {} (@{}): {}",
            meta.message_id, meta.channel_id, rejection
        );
        ExtractionOutcome::Failure(ExtractionFailure {
            message_id: meta.message_id,
            channel_id: meta.channel_id.clone(),
            posted_at: meta.posted_at,
            raw_text: text.to_string(),
            fields,
            kind: rejection.kind,
            reason: rejection.reason,
            occurred_at: now,
        })
    }
}

/// Builder pattern for extractor configuration
pub struct ExtractorBuilder {
    config: ExtractorConfig,
}

impl ExtractorBuilder {
    pub fn new() -> Self {
        Self {
            config: ExtractorConfig::default(),
        }
    }

    pub fn from_config(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn with_min_confidence(mut self, threshold: f64) -> Self {
        self.config.min_confidence = threshold;
        self
    }

    pub fn with_admissible_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.admissible_symbols = symbols.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_symbol_aliases(mut self, aliases: SymbolAliases) -> Self {
        self.config.symbol_aliases = aliases;
        self
    }

    pub fn with_weights(mut self, weights: ConfidenceWeights) -> Self {
        self.config.confidence_weights = weights;
        self
    }

    pub fn with_channel_confidence(mut self, channel_id: &str, reliability: f64) -> Self {
        self.config
            .channel_confidence
            .insert(channel_id.to_string(), reliability);
        self
    }

    pub fn with_patterns(mut self, patterns: PatternLibrarySpec) -> Self {
        self.config.patterns = patterns;
        self
    }

    pub fn build(self) -> Result<SignalExtractor> {
        SignalExtractor::with_config(self.config)
    }
}

impl Default for ExtractorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

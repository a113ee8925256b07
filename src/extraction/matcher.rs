//! Pattern Matcher
//!
//! Runs every field's pattern list over a message and normalizes the captures
//! into a [`CandidateFields`]. Absence of a match is never an error.

use super::models::{CandidateFields, Direction, EntryPrice, PipTargets};
use super::normalize::{self, SymbolAliases};
use super::patterns::PatternLibrary;
use log::debug;
use std::sync::Arc;

/// Keywords that make a message worth a full extraction attempt
const SIGNAL_KEYWORDS: &[&str] = &["buy", "sell", "entry", "tp", "sl", "stop", "target"];

#[derive(Debug, Clone)]
pub struct PatternMatcher {
    library: Arc<PatternLibrary>,
    aliases: SymbolAliases,
}

impl PatternMatcher {
    pub fn new(library: Arc<PatternLibrary>, aliases: SymbolAliases) -> Self {
        Self { library, aliases }
    }

    /// Cheap keyword gate; false positives are expected and handled downstream
    pub fn is_signal(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        SIGNAL_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
    }

    /// Extract every field the library recognizes in `text`
    pub fn match_fields(&self, text: &str) -> CandidateFields {
        let mut fields = CandidateFields {
            symbol: self.extract_symbol(text),
            direction: self.extract_direction(text),
            entry: self.extract_entry(text),
            stop_loss: self.extract_stop_loss(text),
            take_profits: self.extract_take_profits(text),
            ..CandidateFields::default()
        };

        if fields.take_profits.is_empty() {
            fields.take_profit_pips = self.extract_take_profit_pips(text);
            if let Some(levels) = derive_pip_take_profits(&fields) {
                debug!("Derived take profits from pips: {:?}", levels);
                fields.take_profits = levels;
                fields.take_profits_derived = true;
            }
        }

        fields
    }

    pub fn extract_symbol(&self, text: &str) -> Option<String> {
        let (symbol, pattern) = self
            .library
            .symbol
            .first(text, |caps| Some(self.aliases.normalize(caps[0])))?;
        debug!("Extracted symbol {} via '{}'", symbol, pattern);
        Some(symbol)
    }

    pub fn extract_direction(&self, text: &str) -> Option<Direction> {
        let (direction, pattern) = self
            .library
            .direction
            .first(text, |caps| normalize::parse_direction(caps[0]))?;
        debug!("Extracted direction {} via '{}'", direction, pattern);
        Some(direction)
    }

    /// Range shapes are tried before single-price shapes
    pub fn extract_entry(&self, text: &str) -> Option<EntryPrice> {
        if let Some((entry, pattern)) = self
            .library
            .entry_range
            .first(text, |caps| normalize::parse_entry_range(caps[0], caps[1]))
        {
            debug!("Extracted entry range {:?} via '{}'", entry, pattern);
            return Some(entry);
        }

        let (price, pattern) = self
            .library
            .entry_single
            .first(text, |caps| normalize::parse_price(caps[0]))?;
        debug!("Extracted single entry {} via '{}'", price, pattern);
        Some(EntryPrice::Single(price))
    }

    pub fn extract_stop_loss(&self, text: &str) -> Option<f64> {
        let (price, pattern) = self
            .library
            .stop_loss
            .first(text, |caps| normalize::parse_price(caps[0]))?;
        debug!("Extracted stop loss {} via '{}'", price, pattern);
        Some(price)
    }

    /// Take-profits ordered by their written index; gaps stay gaps
    pub fn extract_take_profits(&self, text: &str) -> Vec<f64> {
        let numbered = self.library.take_profit.all_of_first(text, |caps| {
            Some((
                normalize::parse_take_profit_index(caps[0])?,
                normalize::parse_price(caps[1])?,
            ))
        });

        let (mut levels, pattern) = match numbered {
            Some(found) => found,
            None => {
                let Some((prices, pattern)) = self
                    .library
                    .take_profit_single
                    .all_of_first(text, |caps| normalize::parse_price(caps[0]))
                else {
                    return Vec::new();
                };
                let levels = (1u32..).zip(prices).collect::<Vec<_>>();
                (levels, pattern)
            }
        };

        // Stable sort keeps the first occurrence ahead of a repeated index
        levels.sort_by_key(|(index, _)| *index);
        levels.dedup_by_key(|(index, _)| *index);

        debug!("Extracted take profits {:?} via '{}'", levels, pattern);
        levels.into_iter().map(|(_, price)| price).collect()
    }

    pub fn extract_take_profit_pips(&self, text: &str) -> Option<PipTargets> {
        let (pips, pattern) = self
            .library
            .take_profit_pips
            .first(text, |caps| normalize::parse_pips(caps[0], caps.get(1).copied()))?;
        debug!("Extracted take profit pips {:?} via '{}'", pips, pattern);
        Some(pips)
    }
}

/// Absolute take-profits for a pips-only message
///
/// Distances run from the entry bound the validator checks targets against
/// (range high for BUY, range low for SELL), so derived levels clear the zone.
fn derive_pip_take_profits(fields: &CandidateFields) -> Option<Vec<f64>> {
    let pips = fields.take_profit_pips?;
    let entry = fields.entry?;
    let direction = fields.direction?;
    let symbol = fields.symbol.as_deref().unwrap_or("XAUUSD");
    Some(normalize::take_profits_from_pips(
        entry.target_reference(direction),
        direction,
        pips,
        symbol,
    ))
}

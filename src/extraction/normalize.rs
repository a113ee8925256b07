//! Field normalizers
//!
//! Pure conversions from raw regex captures to typed values.

use super::models::{Direction, EntryPrice, PipTargets};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Alias table mapping alternate spellings to canonical instrument codes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "HashMap<String, String>", into = "HashMap<String, String>")]
pub struct SymbolAliases {
    // Keys are stored uppercased so lookups are case-insensitive
    aliases: HashMap<String, String>,
}

impl SymbolAliases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, alias: &str, canonical: &str) {
        self.aliases
            .insert(alias.trim().to_uppercase(), canonical.trim().to_uppercase());
    }

    pub fn with_alias(mut self, alias: &str, canonical: &str) -> Self {
        self.insert(alias, canonical);
        self
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Canonical code for `raw`; unknown symbols pass through uppercased
    pub fn normalize(&self, raw: &str) -> String {
        let key = raw.trim().to_uppercase();
        match self.aliases.get(&key) {
            Some(canonical) => canonical.clone(),
            None => key,
        }
    }
}

impl From<HashMap<String, String>> for SymbolAliases {
    fn from(map: HashMap<String, String>) -> Self {
        let mut aliases = SymbolAliases::new();
        for (alias, canonical) in &map {
            aliases.insert(alias, canonical);
        }
        aliases
    }
}

impl From<SymbolAliases> for HashMap<String, String> {
    fn from(aliases: SymbolAliases) -> Self {
        aliases.aliases
    }
}

pub fn default_symbol_aliases() -> SymbolAliases {
    SymbolAliases::new()
        .with_alias("GOLD", "XAUUSD")
        .with_alias("XAU/USD", "XAUUSD")
        .with_alias("XAUUSD", "XAUUSD")
        .with_alias("EUR/USD", "EURUSD")
        .with_alias("GBP/USD", "GBPUSD")
        .with_alias("BTC/USD", "BTCUSD")
}

/// Map "buy", "Sell", "BUY NOW", ... to a direction
pub fn parse_direction(raw: &str) -> Option<Direction> {
    let lowered = raw.trim().to_lowercase();
    let token = match lowered.strip_suffix("now") {
        Some(rest) => rest.trim_end(),
        None => lowered.as_str(),
    };
    match token {
        "buy" => Some(Direction::Buy),
        "sell" => Some(Direction::Sell),
        _ => None,
    }
}

/// Parse an integer or decimal price; non-positive values are rejected
pub fn parse_price(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|price| price.is_finite() && *price > 0.0)
}

pub fn parse_entry_range(a: &str, b: &str) -> Option<EntryPrice> {
    Some(EntryPrice::from_pair(parse_price(a)?, parse_price(b)?))
}

pub fn parse_take_profit_index(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok()
}

pub fn parse_pips(near: &str, far: Option<&str>) -> Option<PipTargets> {
    let near: u32 = near.trim().parse().ok()?;
    let far = match far {
        Some(raw) => Some(raw.trim().parse::<u32>().ok()?),
        None => None,
    };
    Some(match far {
        Some(far) if far != near => PipTargets {
            near: near.min(far),
            far: Some(near.max(far)),
        },
        _ => PipTargets { near, far: None },
    })
}

/// Price size of one pip for `symbol`
pub fn pip_size(symbol: &str) -> f64 {
    if symbol == "XAUUSD" || symbol == "GOLD" {
        0.1
    } else if symbol.contains("JPY") {
        0.01
    } else {
        0.0001
    }
}

/// Decimal places quoted for `symbol`: one past the pip (the pipette)
pub fn price_decimals(symbol: &str) -> i32 {
    if symbol == "XAUUSD" || symbol == "GOLD" {
        2
    } else if symbol.contains("JPY") {
        3
    } else {
        5
    }
}

pub fn round_to_decimals(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Convert pip distances into absolute take-profit prices, rounded to the symbol's quote precision
pub fn take_profits_from_pips(
    entry_reference: f64,
    direction: Direction,
    pips: PipTargets,
    symbol: &str,
) -> Vec<f64> {
    let size = pip_size(symbol);
    let decimals = price_decimals(symbol);
    let sign = match direction {
        Direction::Buy => 1.0,
        Direction::Sell => -1.0,
    };
    std::iter::once(pips.near)
        .chain(pips.far)
        .map(|distance| {
            round_to_decimals(entry_reference + sign * distance as f64 * size, decimals)
        })
        .collect()
}

//! Signal validation
//!
//! Business rules applied after scoring. Any failed rule rejects the whole
//! candidate; nothing is dropped or corrected silently.
//!
//! Range entries are checked against the bound facing the level under test:
//! a BUY stop must sit below the range low and every BUY target above the
//! range high (mirrored for SELL), so no level may fall inside the zone.

use super::models::{CandidateFields, Direction, EntryPrice, ErrorKind};
use super::scorer::Confidence;
use anyhow::Result;
use log::warn;
use std::collections::BTreeSet;
use std::fmt;

/// Why a candidate was refused
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub kind: ErrorKind,
    pub reason: String,
}

impl Rejection {
    pub fn new(kind: ErrorKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.reason)
    }
}

/// Required fields, unwrapped once every rule has passed
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedFields {
    pub symbol: String,
    pub direction: Direction,
    pub entry: EntryPrice,
}

#[derive(Debug, Clone)]
pub struct SignalValidator {
    admissible_symbols: BTreeSet<String>,
    min_confidence: f64,
}

impl SignalValidator {
    pub fn new<I, S>(admissible_symbols: I, min_confidence: f64) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let admissible_symbols: BTreeSet<String> = admissible_symbols
            .into_iter()
            .map(|symbol| symbol.as_ref().trim().to_uppercase())
            .filter(|symbol| !symbol.is_empty())
            .collect();

        if admissible_symbols.is_empty() {
            return Err(anyhow::anyhow!("Admissible symbol set must not be empty"));
        }
        if !(0.0..=1.0).contains(&min_confidence) {
            return Err(anyhow::anyhow!(
                "Minimum confidence must be between 0.0 and 1.0, got: {}",
                min_confidence
            ));
        }

        Ok(Self {
            admissible_symbols,
            min_confidence,
        })
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    pub fn is_admissible(&self, symbol: &str) -> bool {
        self.admissible_symbols.contains(symbol)
    }

    /// Apply every rule in order; the first failure wins
    pub fn validate(
        &self,
        fields: &CandidateFields,
        confidence: &Confidence,
    ) -> Result<ValidatedFields, Rejection> {
        let validated = self.check_required_fields(fields)?;

        if !self.is_admissible(&validated.symbol) {
            return Err(Rejection::new(
                ErrorKind::SymbolNotAdmissible,
                format!("Symbol {} is not in the admissible set", validated.symbol),
            ));
        }

        check_entry_range(&validated.entry)?;
        check_stop_loss(&validated, fields.stop_loss)?;
        check_take_profits(&validated, &fields.take_profits)?;
        warn_on_take_profit_order(validated.direction, &fields.take_profits);

        if confidence.score < self.min_confidence {
            return Err(Rejection::new(
                ErrorKind::ConfidenceBelowThreshold,
                format!(
                    "Confidence score ({:.2}) below threshold ({:.2})",
                    confidence.score, self.min_confidence
                ),
            ));
        }

        Ok(validated)
    }

    fn check_required_fields(&self, fields: &CandidateFields) -> Result<ValidatedFields, Rejection> {
        let missing = |name: &str| {
            Rejection::new(
                ErrorKind::MissingRequiredField,
                format!("Missing required field: {}", name),
            )
        };

        let symbol = fields.symbol.clone().ok_or_else(|| missing("symbol"))?;
        let direction = fields.direction.ok_or_else(|| missing("direction"))?;
        let entry = fields.entry.ok_or_else(|| missing("entry"))?;

        Ok(ValidatedFields {
            symbol,
            direction,
            entry,
        })
    }
}

fn check_entry_range(entry: &EntryPrice) -> Result<(), Rejection> {
    if let EntryPrice::Range { min, max } = *entry {
        if min >= max {
            return Err(Rejection::new(
                ErrorKind::PriceLogicViolation,
                format!("Entry min ({}) should be less than max ({})", min, max),
            ));
        }
    }
    Ok(())
}

fn check_stop_loss(signal: &ValidatedFields, stop_loss: Option<f64>) -> Result<(), Rejection> {
    let Some(stop_loss) = stop_loss else {
        return Ok(());
    };
    let reference = signal.entry.stop_reference(signal.direction);

    let misplaced = match signal.direction {
        Direction::Buy => stop_loss >= reference,
        Direction::Sell => stop_loss <= reference,
    };
    if misplaced {
        let side = match signal.direction {
            Direction::Buy => "below",
            Direction::Sell => "above",
        };
        return Err(Rejection::new(
            ErrorKind::PriceLogicViolation,
            format!(
                "{} signal: Stop loss ({}) should be {} entry ({})",
                signal.direction, stop_loss, side, reference
            ),
        ));
    }
    Ok(())
}

fn check_take_profits(signal: &ValidatedFields, take_profits: &[f64]) -> Result<(), Rejection> {
    let reference = signal.entry.target_reference(signal.direction);

    for (i, &tp) in take_profits.iter().enumerate() {
        let misplaced = match signal.direction {
            Direction::Buy => tp <= reference,
            Direction::Sell => tp >= reference,
        };
        if misplaced {
            let side = match signal.direction {
                Direction::Buy => "above",
                Direction::Sell => "below",
            };
            return Err(Rejection::new(
                ErrorKind::PriceLogicViolation,
                format!(
                    "{} signal: TP{} ({}) should be {} entry ({})",
                    signal.direction,
                    i + 1,
                    tp,
                    side,
                    reference
                ),
            ));
        }
    }
    Ok(())
}

/// Targets normally move away from entry; anything else is only worth a warning
fn warn_on_take_profit_order(direction: Direction, take_profits: &[f64]) {
    for (i, pair) in take_profits.windows(2).enumerate() {
        let unusual = match direction {
            Direction::Buy => pair[1] <= pair[0],
            Direction::Sell => pair[1] >= pair[0],
        };
        if unusual {
            warn!(
                "{} signal: TP ordering unusual (TP{}={}, TP{}={})",
                direction,
                i + 1,
                pair[0],
                i + 2,
                pair[1]
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(min_confidence: f64) -> SignalValidator {
        SignalValidator::new(["XAUUSD", "EURUSD"], min_confidence).unwrap()
    }

    fn confident() -> Confidence {
        Confidence {
            score: 1.0,
            notes: Vec::new(),
        }
    }

    fn fields(direction: Direction, entry: EntryPrice, sl: Option<f64>, tps: &[f64]) -> CandidateFields {
        CandidateFields {
            symbol: Some("XAUUSD".to_string()),
            direction: Some(direction),
            entry: Some(entry),
            stop_loss: sl,
            take_profits: tps.to_vec(),
            ..CandidateFields::default()
        }
    }

    #[test]
    fn test_valid_sell_range() {
        let candidate = fields(
            Direction::Sell,
            EntryPrice::from_pair(4746.5, 4750.5),
            Some(4752.5),
            &[4730.0, 4720.0],
        );
        let validated = validator(0.75).validate(&candidate, &confident()).unwrap();
        assert_eq!(validated.symbol, "XAUUSD");
        assert_eq!(validated.direction, Direction::Sell);
    }

    #[test]
    fn test_missing_direction_is_hard_failure() {
        let mut candidate = fields(Direction::Buy, EntryPrice::Single(4740.0), None, &[]);
        candidate.direction = None;
        let rejection = validator(0.0).validate(&candidate, &confident()).unwrap_err();
        assert_eq!(rejection.kind, ErrorKind::MissingRequiredField);
        assert!(rejection.reason.contains("direction"));
    }

    #[test]
    fn test_missing_symbol_is_hard_failure() {
        let mut candidate = fields(Direction::Buy, EntryPrice::Single(4740.0), None, &[]);
        candidate.symbol = None;
        let rejection = validator(0.0).validate(&candidate, &confident()).unwrap_err();
        assert_eq!(rejection.kind, ErrorKind::MissingRequiredField);
    }

    #[test]
    fn test_symbol_must_be_admissible() {
        let mut candidate = fields(Direction::Buy, EntryPrice::Single(150.0), None, &[]);
        candidate.symbol = Some("USDJPY".to_string());
        let rejection = validator(0.0).validate(&candidate, &confident()).unwrap_err();
        assert_eq!(rejection.kind, ErrorKind::SymbolNotAdmissible);
    }

    #[test]
    fn test_buy_stop_above_entry_rejected() {
        let candidate = fields(Direction::Buy, EntryPrice::Single(4740.0), Some(4745.0), &[4750.0]);
        let rejection = validator(0.0).validate(&candidate, &confident()).unwrap_err();
        assert_eq!(rejection.kind, ErrorKind::PriceLogicViolation);
    }

    #[test]
    fn test_stop_equal_to_entry_rejected() {
        let candidate = fields(Direction::Sell, EntryPrice::Single(4740.0), Some(4740.0), &[]);
        let rejection = validator(0.0).validate(&candidate, &confident()).unwrap_err();
        assert_eq!(rejection.kind, ErrorKind::PriceLogicViolation);
    }

    #[test]
    fn test_single_bad_take_profit_fails_whole_signal() {
        let candidate = fields(
            Direction::Sell,
            EntryPrice::Single(4740.0),
            Some(4750.0),
            &[4730.0, 4745.0],
        );
        let rejection = validator(0.0).validate(&candidate, &confident()).unwrap_err();
        assert_eq!(rejection.kind, ErrorKind::PriceLogicViolation);
        assert!(rejection.reason.contains("TP2"));
    }

    #[test]
    fn test_range_levels_must_clear_the_facing_bound() {
        // 4928 is above the midpoint (4927.5) but inside the zone
        let inside = fields(
            Direction::Buy,
            EntryPrice::from_pair(4930.0, 4925.0),
            Some(4922.0),
            &[4928.0],
        );
        let rejection = validator(0.0).validate(&inside, &confident()).unwrap_err();
        assert_eq!(rejection.kind, ErrorKind::PriceLogicViolation);

        // Stop inside the zone is equally refused
        let stop_inside = fields(
            Direction::Buy,
            EntryPrice::from_pair(4930.0, 4925.0),
            Some(4926.0),
            &[4935.0],
        );
        let rejection = validator(0.0).validate(&stop_inside, &confident()).unwrap_err();
        assert_eq!(rejection.kind, ErrorKind::PriceLogicViolation);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let candidate = fields(
            Direction::Buy,
            EntryPrice::Range {
                min: 4930.0,
                max: 4925.0,
            },
            None,
            &[],
        );
        let rejection = validator(0.0).validate(&candidate, &confident()).unwrap_err();
        assert_eq!(rejection.kind, ErrorKind::PriceLogicViolation);
    }

    #[test]
    fn test_confidence_threshold_checked_last() {
        let candidate = fields(Direction::Buy, EntryPrice::Single(4740.0), None, &[]);
        let low = Confidence {
            score: 0.6,
            notes: Vec::new(),
        };
        let rejection = validator(0.75).validate(&candidate, &low).unwrap_err();
        assert_eq!(rejection.kind, ErrorKind::ConfidenceBelowThreshold);
        assert!(validator(0.6).validate(&candidate, &low).is_ok());
    }

    #[test]
    fn test_unordered_take_profits_only_warn() {
        let candidate = fields(
            Direction::Buy,
            EntryPrice::Single(4740.0),
            Some(4730.0),
            &[4760.0, 4750.0],
        );
        assert!(validator(0.0).validate(&candidate, &confident()).is_ok());
    }

    #[test]
    fn test_construction_contract() {
        assert!(SignalValidator::new(Vec::<String>::new(), 0.75).is_err());
        assert!(SignalValidator::new(["XAUUSD"], 1.5).is_err());
        let v = SignalValidator::new(["xauusd"], 0.5).unwrap();
        assert!(v.is_admissible("XAUUSD"));
        assert_eq!(v.min_confidence(), 0.5);
    }
}

//! Field Pattern Library
//!
//! Each field owns an ordered list of declarative [`PatternSpec`]s, most
//! channel-specific first. A single generic routine walks the list and the
//! first pattern that produces a usable capture wins; later patterns are
//! never consulted. Specs are plain data (serde) so new channel dialects can
//! be added from configuration without touching the matcher.

use anyhow::{Context, Result, anyhow};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

// Character classes for the variants chat clients produce
const DASH: &str = "[-–—−]";
const DASH_CHARS: &str = "-–—−";
const COLON: &str = "[:：]";
const AT_SIGN: &str = "[@＠]";
// Whitespace that does not cross a line break
const HS: &str = r"[^\S\r\n]";
const NUM: &str = r"(\d+(?:\.\d+)?)";

/// One textual shape for a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSpec {
    pub name: String,
    pub pattern: String,
    /// Capture group positions, in the order the field expects them
    pub captures: Vec<usize>,
    #[serde(default)]
    pub case_sensitive: bool,
    /// Reject a match whose next character is one of these
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub not_followed_by: String,
}

impl PatternSpec {
    pub fn new(name: &str, pattern: impl Into<String>, captures: &[usize]) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.into(),
            captures: captures.to_vec(),
            case_sensitive: false,
            not_followed_by: String::new(),
        }
    }

    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }

    pub fn not_followed_by(mut self, chars: &str) -> Self {
        self.not_followed_by = chars.to_string();
        self
    }
}

/// Declarative pattern lists for every field; omitted fields keep the built-in lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternLibrarySpec {
    pub symbol: Vec<PatternSpec>,
    pub direction: Vec<PatternSpec>,
    pub entry_range: Vec<PatternSpec>,
    pub entry_single: Vec<PatternSpec>,
    pub stop_loss: Vec<PatternSpec>,
    pub take_profit: Vec<PatternSpec>,
    pub take_profit_single: Vec<PatternSpec>,
    pub take_profit_pips: Vec<PatternSpec>,
}

impl Default for PatternLibrarySpec {
    fn default() -> Self {
        let sep = format!(r"(?:{HS}*{COLON}{HS}*|{HS}+)");

        Self {
            symbol: vec![
                PatternSpec::new("gold", r"\b(gold)\b", &[1]),
                PatternSpec::new("xauusd", r"\b(xau/?usd)\b", &[1]),
                PatternSpec::new("slash_pair", r"\b([a-z]{3}/[a-z]{3})\b", &[1]),
                PatternSpec::new("compact_pair", r"\b([A-Z]{6})\b", &[1]).case_sensitive(),
            ],
            direction: vec![
                PatternSpec::new("now", format!(r"\b((?:buy|sell){HS}+now)\b"), &[1]),
                PatternSpec::new("again", format!(r"\b(buy|sell){HS}+again\b"), &[1]),
                PatternSpec::new("gold", format!(r"\b(buy|sell){HS}+gold\b"), &[1]),
                PatternSpec::new("bare", r"\b(buy|sell)\b", &[1]),
            ],
            entry_range: vec![
                PatternSpec::new(
                    "at_range",
                    format!(r"{AT_SIGN}{HS}*{NUM}{HS}*{DASH}{HS}*{NUM}"),
                    &[1, 2],
                ),
                PatternSpec::new(
                    "direction_range",
                    format!(
                        r"\b(?:buy|sell){HS}+(?:now{HS}+)?(?:again{HS}+)?{NUM}{HS}*{DASH}{HS}*{NUM}"
                    ),
                    &[1, 2],
                ),
            ],
            entry_single: vec![
                PatternSpec::new("at_price", format!(r"{AT_SIGN}{HS}*{NUM}"), &[1])
                    .not_followed_by(DASH_CHARS),
                PatternSpec::new(
                    "direction_price",
                    format!(r"\b(?:buy|sell){HS}+(?:now{HS}+)?{NUM}"),
                    &[1],
                )
                .not_followed_by(DASH_CHARS),
            ],
            stop_loss: vec![
                PatternSpec::new("sl_colon", format!(r"\bsl{HS}*{COLON}{HS}*{NUM}"), &[1]),
                PatternSpec::new("sl_space", format!(r"\bsl{HS}+{NUM}"), &[1])
                    .not_followed_by(":："),
                PatternSpec::new("si_colon", format!(r"\bsi{HS}*{COLON}{HS}*{NUM}"), &[1]),
                PatternSpec::new("si_space", format!(r"\bsi{HS}+{NUM}"), &[1])
                    .not_followed_by(":："),
                PatternSpec::new(
                    "stop_loss",
                    format!(r"\bstop\W*loss{HS}*{COLON}?{HS}*{NUM}"),
                    &[1],
                ),
                PatternSpec::new("stop_colon", format!(r"\bstop{HS}*{COLON}{HS}*{NUM}"), &[1]),
                PatternSpec::new("stop_space", format!(r"\bstop{HS}+{NUM}"), &[1])
                    .not_followed_by(":："),
                PatternSpec::new(
                    "stop_numbered",
                    format!(r"\bstop{HS}*(\d{{1,2}}){sep}{NUM}"),
                    &[2],
                ),
                PatternSpec::new("sl_numbered", format!(r"\bsl{HS}*(\d{{1,2}}){sep}{NUM}"), &[2]),
            ],
            take_profit: vec![
                PatternSpec::new("tp", format!(r"\btp{HS}*(\d{{1,2}}){sep}{NUM}"), &[1, 2]),
                PatternSpec::new(
                    "target",
                    format!(r"\btarget{HS}*(\d{{1,2}}){sep}{NUM}"),
                    &[1, 2],
                ),
                PatternSpec::new("t", format!(r"\bt{HS}*(\d{{1,2}}){sep}{NUM}"), &[1, 2]),
                PatternSpec::new(
                    "take_profit",
                    format!(r"\btake\W*profit{HS}*(\d{{1,2}}){sep}{NUM}"),
                    &[1, 2],
                ),
            ],
            take_profit_single: vec![
                PatternSpec::new("tp_colon", format!(r"\btp{HS}*{COLON}{HS}*{NUM}"), &[1]),
                PatternSpec::new("target_colon", format!(r"\btarget{HS}*{COLON}{HS}*{NUM}"), &[1]),
                PatternSpec::new("t_colon", format!(r"\bt{COLON}{HS}*{NUM}"), &[1]),
                PatternSpec::new(
                    "take_profit",
                    format!(r"\btake\W*profit{HS}*{COLON}?{HS}*{NUM}"),
                    &[1],
                ),
            ],
            take_profit_pips: vec![
                PatternSpec::new(
                    "pips_range",
                    format!(r"\btp{HS}+(\d+){HS}*{DASH}{HS}*(\d+){HS}*pips?\b"),
                    &[1, 2],
                ),
                PatternSpec::new("pips", format!(r"\btp{HS}+(\d+){HS}*pips?\b"), &[1]),
            ],
        }
    }
}

/// A compiled [`PatternSpec`]
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    spec: PatternSpec,
    regex: Regex,
}

impl CompiledPattern {
    pub fn compile(spec: &PatternSpec) -> Result<Self> {
        let regex = RegexBuilder::new(&spec.pattern)
            .case_insensitive(!spec.case_sensitive)
            .build()
            .with_context(|| format!("invalid pattern '{}': {}", spec.name, spec.pattern))?;

        if spec.captures.is_empty() {
            return Err(anyhow!("pattern '{}' declares no captures", spec.name));
        }
        // captures_len counts the implicit whole-match group 0
        if let Some(bad) = spec.captures.iter().find(|&&idx| idx >= regex.captures_len()) {
            return Err(anyhow!(
                "pattern '{}' refers to capture {} but has only {} groups",
                spec.name,
                bad,
                regex.captures_len() - 1
            ));
        }

        Ok(Self {
            spec: spec.clone(),
            regex,
        })
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Raw captures of every accepted match, in text order
    pub fn captures_in<'t>(&self, text: &'t str) -> impl Iterator<Item = Vec<&'t str>> {
        self.regex.captures_iter(text).filter_map(move |caps| {
            let whole = caps.get(0)?;
            let next = text[whole.end()..].chars().next();
            if next.is_some_and(|c| self.spec.not_followed_by.contains(c)) {
                return None;
            }
            self.spec
                .captures
                .iter()
                .map(|&idx| caps.get(idx).map(|m| m.as_str()))
                .collect::<Option<Vec<_>>>()
        })
    }
}

/// Ordered, compiled patterns for one field
#[derive(Debug, Clone)]
pub struct FieldPatterns {
    field: &'static str,
    patterns: Vec<CompiledPattern>,
}

impl FieldPatterns {
    fn compile(field: &'static str, specs: &[PatternSpec], arities: &[usize]) -> Result<Self> {
        let patterns = specs
            .iter()
            .map(|spec| {
                if !arities.contains(&spec.captures.len()) {
                    return Err(anyhow!(
                        "{} pattern '{}' must declare {:?} captures, got {}",
                        field,
                        spec.name,
                        arities,
                        spec.captures.len()
                    ));
                }
                CompiledPattern::compile(spec)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { field, patterns })
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// First-match-wins: the first pattern, in order, with a convertible capture
    ///
    /// Returns the converted value and the name of the pattern that produced it.
    pub fn first<T>(
        &self,
        text: &str,
        convert: impl Fn(&[&str]) -> Option<T>,
    ) -> Option<(T, &str)> {
        self.patterns.iter().find_map(|pattern| {
            pattern
                .captures_in(text)
                .find_map(|caps| convert(&caps))
                .map(|value| (value, pattern.name()))
        })
    }

    /// Every convertible match of the first pattern that has at least one
    pub fn all_of_first<T>(
        &self,
        text: &str,
        convert: impl Fn(&[&str]) -> Option<T>,
    ) -> Option<(Vec<T>, &str)> {
        self.patterns.iter().find_map(|pattern| {
            let values: Vec<T> = pattern
                .captures_in(text)
                .filter_map(|caps| convert(&caps))
                .collect();
            if values.is_empty() {
                None
            } else {
                Some((values, pattern.name()))
            }
        })
    }
}

/// Compiled library shared read-only by every extraction call
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    pub symbol: FieldPatterns,
    pub direction: FieldPatterns,
    pub entry_range: FieldPatterns,
    pub entry_single: FieldPatterns,
    pub stop_loss: FieldPatterns,
    pub take_profit: FieldPatterns,
    pub take_profit_single: FieldPatterns,
    pub take_profit_pips: FieldPatterns,
}

impl PatternLibrary {
    pub fn compile(spec: &PatternLibrarySpec) -> Result<Self> {
        Ok(Self {
            symbol: FieldPatterns::compile("symbol", &spec.symbol, &[1])?,
            direction: FieldPatterns::compile("direction", &spec.direction, &[1])?,
            entry_range: FieldPatterns::compile("entry_range", &spec.entry_range, &[2])?,
            entry_single: FieldPatterns::compile("entry_single", &spec.entry_single, &[1])?,
            stop_loss: FieldPatterns::compile("stop_loss", &spec.stop_loss, &[1])?,
            take_profit: FieldPatterns::compile("take_profit", &spec.take_profit, &[2])?,
            take_profit_single: FieldPatterns::compile(
                "take_profit_single",
                &spec.take_profit_single,
                &[1],
            )?,
            take_profit_pips: FieldPatterns::compile(
                "take_profit_pips",
                &spec.take_profit_pips,
                &[1, 2],
            )?,
        })
    }

    /// Library for the built-in channel dialects
    pub fn standard() -> Result<Self> {
        Self::compile(&PatternLibrarySpec::default())
    }
}

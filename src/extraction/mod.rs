//! Signal Extraction Engine
//!
//! Turns free-text channel messages into validated trade signals:
//! pattern library -> matcher -> confidence scorer -> validator, sequenced by
//! [`SignalExtractor`]. Every stage is a pure function of its inputs.

pub mod extractor;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod patterns;
pub mod scorer;
pub mod validator;

// Re-export the types callers need most
pub use extractor::{ExtractorBuilder, ExtractorConfig, SignalExtractor};
pub use models::{
    CandidateFields, Direction, EntryPrice, ErrorKind, ExtractionFailure, ExtractionOutcome,
    MessageMeta, RawMessage, Signal,
};
pub use normalize::SymbolAliases;
pub use patterns::{PatternLibrary, PatternLibrarySpec, PatternSpec};
pub use scorer::{Confidence, ConfidenceWeights};

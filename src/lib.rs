//! Signal extractor - structured trade signals from free-text channel messages
//!
//! - `extraction`: the pure engine (patterns, matcher, scorer, validator)
//! - `storage`: CSV and JSON-lines sinks for outcomes
//! - `feed` / `pipeline`: message input and the concurrent runner

pub mod config;
pub mod extraction;
pub mod feed;
pub mod pipeline;
pub mod storage;

pub use extraction::{ExtractionOutcome, ExtractorBuilder, SignalExtractor};

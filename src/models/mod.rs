// src/models/mod.rs
pub mod matching;
pub mod records;
pub mod stats_models;

pub use matching::{FieldScore, MatchBucket, MatchResult, MatchStatus, MatchType};
pub use records::{ExternalRecord, InternalRecord, TrackingKey};

// src/matching/mod.rs
pub mod confidence;
pub mod field_comparators;
pub mod scorer;
pub mod selector;
pub mod string_metrics;
pub mod suggestions;

// Re-export the main entry points for a clean API
pub use confidence::{classify, ConfidenceLevel};
pub use scorer::{score_external_internal, score_internal_internal, RecordScorer, WeightedRecordScorer};
pub use selector::{find_best_matches, BestMatchSelector, Selection};
pub use suggestions::{find_duplicate_internals, suggest_matches, DuplicatePair};

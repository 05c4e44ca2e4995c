// src/models/stats_models.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::matching::confidence::ConfidenceLevel;
use crate::models::matching::MatchResult;

/// Which matching operation produced a set of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchMode {
    Auto,
    Suggest,
    Duplicate,
    Manual,
}

/// Counters gathered while scoring candidate pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionStats {
    pub pairs_scored: usize,
    pub pairs_failed: usize,
    pub pairs_above_threshold: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRunStats {
    pub run_id: String,
    pub mode: MatchMode,
    pub externals_total: usize,
    pub internals_total: usize,
    pub matches_found: usize,
    pub matches_persisted: usize,
    pub pairs_scored: usize,
    pub pairs_failed: usize,
    pub pairs_above_threshold: usize,
    pub avg_score: f64,
    pub by_confidence: BTreeMap<String, usize>,
    pub duration_secs: f64,
}

impl MatchRunStats {
    pub fn new(run_id: &str, mode: MatchMode, externals_total: usize, internals_total: usize) -> Self {
        Self {
            run_id: run_id.to_string(),
            mode,
            externals_total,
            internals_total,
            matches_found: 0,
            matches_persisted: 0,
            pairs_scored: 0,
            pairs_failed: 0,
            pairs_above_threshold: 0,
            avg_score: 0.0,
            by_confidence: BTreeMap::new(),
            duration_secs: 0.0,
        }
    }

    /// Folds the selector output into the run counters.
    pub fn record_results(&mut self, results: &[MatchResult], selection: &SelectionStats) {
        self.matches_found = results.len();
        self.pairs_scored = selection.pairs_scored;
        self.pairs_failed = selection.pairs_failed;
        self.pairs_above_threshold = selection.pairs_above_threshold;
        self.avg_score = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.aggregate_score).sum::<f64>() / results.len() as f64
        };

        self.by_confidence = ConfidenceLevel::all()
            .iter()
            .map(|level| {
                let count = results.iter().filter(|r| r.confidence == *level).count();
                (level.as_str().to_string(), count)
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::matching::{MatchType, PairScore};
    use crate::models::records::{ExternalRecord, InternalRecord};

    fn result_with_score(score: f64) -> MatchResult {
        let pair_score = PairScore {
            score,
            field_scores: Vec::new(),
        };
        MatchResult::new(
            &ExternalRecord::default(),
            &InternalRecord::default(),
            pair_score,
            MatchType::Auto,
        )
    }

    #[test]
    fn test_record_results_aggregates() {
        let results = vec![result_with_score(100.0), result_with_score(85.0), result_with_score(82.0)];
        let selection = SelectionStats {
            pairs_scored: 12,
            pairs_failed: 1,
            pairs_above_threshold: 4,
        };

        let mut stats = MatchRunStats::new("run-1", MatchMode::Auto, 3, 4);
        stats.record_results(&results, &selection);

        assert_eq!(stats.matches_found, 3);
        assert_eq!(stats.pairs_scored, 12);
        assert_eq!(stats.pairs_failed, 1);
        assert_eq!(stats.pairs_above_threshold, 4);
        assert!((stats.avg_score - 89.0).abs() < 1e-9);
        assert_eq!(stats.by_confidence["High"], 1);
        assert_eq!(stats.by_confidence["Medium"], 2);
        assert_eq!(stats.by_confidence["Very Low"], 0);
    }

    #[test]
    fn test_record_results_empty() {
        let mut stats = MatchRunStats::new("run-2", MatchMode::Duplicate, 0, 0);
        stats.record_results(&[], &SelectionStats::default());
        assert_eq!(stats.avg_score, 0.0);
        assert_eq!(stats.matches_found, 0);
    }
}

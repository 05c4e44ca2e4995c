// src/matching/selector.rs - Greedy one-to-one best-match selection
use anyhow::{bail, Result};
use std::collections::HashSet;

use crate::matching::scorer::{RecordScorer, WeightedRecordScorer};
use crate::models::matching::{MatchCandidate, MatchResult, MatchType, PairScore};
use crate::models::records::{ExternalRecord, InternalRecord, TrackingKey};
use crate::models::stats_models::{MatchMode, SelectionStats};
use crate::utils::progress_bars::logging::MatchingLogger;

pub const DEFAULT_AUTO_MATCH_THRESHOLD: f64 = 80.0;

/// Matches chosen by one selector run together with the scoring counters.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub matches: Vec<MatchResult>,
    pub stats: SelectionStats,
}

/// Thresholds are on the 0-100 score scale.
pub fn validate_threshold(threshold: f64) -> Result<()> {
    if !threshold.is_finite() || !(0.0..=100.0).contains(&threshold) {
        bail!("match threshold must be within [0, 100], got {}", threshold);
    }
    Ok(())
}

/// Assigns each external record to its best unused internal record.
///
/// Externals are processed in input order and an internal record, once
/// claimed, is unavailable to every later external. The outcome therefore
/// depends on input order and is not a globally optimal assignment.
pub struct BestMatchSelector<S: RecordScorer = WeightedRecordScorer> {
    scorer: S,
    logger: MatchingLogger,
}

impl Default for BestMatchSelector<WeightedRecordScorer> {
    fn default() -> Self {
        Self::new(WeightedRecordScorer)
    }
}

impl<S: RecordScorer> BestMatchSelector<S> {
    pub fn new(scorer: S) -> Self {
        Self {
            scorer,
            logger: MatchingLogger::new(MatchMode::Auto),
        }
    }

    pub fn select(
        &self,
        externals: &[ExternalRecord],
        internals: &[InternalRecord],
        threshold: f64,
    ) -> Result<Selection> {
        validate_threshold(threshold)?;
        self.logger.log_start(externals.len(), internals.len(), threshold);

        let mut selection = Selection::default();
        if externals.is_empty() || internals.is_empty() {
            self.logger.log_completion(0, 0, 0);
            return Ok(selection);
        }

        let keys: Vec<TrackingKey> = internals
            .iter()
            .enumerate()
            .map(|(idx, record)| record.tracking_key(idx))
            .collect();
        let mut used_keys: HashSet<&TrackingKey> = HashSet::new();

        for (external_index, external) in externals.iter().enumerate() {
            let mut best: Option<MatchCandidate> = None;

            for (internal_index, internal) in internals.iter().enumerate() {
                let key = &keys[internal_index];
                if used_keys.contains(key) {
                    continue;
                }

                selection.stats.pairs_scored += 1;
                let pair_score = match self.scorer.score_pair(external, internal) {
                    Ok(pair_score) => pair_score,
                    Err(e) => {
                        selection.stats.pairs_failed += 1;
                        self.logger.log_pair_fault(external.display_id(), key, &e);
                        continue;
                    }
                };
                self.logger
                    .log_pair_score(external.display_id(), key, pair_score.score);

                // a zero score shares nothing with the row, even at threshold 0
                if pair_score.score <= 0.0 || pair_score.score < threshold {
                    continue;
                }
                selection.stats.pairs_above_threshold += 1;

                // strict comparison keeps the first of equal-scoring candidates
                if best.as_ref().map_or(true, |b| pair_score.score > b.score) {
                    best = Some(MatchCandidate {
                        external_index,
                        internal_index,
                        score: pair_score.score,
                        field_scores: pair_score.field_scores,
                    });
                }
            }

            if let Some(winner) = best {
                used_keys.insert(&keys[winner.internal_index]);
                let pair_score = PairScore {
                    score: winner.score,
                    field_scores: winner.field_scores,
                };
                selection.matches.push(MatchResult::new(
                    external,
                    &internals[winner.internal_index],
                    pair_score,
                    MatchType::Auto,
                ));
            }

            self.logger.log_progress_update(
                external_index + 1,
                externals.len(),
                Some(&format!("{} matched", selection.matches.len())),
            );
        }

        self.logger.log_completion(
            selection.matches.len(),
            selection.stats.pairs_scored,
            selection.stats.pairs_failed,
        );
        Ok(selection)
    }
}

/// Greedy one-to-one matching with the default weighted scorer.
pub fn find_best_matches(
    externals: &[ExternalRecord],
    internals: &[InternalRecord],
    threshold: f64,
) -> Result<Vec<MatchResult>> {
    BestMatchSelector::default()
        .select(externals, internals, threshold)
        .map(|selection| selection.matches)
}

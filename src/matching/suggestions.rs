// src/matching/suggestions.rs - Ranked suggestions and internal duplicate detection
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::matching::confidence::{classify, ConfidenceLevel};
use crate::matching::scorer::{score_breakdown_external_internal, score_breakdown_internal_internal};
use crate::matching::selector::validate_threshold;
use crate::models::matching::{FieldScore, MatchResult, MatchType, PairScore};
use crate::models::records::{ExternalRecord, InternalRecord, TrackingKey};
use crate::models::stats_models::MatchMode;
use crate::utils::progress_bars::logging::MatchingLogger;

pub const DEFAULT_SUGGESTION_THRESHOLD: f64 = 60.0;
pub const DEFAULT_MAX_SUGGESTIONS: usize = 5;

/// Internal records that score at or above `threshold` against `external`,
/// best first. Zero scores are never suggested. Exclusivity is not enforced: suggestions are for a reviewer.
pub fn suggest_matches(
    external: &ExternalRecord,
    internals: &[InternalRecord],
    threshold: f64,
    limit: usize,
) -> Result<Vec<MatchResult>> {
    validate_threshold(threshold)?;
    if limit == 0 {
        bail!("suggestion limit must be at least 1");
    }

    let logger = MatchingLogger::new(MatchMode::Suggest);
    let mut scored: Vec<(usize, PairScore)> = internals
        .iter()
        .enumerate()
        .map(|(idx, internal)| (idx, score_breakdown_external_internal(external, internal)))
        .filter(|(_, pair_score)| pair_score.score > 0.0 && pair_score.score >= threshold)
        .collect();

    // sort_by is stable, so equal scores keep input order
    scored.sort_by(|(_, a), (_, b)| b.score.total_cmp(&a.score));
    scored.truncate(limit);

    logger.log_debug(&format!(
        "{} suggestions for opportunity {} (threshold {:.1})",
        scored.len(),
        external.display_id(),
        threshold
    ));

    Ok(scored
        .into_iter()
        .map(|(idx, pair_score)| MatchResult::new(external, &internals[idx], pair_score, MatchType::Suggested))
        .collect())
}

/// Two transactional records that look like the same customer line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicatePair {
    pub first: InternalRecord,
    pub second: InternalRecord,
    pub score: f64,
    pub confidence: ConfidenceLevel,
    pub field_scores: Vec<FieldScore>,
}

/// Internal-to-internal matching over every i < j pair. Each record joins at
/// most one pair; pairs are claimed greedily in input order just as the
/// best-match selector does.
pub fn find_duplicate_internals(internals: &[InternalRecord], threshold: f64) -> Result<Vec<DuplicatePair>> {
    validate_threshold(threshold)?;
    let logger = MatchingLogger::new(MatchMode::Duplicate);
    logger.log_start(internals.len(), internals.len(), threshold);

    let keys: Vec<TrackingKey> = internals
        .iter()
        .enumerate()
        .map(|(idx, record)| record.tracking_key(idx))
        .collect();
    let mut used: HashSet<usize> = HashSet::new();
    let mut pairs = Vec::new();
    let mut pairs_scored = 0;

    for i in 0..internals.len() {
        if used.contains(&i) {
            continue;
        }
        let mut best: Option<(usize, PairScore)> = None;
        for j in (i + 1)..internals.len() {
            if used.contains(&j) || keys[i] == keys[j] {
                continue;
            }
            pairs_scored += 1;
            let pair_score = score_breakdown_internal_internal(&internals[i], &internals[j]);
            if pair_score.score <= 0.0 || pair_score.score < threshold {
                continue;
            }
            if best.as_ref().map_or(true, |(_, b)| pair_score.score > b.score) {
                best = Some((j, pair_score));
            }
        }

        if let Some((j, pair_score)) = best {
            used.insert(i);
            used.insert(j);
            pairs.push(DuplicatePair {
                first: internals[i].clone(),
                second: internals[j].clone(),
                score: pair_score.score,
                confidence: classify(pair_score.score),
                field_scores: pair_score.field_scores,
            });
        }
    }

    logger.log_completion(pairs.len(), pairs_scored, 0);
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn external(name: &str, group: &str, product: &str, sales: &str) -> ExternalRecord {
        ExternalRecord {
            opportunity_id: "OPP-1".to_string(),
            customer_name: Some(name.to_string()),
            product_group: Some(group.to_string()),
            product_name: Some(product.to_string()),
            sales_code: Some(sales.to_string()),
            ..Default::default()
        }
    }

    fn internal(key: &str, name: &str, group: &str, product: &str, sales: &str) -> InternalRecord {
        InternalRecord {
            row_key: key.to_string(),
            customer_short_name: Some(name.to_string()),
            application: Some(group.to_string()),
            chip_name: Some(product.to_string()),
            salesperson: Some(sales.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_suggestions_ranked_and_filtered() {
        let e = external("Acme Corp", "Sensors", "X100", "S1");
        let internals = vec![
            internal("R-1", "Acme Corp", "Sensors", "X100", "S2"),
            internal("R-2", "Globex", "Motors", "M7", "S9"),
            internal("R-3", "Acme Corp", "Sensors", "X100", "S1"),
            internal("R-4", "Acme Corporation", "Sensors", "X100", "S1"),
        ];

        let suggestions = suggest_matches(&e, &internals, 60.0, 5).unwrap();
        let keys: Vec<&str> = suggestions.iter().map(|s| s.internal.row_key.as_str()).collect();
        assert_eq!(keys, vec!["R-3", "R-4", "R-1"]);
        assert!(suggestions.iter().all(|s| s.match_type == MatchType::Suggested));
        assert!(suggestions.windows(2).all(|w| w[0].aggregate_score >= w[1].aggregate_score));
    }

    #[test]
    fn test_suggestions_respect_limit_and_keep_ties_stable() {
        let e = external("Acme Corp", "Sensors", "X100", "S1");
        let internals = vec![
            internal("R-1", "Acme Corp", "Sensors", "X100", "S1"),
            internal("R-2", "Acme Corp", "Sensors", "X100", "S1"),
            internal("R-3", "Acme Corp", "Sensors", "X100", "S1"),
        ];
        let suggestions = suggest_matches(&e, &internals, 60.0, 2).unwrap();
        let keys: Vec<&str> = suggestions.iter().map(|s| s.internal.row_key.as_str()).collect();
        assert_eq!(keys, vec!["R-1", "R-2"]);
    }

    #[test]
    fn test_suggestions_reject_zero_limit() {
        let e = external("Acme Corp", "Sensors", "X100", "S1");
        assert!(suggest_matches(&e, &[], 60.0, 0).is_err());
        assert!(suggest_matches(&e, &[], 60.0, 3).unwrap().is_empty());
    }

    #[test]
    fn test_duplicates_found_once_per_record() {
        let internals = vec![
            internal("R-1", "Acme Corp", "Sensors", "X100", "S1"),
            internal("R-2", "Globex", "Motors", "M7", "S9"),
            internal("R-3", "ACME Corp.", "Sensors", "X100", "S1"),
            internal("R-4", "Acme Corp", "Sensors", "X100", "S1"),
        ];

        let pairs = find_duplicate_internals(&internals, 80.0).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].first.row_key, "R-1");
        // R-3 and R-4 tie for R-1: the first one encountered wins
        assert_eq!(pairs[0].second.row_key, "R-3");
        assert_eq!(pairs[0].confidence, ConfidenceLevel::High);
    }

    #[test]
    fn test_duplicates_skip_identical_keys() {
        let internals = vec![
            internal("R-1", "Acme Corp", "Sensors", "X100", "S1"),
            internal("R-1", "Acme Corp", "Sensors", "X100", "S1"),
        ];
        assert!(find_duplicate_internals(&internals, 80.0).unwrap().is_empty());
    }

    #[test]
    fn test_zero_scores_excluded_at_zero_threshold() {
        let e = external("Acme", "Sensors", "X100", "S1");
        let internals = vec![
            InternalRecord {
                row_key: "R-1".to_string(),
                ..Default::default()
            },
            internal("R-2", "Acme", "Sensors", "X100", "S1"),
        ];
        let suggestions = suggest_matches(&e, &internals, 0.0, 5).unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].internal.row_key, "R-2");

        let empty_rows = vec![InternalRecord::default(), InternalRecord::default()];
        assert!(find_duplicate_internals(&empty_rows, 0.0).unwrap().is_empty());
    }
}

// src/matching/scorer.rs - Weighted multi-field similarity for record pairs
use anyhow::{bail, Result};

use crate::matching::field_comparators::{compare_codes, compare_exact, compare_names};
use crate::models::matching::{Comparison, FieldScore, PairScore};
use crate::models::records::{present, ExternalRecord, InternalRecord};

/// Field weights for one scoring scheme. Weights only need to be relative:
/// the aggregate divides by the weight actually accumulated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub customer_name: f64,
    pub product_group: f64,
    pub product_name: f64,
    pub salesperson: f64,
}

/// Opportunity record against transactional record.
pub const EXTERNAL_INTERNAL_WEIGHTS: ScoringWeights = ScoringWeights {
    customer_name: 0.40,
    product_group: 0.20,
    product_name: 0.20,
    salesperson: 0.20,
};

/// Transactional record against transactional record (duplicate detection).
pub const INTERNAL_INTERNAL_WEIGHTS: ScoringWeights = ScoringWeights {
    customer_name: 40.0,
    product_group: 30.0,
    product_name: 20.0,
    salesperson: 10.0,
};

const SCORE_PRECISION: f64 = 1_000_000.0;

type Comparator = fn(&str, &str) -> Comparison;

#[derive(Default)]
struct WeightedAccumulator {
    total_score: f64,
    total_weight: f64,
    field_scores: Vec<FieldScore>,
}

impl WeightedAccumulator {
    /// Only fields present on both sides contribute score and weight. Absent
    /// fields are still reported as missing.
    fn add(
        &mut self,
        field: &str,
        value_1: &Option<String>,
        value_2: &Option<String>,
        weight: f64,
        comparator: Comparator,
    ) {
        match (present(value_1), present(value_2)) {
            (Some(v1), Some(v2)) => {
                let comparison = comparator(v1, v2);
                self.total_score += comparison.score * weight;
                self.total_weight += weight;
                self.field_scores
                    .push(FieldScore::new(field, Some(v1), Some(v2), comparison));
            }
            (v1, v2) => {
                self.field_scores
                    .push(FieldScore::new(field, v1, v2, Comparison::missing()));
            }
        }
    }

    fn finish(self) -> PairScore {
        let score = if self.total_weight > 0.0 {
            // fractional weights accumulate float error (0.4 + 0.2 + ... != 1.0)
            let raw = self.total_score / self.total_weight;
            ((raw * SCORE_PRECISION).round() / SCORE_PRECISION).clamp(0.0, 100.0)
        } else {
            0.0
        };
        PairScore {
            score,
            field_scores: self.field_scores,
        }
    }
}

/// Aggregate score and field breakdown for an opportunity/transaction pair.
pub fn score_breakdown_external_internal(
    external: &ExternalRecord,
    internal: &InternalRecord,
) -> PairScore {
    let weights = EXTERNAL_INTERNAL_WEIGHTS;
    let mut acc = WeightedAccumulator::default();
    acc.add(
        "customer_name",
        &external.customer_name,
        &internal.customer_short_name,
        weights.customer_name,
        compare_names,
    );
    acc.add(
        "product_group",
        &external.product_group,
        &internal.application,
        weights.product_group,
        compare_names,
    );
    acc.add(
        "product_name",
        &external.product_name,
        &internal.chip_name,
        weights.product_name,
        compare_codes,
    );
    acc.add(
        "salesperson",
        &external.sales_code,
        &internal.salesperson,
        weights.salesperson,
        compare_exact,
    );
    acc.finish()
}

pub fn score_external_internal(external: &ExternalRecord, internal: &InternalRecord) -> f64 {
    score_breakdown_external_internal(external, internal).score
}

/// Aggregate score and field breakdown for two transactional records.
pub fn score_breakdown_internal_internal(first: &InternalRecord, second: &InternalRecord) -> PairScore {
    let weights = INTERNAL_INTERNAL_WEIGHTS;
    let mut acc = WeightedAccumulator::default();
    acc.add(
        "customer_name",
        &first.customer_short_name,
        &second.customer_short_name,
        weights.customer_name,
        compare_names,
    );
    acc.add(
        "product_group",
        &first.application,
        &second.application,
        weights.product_group,
        compare_names,
    );
    acc.add(
        "product_name",
        &first.chip_name,
        &second.chip_name,
        weights.product_name,
        compare_codes,
    );
    acc.add(
        "salesperson",
        &first.salesperson,
        &second.salesperson,
        weights.salesperson,
        compare_exact,
    );
    acc.finish()
}

pub fn score_internal_internal(first: &InternalRecord, second: &InternalRecord) -> f64 {
    score_breakdown_internal_internal(first, second).score
}

/// Scores one candidate pair for the selector. An `Err` marks a per-pair
/// fault: the selector logs it, counts it and treats the pair as scoring
/// zero, which never makes it a candidate.
pub trait RecordScorer {
    fn score_pair(&self, external: &ExternalRecord, internal: &InternalRecord) -> Result<PairScore>;
}

/// External/internal weighted scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedRecordScorer;

impl RecordScorer for WeightedRecordScorer {
    fn score_pair(&self, external: &ExternalRecord, internal: &InternalRecord) -> Result<PairScore> {
        let pair_score = score_breakdown_external_internal(external, internal);
        if !pair_score.score.is_finite() {
            bail!(
                "non-finite score {} for opportunity {} / row {}",
                pair_score.score,
                external.display_id(),
                internal.row_key
            );
        }
        Ok(pair_score)
    }
}

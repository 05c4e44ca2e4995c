// src/models/matching.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::matching::confidence::{classify, ConfidenceLevel};
use crate::matching::field_comparators;
use crate::matching::scorer::score_breakdown_external_internal;
use crate::models::records::{ExternalRecord, InternalRecord};

/// Qualitative label attached to a single field comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchBucket {
    ExactMatch,
    HighMatch,
    MediumMatch,
    PartialMatch,
    LowMatch,
    NoMatch,
    Missing,
    Invalid,
}

impl MatchBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchBucket::ExactMatch => "exact-match",
            MatchBucket::HighMatch => "high-match",
            MatchBucket::MediumMatch => "medium-match",
            MatchBucket::PartialMatch => "partial-match",
            MatchBucket::LowMatch => "low-match",
            MatchBucket::NoMatch => "no-match",
            MatchBucket::Missing => "missing",
            MatchBucket::Invalid => "invalid",
        }
    }
}

/// Score and bucket produced by one comparator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    pub score: f64,
    pub bucket: MatchBucket,
}

impl Comparison {
    pub fn new(score: f64, bucket: MatchBucket) -> Self {
        Self { score, bucket }
    }

    pub fn missing() -> Self {
        Self::new(0.0, MatchBucket::Missing)
    }
}

/// One field comparison kept for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldScore {
    pub field: String,
    pub value_1: Option<String>,
    pub value_2: Option<String>,
    pub score: f64,
    pub bucket: MatchBucket,
}

impl FieldScore {
    pub fn new(
        field: &str,
        value_1: Option<&str>,
        value_2: Option<&str>,
        comparison: Comparison,
    ) -> Self {
        Self {
            field: field.to_string(),
            value_1: value_1.map(str::to_string),
            value_2: value_2.map(str::to_string),
            score: comparison.score,
            bucket: comparison.bucket,
        }
    }
}

/// Aggregate score for a record pair with the field scores that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct PairScore {
    pub score: f64,
    pub field_scores: Vec<FieldScore>,
}

impl PairScore {
    pub fn zero() -> Self {
        Self {
            score: 0.0,
            field_scores: Vec::new(),
        }
    }
}

/// A scored pair considered during best-match search.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub external_index: usize,
    pub internal_index: usize,
    pub score: f64,
    pub field_scores: Vec<FieldScore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Auto,
    Manual,
    Suggested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStatus {
    Pending,
    Approved,
    Rejected,
}

/// A pairing eligible for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub external: ExternalRecord,
    pub internal: InternalRecord,
    pub aggregate_score: f64,
    pub confidence: ConfidenceLevel,
    pub match_type: MatchType,
    pub field_scores: Vec<FieldScore>,
    /// Entry date against document date. Reported only, never weighted.
    pub date_proximity: Option<FieldScore>,
    pub matched_at: DateTime<Utc>,
    pub status: MatchStatus,
}

impl MatchResult {
    pub fn new(
        external: &ExternalRecord,
        internal: &InternalRecord,
        pair_score: PairScore,
        match_type: MatchType,
    ) -> Self {
        let date_proximity = match (
            external.entry_date.as_deref(),
            internal.doc_date.as_deref(),
        ) {
            (None, None) => None,
            (d1, d2) => Some(FieldScore::new(
                "entry_date/doc_date",
                d1,
                d2,
                field_comparators::compare_dates(d1.unwrap_or(""), d2.unwrap_or("")),
            )),
        };

        Self {
            external: external.clone(),
            internal: internal.clone(),
            aggregate_score: pair_score.score,
            confidence: classify(pair_score.score),
            match_type,
            field_scores: pair_score.field_scores,
            date_proximity,
            matched_at: Utc::now(),
            status: MatchStatus::Pending,
        }
    }

    /// A user-confirmed pairing. It is scored for the record but kept
    /// regardless of how low the score is.
    pub fn manual(external: &ExternalRecord, internal: &InternalRecord) -> Self {
        let pair_score = score_breakdown_external_internal(external, internal);
        Self::new(external, internal, pair_score, MatchType::Manual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_serializes_kebab_case() {
        let json = serde_json::to_string(&MatchBucket::PartialMatch).unwrap();
        assert_eq!(json, "\"partial-match\"");
        assert_eq!(MatchBucket::NoMatch.as_str(), "no-match");
    }

    #[test]
    fn test_manual_match_keeps_low_scores() {
        let external = ExternalRecord {
            opportunity_id: "OPP-1".to_string(),
            customer_name: Some("Globex".to_string()),
            ..Default::default()
        };
        let internal = InternalRecord {
            row_key: "R-9".to_string(),
            customer_short_name: Some("Initech".to_string()),
            ..Default::default()
        };

        let result = MatchResult::manual(&external, &internal);
        assert_eq!(result.match_type, MatchType::Manual);
        assert_eq!(result.status, MatchStatus::Pending);
        assert!(result.aggregate_score < 60.0);
        assert_eq!(result.confidence, ConfidenceLevel::VeryLow);
        assert!(result.date_proximity.is_none());
    }

    #[test]
    fn test_date_proximity_reported_when_one_side_has_a_date() {
        let external = ExternalRecord {
            entry_date: Some("2024-01-01".to_string()),
            ..Default::default()
        };
        let result = MatchResult::new(
            &external,
            &InternalRecord::default(),
            PairScore::zero(),
            MatchType::Auto,
        );
        let proximity = result.date_proximity.unwrap();
        assert_eq!(proximity.score, 0.0);
        assert_eq!(proximity.bucket, MatchBucket::Missing);
    }
}

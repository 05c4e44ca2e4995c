// src/matching/field_comparators.rs - Per-field comparison functions
use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::matching::string_metrics::{exact_match_score, normalize, normalize_code, similarity_percent};
use crate::models::matching::{Comparison, MatchBucket};

/// Floor applied when one normalized name contains the other.
pub const NAME_CONTAINMENT_BONUS: f64 = 80.0;
/// Flat score for a code contained in the other code.
pub const CODE_CONTAINMENT_SCORE: f64 = 75.0;

/// Day-difference bands for date proximity: (max days, score, bucket).
pub const DATE_BANDS: [(i64, f64, MatchBucket); 4] = [
    (0, 100.0, MatchBucket::ExactMatch),
    (30, 85.0, MatchBucket::HighMatch),
    (60, 60.0, MatchBucket::MediumMatch),
    (90, 40.0, MatchBucket::LowMatch),
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Customer and product-group names.
pub fn compare_names(value_1: &str, value_2: &str) -> Comparison {
    let n1 = normalize(value_1);
    let n2 = normalize(value_2);
    if n1.is_empty() || n2.is_empty() {
        return Comparison::missing();
    }
    if n1 == n2 {
        return Comparison::new(100.0, MatchBucket::ExactMatch);
    }

    let similarity = similarity_percent(&n1, &n2);
    if n1.contains(&n2) || n2.contains(&n1) {
        return Comparison::new(similarity.max(NAME_CONTAINMENT_BONUS), MatchBucket::PartialMatch);
    }
    Comparison::new(similarity, similarity_bucket(similarity))
}

/// Product codes and other identifiers.
pub fn compare_codes(value_1: &str, value_2: &str) -> Comparison {
    let n1 = normalize_code(value_1);
    let n2 = normalize_code(value_2);
    if n1.is_empty() || n2.is_empty() {
        return Comparison::missing();
    }
    if n1 == n2 {
        return Comparison::new(100.0, MatchBucket::ExactMatch);
    }
    if n1.contains(&n2) || n2.contains(&n1) {
        return Comparison::new(CODE_CONTAINMENT_SCORE, MatchBucket::PartialMatch);
    }

    let similarity = similarity_percent(&n1, &n2);
    Comparison::new(similarity, similarity_bucket(similarity))
}

/// Categorical fields such as salesperson codes. No partial credit.
pub fn compare_exact(value_1: &str, value_2: &str) -> Comparison {
    if value_1.trim().is_empty() || value_2.trim().is_empty() {
        return Comparison::missing();
    }
    match exact_match_score(value_1, value_2) {
        s if s >= 100.0 => Comparison::new(s, MatchBucket::ExactMatch),
        s => Comparison::new(s, MatchBucket::NoMatch),
    }
}

/// Proximity of two calendar dates, scored by the day bands in [`DATE_BANDS`].
pub fn compare_dates(value_1: &str, value_2: &str) -> Comparison {
    if value_1.trim().is_empty() || value_2.trim().is_empty() {
        return Comparison::missing();
    }
    let (Some(d1), Some(d2)) = (parse_date(value_1), parse_date(value_2)) else {
        return Comparison::new(0.0, MatchBucket::Invalid);
    };

    let days = (d1 - d2).num_days().abs();
    DATE_BANDS
        .iter()
        .find(|(max_days, _, _)| days <= *max_days)
        .map(|(_, score, bucket)| Comparison::new(*score, *bucket))
        .unwrap_or_else(|| Comparison::new(0.0, MatchBucket::NoMatch))
}

/// Parses a date-only or timestamp value, discarding the time of day.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.date());
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

// Both values were present, so a zero is a mismatch rather than a gap.
fn similarity_bucket(similarity: f64) -> MatchBucket {
    if similarity <= 0.0 {
        MatchBucket::NoMatch
    } else {
        bucket_for_score(similarity)
    }
}

/// Buckets an already computed 0-100 score for reporting.
pub fn bucket_for_score(score: f64) -> MatchBucket {
    if score >= 95.0 {
        MatchBucket::ExactMatch
    } else if score >= 70.0 {
        MatchBucket::PartialMatch
    } else if score >= 30.0 {
        MatchBucket::LowMatch
    } else if score > 0.0 {
        MatchBucket::NoMatch
    } else {
        MatchBucket::Missing
    }
}

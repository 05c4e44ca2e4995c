// src/matching/confidence.rs
use serde::{Deserialize, Serialize};

pub const HIGH_CONFIDENCE_MIN: f64 = 90.0;
pub const MEDIUM_CONFIDENCE_MIN: f64 = 80.0;
pub const LOW_CONFIDENCE_MIN: f64 = 60.0;

/// Ordered from least to most confident so tiers compare naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    VeryLow,
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "High",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::Low => "Low",
            ConfidenceLevel::VeryLow => "Very Low",
        }
    }

    pub fn all() -> [ConfidenceLevel; 4] {
        [
            ConfidenceLevel::High,
            ConfidenceLevel::Medium,
            ConfidenceLevel::Low,
            ConfidenceLevel::VeryLow,
        ]
    }
}

/// Maps an aggregate score to its confidence tier. Anything below the low
/// tier, NaN included, is `VeryLow`.
pub fn classify(score: f64) -> ConfidenceLevel {
    if score >= HIGH_CONFIDENCE_MIN {
        ConfidenceLevel::High
    } else if score >= MEDIUM_CONFIDENCE_MIN {
        ConfidenceLevel::Medium
    } else if score >= LOW_CONFIDENCE_MIN {
        ConfidenceLevel::Low
    } else {
        ConfidenceLevel::VeryLow
    }
}

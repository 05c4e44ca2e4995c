// src/utils/matching_config.rs - Matching thresholds read from the environment
use log::{info, warn};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::matching::selector::DEFAULT_AUTO_MATCH_THRESHOLD;
use crate::matching::suggestions::{DEFAULT_MAX_SUGGESTIONS, DEFAULT_SUGGESTION_THRESHOLD};

pub const DEFAULT_DUPLICATE_THRESHOLD: f64 = 80.0;
pub const DEFAULT_MATCH_TIMEOUT_SECONDS: u64 = 300;

/// Tunables handed to the matching core by the orchestration layer. The core
/// itself never reads the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingConfig {
    pub auto_match_threshold: f64,
    pub suggestion_threshold: f64,
    pub max_suggestions: usize,
    pub duplicate_threshold: f64,
    pub timeout_seconds: u64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            auto_match_threshold: DEFAULT_AUTO_MATCH_THRESHOLD,
            suggestion_threshold: DEFAULT_SUGGESTION_THRESHOLD,
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
            duplicate_threshold: DEFAULT_DUPLICATE_THRESHOLD,
            timeout_seconds: DEFAULT_MATCH_TIMEOUT_SECONDS,
        }
    }
}

impl MatchingConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Missing, unparsable and
    /// out-of-range values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            auto_match_threshold: read_threshold(&lookup, "AUTO_MATCH_THRESHOLD", defaults.auto_match_threshold),
            suggestion_threshold: read_threshold(&lookup, "SUGGESTION_THRESHOLD", defaults.suggestion_threshold),
            max_suggestions: read_value(&lookup, "MAX_SUGGESTIONS", defaults.max_suggestions, |v| *v > 0),
            duplicate_threshold: read_threshold(&lookup, "DUPLICATE_THRESHOLD", defaults.duplicate_threshold),
            timeout_seconds: read_value(&lookup, "MATCH_TIMEOUT_SECONDS", defaults.timeout_seconds, |v| *v > 0),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Log the current configuration
    pub fn log_config(&self) {
        info!("⚙️  Matching configuration:");
        info!("   Auto-match threshold: {:.1}", self.auto_match_threshold);
        info!("   Suggestion threshold: {:.1}", self.suggestion_threshold);
        info!("   Max suggestions: {}", self.max_suggestions);
        info!("   Duplicate threshold: {:.1}", self.duplicate_threshold);
        info!("   Match timeout: {}s", self.timeout_seconds);
    }
}

fn read_threshold<F>(lookup: &F, key: &str, default: f64) -> f64
where
    F: Fn(&str) -> Option<String>,
{
    read_value(lookup, key, default, |v: &f64| v.is_finite() && (0.0..=100.0).contains(v))
}

fn read_value<F, T, V>(lookup: &F, key: &str, default: T, is_valid: V) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Display + Copy,
    V: Fn(&T) -> bool,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if is_valid(&value) => value,
        Ok(value) => {
            warn!("{}={} is out of range, using default {}", key, value, default);
            default
        }
        Err(_) => {
            warn!("{}={:?} could not be parsed, using default {}", key, raw, default);
            default
        }
    }
}

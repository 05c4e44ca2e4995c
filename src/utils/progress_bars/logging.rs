// src/utils/progress_bars/logging.rs - Logging helpers for matching runs
use log::{debug, info, warn};
use std::fmt::Display;
use std::time::Instant;

use crate::models::stats_models::{MatchMode, MatchRunStats};

fn mode_tag(mode: MatchMode) -> (&'static str, &'static str) {
    match mode {
        MatchMode::Auto => ("AUTO", "🔗"),
        MatchMode::Suggest => ("SUGGEST", "💡"),
        MatchMode::Duplicate => ("DUPLICATE", "👥"),
        MatchMode::Manual => ("MANUAL", "✋"),
    }
}

#[derive(Clone)]
pub struct MatchingLogger {
    method_name: &'static str,
    method_emoji: &'static str,
    start_time: Instant,
}

impl MatchingLogger {
    pub fn new(mode: MatchMode) -> Self {
        let (method_name, method_emoji) = mode_tag(mode);
        Self {
            method_name,
            method_emoji,
            start_time: Instant::now(),
        }
    }

    pub fn log_start(&self, externals: usize, internals: usize, threshold: f64) {
        info!(
            "[{}] {} 🚀 Starting {} matching: {} external x {} internal records (threshold {:.1})",
            self.method_name,
            self.method_emoji,
            self.method_name.to_lowercase(),
            externals,
            internals,
            threshold
        );
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        let msg = if let Some(details) = details {
            format!(
                "[{}] {} 🔄 Phase: {} - {} [+{:.1}s]",
                self.method_name, self.method_emoji, phase, details, elapsed.as_secs_f32()
            )
        } else {
            format!(
                "[{}] {} 🔄 Phase: {} [+{:.1}s]",
                self.method_name, self.method_emoji, phase, elapsed.as_secs_f32()
            )
        };
        info!("{}", msg);
    }

    pub fn log_data_loaded(&self, count: usize, data_type: &str) {
        info!(
            "[{}] {} 📊 Loaded {} {} records",
            self.method_name, self.method_emoji, count, data_type
        );
    }

    pub fn log_pair_score(&self, external_id: &str, internal_key: impl Display, score: f64) {
        debug!(
            "[{}] {} {} ↔ {}: {:.2}",
            self.method_name, self.method_emoji, external_id, internal_key, score
        );
    }

    pub fn log_pair_fault(&self, external_id: &str, internal_key: impl Display, error: &anyhow::Error) {
        warn!(
            "[{}] {} ⚠️  Scoring failed for {} ↔ {}, pair skipped: {:#}",
            self.method_name, self.method_emoji, external_id, internal_key, error
        );
    }

    pub fn log_progress_update(&self, current: usize, total: usize, additional_info: Option<&str>) {
        let should_log = current % 500 == 0
            || current == total
            || (total >= 100 && current % (total / 10) == 0);

        if should_log && current > 0 {
            let percent = (current as f64 / total as f64) * 100.0;
            let msg = if let Some(info) = additional_info {
                format!("Progress: {}/{} ({:.1}%) - {}", current, total, percent, info)
            } else {
                format!("Progress: {}/{} ({:.1}%)", current, total, percent)
            };
            info!("[{}] {} 📊 {}", self.method_name, self.method_emoji, msg);
        }
    }

    pub fn log_completion(&self, matches: usize, pairs_scored: usize, pairs_failed: usize) {
        let duration = self.start_time.elapsed();
        info!(
            "[{}] {} 🎉 COMPLETED: {} matches from {} scored pairs in {:.2?}",
            self.method_name, self.method_emoji, matches, pairs_scored, duration
        );
        if pairs_failed > 0 {
            warn!(
                "[{}] {} ⚠️  {} pairs failed to score and were skipped",
                self.method_name, self.method_emoji, pairs_failed
            );
        }
    }

    pub fn log_warning(&self, message: &str) {
        warn!("[{}] {} ⚠️  {}", self.method_name, self.method_emoji, message);
    }

    pub fn log_debug(&self, message: &str) {
        debug!("[{}] {} {}", self.method_name, self.method_emoji, message);
    }
}

// Run-level logging functions
pub fn log_run_start(run_id: &str, mode: MatchMode, auto_threshold: f64, suggestion_threshold: f64) {
    let (name, emoji) = mode_tag(mode);
    info!("🚀 ===== OPPORTUNITY MATCHING RUN STARTING =====");
    info!("📅 Run ID: {}", run_id);
    info!("{} Mode: {}", emoji, name);
    info!("⚙️  Auto-match threshold: {:.1}", auto_threshold);
    info!("⚙️  Suggestion threshold: {:.1}", suggestion_threshold);
    info!("================================================");
}

pub fn log_run_completion(stats: &MatchRunStats) {
    let (name, emoji) = mode_tag(stats.mode);
    info!("🎉 ===== OPPORTUNITY MATCHING RUN COMPLETED =====");
    info!("📅 Run ID: {}", stats.run_id);
    info!("{} Mode: {}", emoji, name);
    info!("⏱️  Total Duration: {:.2}s", stats.duration_secs);
    info!(
        "📊 Records: {} external, {} internal, {} pairs scored ({} failed, {} above threshold)",
        stats.externals_total,
        stats.internals_total,
        stats.pairs_scored,
        stats.pairs_failed,
        stats.pairs_above_threshold
    );
    info!(
        "🎯 Matches: {} found, {} persisted, avg score {:.2}",
        stats.matches_found, stats.matches_persisted, stats.avg_score
    );
    for (level, count) in &stats.by_confidence {
        info!("   • {}: {}", level, count);
    }
    info!("===============================================");
}

// src/pipeline.rs - Orchestration: load, match, persist
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::matching::scorer::{RecordScorer, WeightedRecordScorer};
use crate::matching::selector::BestMatchSelector;
use crate::matching::suggestions::{find_duplicate_internals, suggest_matches, DuplicatePair};
use crate::models::matching::MatchResult;
use crate::models::stats_models::{MatchMode, MatchRunStats};
use crate::persistence::{MatchSink, MergedRecord};
use crate::sources::RecordSource;
use crate::utils::matching_config::MatchingConfig;
use crate::utils::progress_bars::logging::{log_run_completion, log_run_start, MatchingLogger};
use crate::utils::progress_bars::progress_config::ProgressConfig;

/// Runs a CPU-bound matching task off the async executor, bounded by `limit`.
async fn run_with_timeout<T, F>(limit: Duration, label: &str, task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(task)).await {
        Ok(joined) => joined
            .map_err(|e| anyhow!("{} task panicked or was cancelled: {}", label, e))?
            .with_context(|| format!("{} failed", label)),
        Err(_) => bail!("{} timed out after {}s", label, limit.as_secs()),
    }
}

/// Auto-matches every external record against the internal collection and
/// persists the winners.
pub async fn run_auto_match<R, K>(
    config: &MatchingConfig,
    progress: &ProgressConfig,
    source: &R,
    sink: &mut K,
) -> Result<MatchRunStats>
where
    R: RecordSource,
    K: MatchSink,
{
    run_auto_match_with(WeightedRecordScorer, config, progress, source, sink).await
}

pub async fn run_auto_match_with<S, R, K>(
    scorer: S,
    config: &MatchingConfig,
    progress: &ProgressConfig,
    source: &R,
    sink: &mut K,
) -> Result<MatchRunStats>
where
    S: RecordScorer + Send + 'static,
    R: RecordSource,
    K: MatchSink,
{
    let run_start = Instant::now();
    let run_id = Uuid::new_v4().to_string();
    log_run_start(&run_id, MatchMode::Auto, config.auto_match_threshold, config.suggestion_threshold);

    let logger = MatchingLogger::new(MatchMode::Auto);
    logger.log_phase("Loading records", None);
    let externals = source.load_externals().context("Failed to load external records")?;
    logger.log_data_loaded(externals.len(), "external");
    let internals = source.load_internals().context("Failed to load internal records")?;
    logger.log_data_loaded(internals.len(), "internal");

    let mut stats = MatchRunStats::new(&run_id, MatchMode::Auto, externals.len(), internals.len());

    logger.log_phase("Selecting best matches", None);
    let threshold = config.auto_match_threshold;
    let selection = run_with_timeout(config.timeout(), "Best-match selection", move || {
        BestMatchSelector::new(scorer).select(&externals, &internals, threshold)
    })
    .await?;
    stats.record_results(&selection.matches, &selection.stats);

    logger.log_phase("Persisting matches", Some(&format!("{} results", selection.matches.len())));
    stats.matches_persisted = persist_all(&selection.matches, sink, progress, &logger)?.len();

    stats.duration_secs = run_start.elapsed().as_secs_f64();
    log_run_completion(&stats);
    Ok(stats)
}

/// Hands every result to the sink and returns the records it stored.
pub fn persist_all<K: MatchSink>(
    results: &[MatchResult],
    sink: &mut K,
    progress: &ProgressConfig,
    logger: &MatchingLogger,
) -> Result<Vec<MergedRecord>> {
    let pb = progress.create_progress_bar(results.len() as u64, "Persisting matches")?;
    let mut stored = Vec::with_capacity(results.len());
    let mut skipped = 0;

    for (idx, result) in results.iter().enumerate() {
        match sink.persist(result).with_context(|| {
            format!(
                "Failed to persist match {} ↔ {}",
                result.external.display_id(),
                result.internal.row_key
            )
        })? {
            Some(merged) => stored.push(merged),
            None => skipped += 1,
        }
        if let Some(pb) = &pb {
            pb.inc(1);
        }
        logger.log_progress_update(idx + 1, results.len(), None);
    }

    if let Some(pb) = pb {
        pb.finish_with_message(format!("{} persisted, {} already stored", stored.len(), skipped));
    }
    if skipped > 0 {
        logger.log_warning(&format!("{} matches were already stored and were skipped", skipped));
    }
    Ok(stored)
}

/// Ranked suggestions for one opportunity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionSet {
    pub opportunity_id: String,
    pub suggestions: Vec<MatchResult>,
}

/// Suggestions for every external record, or only for `opportunity_id` when
/// given. Nothing is persisted.
pub async fn run_suggestions<R: RecordSource>(
    config: &MatchingConfig,
    source: &R,
    opportunity_id: Option<&str>,
) -> Result<Vec<SuggestionSet>> {
    let logger = MatchingLogger::new(MatchMode::Suggest);
    let mut externals = source.load_externals().context("Failed to load external records")?;
    let internals = source.load_internals().context("Failed to load internal records")?;

    if let Some(id) = opportunity_id {
        externals.retain(|e| e.opportunity_id == id);
        if externals.is_empty() {
            bail!("opportunity {} not found in external records", id);
        }
    }
    logger.log_start(externals.len(), internals.len(), config.suggestion_threshold);

    let threshold = config.suggestion_threshold;
    let limit = config.max_suggestions;
    let sets = run_with_timeout(config.timeout(), "Suggestion scoring", move || {
        externals
            .iter()
            .map(|external| {
                Ok(SuggestionSet {
                    opportunity_id: external.opportunity_id.clone(),
                    suggestions: suggest_matches(external, &internals, threshold, limit)?,
                })
            })
            .collect::<Result<Vec<_>>>()
    })
    .await?;

    let total: usize = sets.iter().map(|s| s.suggestions.len()).sum();
    logger.log_completion(total, sets.len(), 0);
    Ok(sets)
}

/// Internal records that look like duplicates of each other.
pub async fn run_duplicate_scan<R: RecordSource>(
    config: &MatchingConfig,
    source: &R,
) -> Result<Vec<DuplicatePair>> {
    let internals = source.load_internals().context("Failed to load internal records")?;
    let threshold = config.duplicate_threshold;
    run_with_timeout(config.timeout(), "Duplicate scan", move || {
        find_duplicate_internals(&internals, threshold)
    })
    .await
}

/// Pairs one opportunity with one transactional row on a user's say-so and
/// persists it whatever the score. `None` means the pair was already stored.
pub fn run_manual_match<R, K>(
    config: &MatchingConfig,
    source: &R,
    sink: &mut K,
    opportunity_id: &str,
    row_key: &str,
) -> Result<Option<MergedRecord>>
where
    R: RecordSource,
    K: MatchSink,
{
    let logger = MatchingLogger::new(MatchMode::Manual);
    let externals = source.load_externals().context("Failed to load external records")?;
    let internals = source.load_internals().context("Failed to load internal records")?;

    let external = externals
        .iter()
        .find(|e| e.opportunity_id == opportunity_id)
        .with_context(|| format!("opportunity {} not found in external records", opportunity_id))?;
    let internal = internals
        .iter()
        .find(|i| i.row_key == row_key)
        .with_context(|| format!("row {} not found in internal records", row_key))?;

    let result = MatchResult::manual(external, internal);
    logger.log_pair_score(opportunity_id, row_key, result.aggregate_score);
    if result.aggregate_score < config.suggestion_threshold {
        logger.log_warning(&format!(
            "Manual match {} ↔ {} scores only {:.1}",
            opportunity_id, row_key, result.aggregate_score
        ));
    }

    let stored = sink.persist(&result)?;
    logger.log_completion(usize::from(stored.is_some()), 1, 0);
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::matching::{MatchStatus, MatchType, PairScore};
    use crate::models::records::{ExternalRecord, InternalRecord};
    use crate::persistence::MemorySink;
    use crate::sources::VecSource;

    fn external(id: &str, name: &str, group: &str, product: &str, sales: &str) -> ExternalRecord {
        ExternalRecord {
            opportunity_id: id.to_string(),
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
            quantity: Some(100.0),
            ..Default::default()
        }
    }

    fn sample_source() -> VecSource {
        VecSource::new(
            vec![
                external("OPP-1", "Acme Corp", "Sensors", "X100", "S1"),
                external("OPP-2", "Globex", "Motors", "M7", "S9"),
                external("OPP-3", "Initech", "Displays", "D1", "S4"),
            ],
            vec![
                internal("R-1", "Acme Corp", "Sensors", "X100", "S1"),
                internal("R-2", "Globex", "Motors", "M7", "S9"),
                internal("R-3", "Umbrella", "Pumps", "P5", "S7"),
            ],
        )
    }

    #[tokio::test]
    async fn test_auto_match_persists_winners() {
        let source = sample_source();
        let mut sink = MemorySink::new();
        let config = MatchingConfig::default();

        let stats = run_auto_match(&config, &ProgressConfig::disabled(), &source, &mut sink)
            .await
            .unwrap();

        assert_eq!(stats.mode, MatchMode::Auto);
        assert_eq!(stats.externals_total, 3);
        assert_eq!(stats.internals_total, 3);
        assert_eq!(stats.matches_found, 2);
        assert_eq!(stats.matches_persisted, 2);
        assert_eq!(stats.pairs_failed, 0);
        assert_eq!(stats.pairs_above_threshold, 2);
        assert_eq!(stats.by_confidence["High"], 2);

        let keys: Vec<&str> = sink.records.iter().map(|r| r.internal.row_key.as_str()).collect();
        assert_eq!(keys, vec!["R-1", "R-2"]);
        assert!(sink.records.iter().all(|r| r.status == MatchStatus::Pending));
        assert_eq!(sink.records[0].quantity, Some(100.0));
    }

    #[tokio::test]
    async fn test_second_run_skips_stored_pairs() {
        let source = sample_source();
        let mut sink = MemorySink::new();
        let config = MatchingConfig::default();
        let progress = ProgressConfig::disabled();

        run_auto_match(&config, &progress, &source, &mut sink).await.unwrap();
        let stats = run_auto_match(&config, &progress, &source, &mut sink).await.unwrap();

        assert_eq!(stats.matches_found, 2);
        assert_eq!(stats.matches_persisted, 0);
        assert_eq!(sink.records.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_threshold_fails_the_run() {
        let config = MatchingConfig {
            auto_match_threshold: f64::NAN,
            ..MatchingConfig::default()
        };
        let mut sink = MemorySink::new();
        let result = run_auto_match(&config, &ProgressConfig::disabled(), &sample_source(), &mut sink).await;
        assert!(result.is_err());
        assert!(sink.records.is_empty());
    }

    struct SlowScorer;

    impl RecordScorer for SlowScorer {
        fn score_pair(&self, _external: &ExternalRecord, _internal: &InternalRecord) -> Result<PairScore> {
            std::thread::sleep(Duration::from_millis(1500));
            Ok(PairScore::zero())
        }
    }

    #[tokio::test]
    async fn test_selection_timeout_is_reported() {
        let config = MatchingConfig {
            timeout_seconds: 1,
            ..MatchingConfig::default()
        };
        let source = VecSource::new(
            vec![external("OPP-1", "Acme Corp", "Sensors", "X100", "S1")],
            vec![internal("R-1", "Acme Corp", "Sensors", "X100", "S1")],
        );
        let mut sink = MemorySink::new();

        let err = run_auto_match_with(SlowScorer, &config, &ProgressConfig::disabled(), &source, &mut sink)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_suggestions_for_one_opportunity() {
        let config = MatchingConfig::default();
        let sets = run_suggestions(&config, &sample_source(), Some("OPP-1")).await.unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].opportunity_id, "OPP-1");
        assert_eq!(sets[0].suggestions[0].internal.row_key, "R-1");
        assert!(sets[0].suggestions.iter().all(|s| s.match_type == MatchType::Suggested));

        assert!(run_suggestions(&config, &sample_source(), Some("OPP-404")).await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_scan() {
        let source = VecSource::new(
            Vec::new(),
            vec![
                internal("R-1", "Acme Corp", "Sensors", "X100", "S1"),
                internal("R-2", "ACME Corp.", "Sensors", "X100", "S1"),
                internal("R-3", "Umbrella", "Pumps", "P5", "S7"),
            ],
        );
        let pairs = run_duplicate_scan(&MatchingConfig::default(), &source).await.unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].first.row_key, "R-1");
        assert_eq!(pairs[0].second.row_key, "R-2");
    }

    #[test]
    fn test_manual_match_keeps_low_scores() {
        let source = sample_source();
        let mut sink = MemorySink::new();
        let config = MatchingConfig::default();

        let stored = run_manual_match(&config, &source, &mut sink, "OPP-3", "R-3").unwrap().unwrap();
        assert_eq!(stored.match_type, MatchType::Manual);
        assert!(stored.score < 60.0);
        assert_eq!(stored.status, MatchStatus::Pending);

        assert!(run_manual_match(&config, &source, &mut sink, "OPP-3", "R-3").unwrap().is_none());
        assert!(run_manual_match(&config, &source, &mut sink, "OPP-3", "R-404").is_err());
    }
}

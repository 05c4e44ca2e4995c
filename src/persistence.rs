// src/persistence.rs - Durable storage of accepted matches
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::matching::confidence::ConfidenceLevel;
use crate::models::matching::{FieldScore, MatchResult, MatchStatus, MatchType};
use crate::models::records::{ExternalRecord, InternalRecord};

/// The persisted form of a match: both source records plus the match
/// metadata, keyed by a fresh UUID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub record_key: String,
    pub pair_signature: String,
    pub external: ExternalRecord,
    pub internal: InternalRecord,
    pub score: f64,
    pub confidence: ConfidenceLevel,
    pub match_type: MatchType,
    pub status: MatchStatus,
    pub matched_at: DateTime<Utc>,
    pub field_scores: Vec<FieldScore>,
    pub quantity: Option<f64>,
    pub amount: Option<f64>,
}

impl MergedRecord {
    pub fn from_result(result: &MatchResult) -> Self {
        Self {
            record_key: Uuid::new_v4().to_string(),
            pair_signature: pair_signature(&result.external, &result.internal),
            external: result.external.clone(),
            internal: result.internal.clone(),
            score: result.aggregate_score,
            confidence: result.confidence,
            match_type: result.match_type,
            status: MatchStatus::Pending,
            matched_at: result.matched_at,
            field_scores: result.field_scores.clone(),
            quantity: result.internal.quantity,
            amount: result.internal.amount,
        }
    }
}

/// SHA-256 over the opportunity id and row key. When either id is blank the
/// full records are hashed instead, so unrelated blank-keyed pairs differ.
pub fn pair_signature(external: &ExternalRecord, internal: &InternalRecord) -> String {
    let opportunity_id = external.opportunity_id.trim();
    let row_key = internal.row_key.trim();

    let mut hasher = Sha256::new();
    if opportunity_id.is_empty() || row_key.is_empty() {
        hasher.update(format!("external:{:?}", external).as_bytes());
        hasher.update(format!("internal:{:?}", internal).as_bytes());
    } else {
        hasher.update(format!("{}|{}", opportunity_id, row_key).as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Receives each accepted match. Returns `None` when the pair was already
/// stored by this sink.
pub trait MatchSink {
    fn persist(&mut self, result: &MatchResult) -> Result<Option<MergedRecord>>;
}

/// Keeps merged records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<MergedRecord>,
    seen: HashSet<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MatchSink for MemorySink {
    fn persist(&mut self, result: &MatchResult) -> Result<Option<MergedRecord>> {
        let merged = MergedRecord::from_result(result);
        if !self.seen.insert(merged.pair_signature.clone()) {
            debug!("Skipping already stored pair {}", merged.pair_signature);
            return Ok(None);
        }
        self.records.push(merged.clone());
        Ok(Some(merged))
    }
}

/// Appends one JSON object per line. Signatures already in the file when it
/// is opened count as stored.
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    file: File,
    seen: HashSet<String>,
}

impl JsonLinesSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let seen = if path.exists() {
            read_signatures(&path)?
        } else {
            HashSet::new()
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open match output {}", path.display()))?;

        info!(
            "💾 Writing matches to {} ({} pairs already stored)",
            path.display(),
            seen.len()
        );
        Ok(Self { path, file, seen })
    }
}

fn read_signatures(path: &Path) -> Result<HashSet<String>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut seen = HashSet::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: MergedRecord = serde_json::from_str(&line)
            .with_context(|| format!("Invalid merged record on line {} of {}", line_no + 1, path.display()))?;
        seen.insert(record.pair_signature);
    }
    Ok(seen)
}

impl MatchSink for JsonLinesSink {
    fn persist(&mut self, result: &MatchResult) -> Result<Option<MergedRecord>> {
        let merged = MergedRecord::from_result(result);
        if self.seen.contains(&merged.pair_signature) {
            debug!("Skipping already stored pair {}", merged.pair_signature);
            return Ok(None);
        }

        let line = serde_json::to_string(&merged).context("Failed to serialize merged record")?;
        writeln!(self.file, "{}", line)
            .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        self.file
            .flush()
            .with_context(|| format!("Failed to flush {}", self.path.display()))?;

        self.seen.insert(merged.pair_signature.clone());
        Ok(Some(merged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::matching::PairScore;
    use tempfile::tempdir;

    fn sample_result(opportunity_id: &str, row_key: &str) -> MatchResult {
        let external = ExternalRecord {
            opportunity_id: opportunity_id.to_string(),
            customer_name: Some("Acme Corp".to_string()),
            ..Default::default()
        };
        let internal = InternalRecord {
            row_key: row_key.to_string(),
            customer_short_name: Some("Acme Corp".to_string()),
            quantity: Some(250.0),
            amount: Some(1999.5),
            ..Default::default()
        };
        let pair_score = PairScore {
            score: 92.0,
            field_scores: Vec::new(),
        };
        MatchResult::new(&external, &internal, pair_score, MatchType::Auto)
    }

    #[test]
    fn test_merged_record_carries_metadata() {
        let result = sample_result("OPP-1", "R-1");
        let merged = MergedRecord::from_result(&result);

        assert!(Uuid::parse_str(&merged.record_key).is_ok());
        assert_eq!(merged.status, MatchStatus::Pending);
        assert_eq!(merged.score, 92.0);
        assert_eq!(merged.confidence, ConfidenceLevel::High);
        assert_eq!(merged.quantity, Some(250.0));
        assert_eq!(merged.amount, Some(1999.5));
        assert_eq!(merged.pair_signature.len(), 64);
    }

    #[test]
    fn test_pair_signature_is_stable() {
        let a = sample_result("OPP-1", "R-1");
        let b = sample_result("OPP-1", "R-1");
        let c = sample_result("OPP-1", "R-2");
        assert_eq!(pair_signature(&a.external, &a.internal), pair_signature(&b.external, &b.internal));
        assert_ne!(pair_signature(&a.external, &a.internal), pair_signature(&c.external, &c.internal));
    }

    #[test]
    fn test_memory_sink_skips_repeated_pairs() {
        let mut sink = MemorySink::new();
        let first = sink.persist(&sample_result("OPP-1", "R-1")).unwrap();
        let repeat = sink.persist(&sample_result("OPP-1", "R-1")).unwrap();
        let other = sink.persist(&sample_result("OPP-2", "R-2")).unwrap();

        assert!(first.is_some());
        assert!(repeat.is_none());
        assert!(other.is_some());
        assert_eq!(sink.records.len(), 2);
        assert_ne!(sink.records[0].record_key, sink.records[1].record_key);
    }

    #[test]
    fn test_json_lines_sink_appends_and_reloads_signatures() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("matches.jsonl");

        {
            let mut sink = JsonLinesSink::open(&path).unwrap();
            assert!(sink.persist(&sample_result("OPP-1", "R-1")).unwrap().is_some());
            assert!(sink.persist(&sample_result("OPP-2", "R-2")).unwrap().is_some());
        }

        let mut reopened = JsonLinesSink::open(&path).unwrap();
        assert!(reopened.persist(&sample_result("OPP-1", "R-1")).unwrap().is_none());
        assert!(reopened.persist(&sample_result("OPP-3", "R-3")).unwrap().is_some());

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<MergedRecord> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2].external.opportunity_id, "OPP-3");
    }

    #[test]
    fn test_json_lines_sink_rejects_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("matches.jsonl");
        std::fs::write(&path, "not json\n").unwrap();
        assert!(JsonLinesSink::open(&path).is_err());
    }
}

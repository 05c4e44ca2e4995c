// src/sources.rs - Where the two record collections come from
use anyhow::{Context, Result};
use log::info;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::records::{ExternalRecord, InternalRecord};

/// Supplies the opportunity list and the transactional rows for a run.
pub trait RecordSource {
    fn load_externals(&self) -> Result<Vec<ExternalRecord>>;
    fn load_internals(&self) -> Result<Vec<InternalRecord>>;
}

/// Reads each collection from a file holding one JSON array.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    pub externals_path: PathBuf,
    pub internals_path: PathBuf,
}

impl JsonFileSource {
    pub fn new(externals_path: impl Into<PathBuf>, internals_path: impl Into<PathBuf>) -> Self {
        Self {
            externals_path: externals_path.into(),
            internals_path: internals_path.into(),
        }
    }
}

impl RecordSource for JsonFileSource {
    fn load_externals(&self) -> Result<Vec<ExternalRecord>> {
        read_json_array(&self.externals_path, "external")
    }

    fn load_internals(&self) -> Result<Vec<InternalRecord>> {
        read_json_array(&self.internals_path, "internal")
    }
}

pub fn read_json_array<T: DeserializeOwned>(path: &Path, label: &str) -> Result<Vec<T>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} records from {}", label, path.display()))?;
    let records: Vec<T> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {} records in {}", label, path.display()))?;
    info!("📂 Read {} {} records from {}", records.len(), label, path.display());
    Ok(records)
}

/// In-memory collections, for callers that already hold the records.
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    pub externals: Vec<ExternalRecord>,
    pub internals: Vec<InternalRecord>,
}

impl VecSource {
    pub fn new(externals: Vec<ExternalRecord>, internals: Vec<InternalRecord>) -> Self {
        Self { externals, internals }
    }
}

impl RecordSource for VecSource {
    fn load_externals(&self) -> Result<Vec<ExternalRecord>> {
        Ok(self.externals.clone())
    }

    fn load_internals(&self) -> Result<Vec<InternalRecord>> {
        Ok(self.internals.clone())
    }
}

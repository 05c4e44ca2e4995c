// src/models/records.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// An opportunity record as exported from the SharePoint opportunity list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalRecord {
    #[serde(default)]
    pub opportunity_id: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub product_group: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub sales_code: Option<String>,
    /// Entry / registration date, kept as the raw exported string.
    #[serde(default)]
    pub entry_date: Option<String>,
    #[serde(default)]
    pub pipeline_stage: Option<String>,
}

/// A customer row from the transactional table. Column names follow the
/// table's dimension naming.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InternalRecord {
    #[serde(rename = "rowKey", default)]
    pub row_key: String,
    #[serde(rename = "custShortDimName", default)]
    pub customer_short_name: Option<String>,
    #[serde(rename = "custAppDimName", default)]
    pub application: Option<String>,
    #[serde(rename = "prodChipNameDimName", default)]
    pub chip_name: Option<String>,
    #[serde(rename = "salespersonDimName", default)]
    pub salesperson: Option<String>,
    #[serde(rename = "docDate", default)]
    pub doc_date: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub amount: Option<f64>,
}

/// Returns the trimmed value when the field is present and not blank.
pub fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl ExternalRecord {
    /// Identifier used in logs when the opportunity id is blank.
    pub fn display_id(&self) -> &str {
        if self.opportunity_id.trim().is_empty() {
            present(&self.customer_name).unwrap_or("<unnamed opportunity>")
        } else {
            &self.opportunity_id
        }
    }
}

/// Identity of an internal record for one-to-one tracking. Positions and
/// row keys live in separate variants, so no row key can collide with a
/// blank-keyed row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrackingKey {
    Row(String),
    Position(usize),
}

impl fmt::Display for TrackingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingKey::Row(key) => write!(f, "{}", key),
            TrackingKey::Position(index) => write!(f, "<row #{}>", index),
        }
    }
}

impl InternalRecord {
    /// Rows with a blank key fall back to their position so that two blank
    /// keys never collide.
    pub fn tracking_key(&self, index: usize) -> TrackingKey {
        let key = self.row_key.trim();
        if key.is_empty() {
            TrackingKey::Position(index)
        } else {
            TrackingKey::Row(key.to_string())
        }
    }
}

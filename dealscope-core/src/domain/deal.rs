//! Deal domain types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Custom field holding the out-of-scope country of a deal
pub const COUNTRY_FIELD_ID: u32 = 60;

/// Custom field holding the out-of-scope program of a deal
pub const PROGRAM_FIELD_ID: u32 = 61;

/// The custom fields the report is built from, in lookup order
pub const RECOGNIZED_FIELDS: [u32; 2] = [COUNTRY_FIELD_ID, PROGRAM_FIELD_ID];

/// A deal as returned by the CRM listing endpoint
///
/// Only the attributes the report cares about are typed; everything else the
/// upstream sends is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub owner: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One recognized custom field value attached to a deal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealCustomField {
    pub deal_id: String,
    pub custom_field_id: u32,
    /// Raw stored value (the option index, string-encoded)
    pub field_value: String,
    /// Human readable label resolved from the field's option list
    pub field_label: Option<String>,
}

impl DealCustomField {
    /// Label to report for this value, `"Unknown"` when none was resolved
    pub fn label_or_unknown(&self) -> &str {
        match self.field_label.as_deref() {
            Some(label) if !label.is_empty() => label,
            _ => "Unknown",
        }
    }
}

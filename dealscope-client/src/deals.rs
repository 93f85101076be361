//! Deal listing endpoint

use chrono::NaiveDate;
use dealscope_core::domain::deal::Deal;
use serde::{Deserialize, Deserializer};

use crate::CrmClient;
use crate::error::Result;

/// Upstream status code of a lost deal
pub const LOST_STATUS: &str = "2";

/// One page of the deal listing
#[derive(Debug, Clone, Deserialize)]
pub struct DealsPage {
    #[serde(default)]
    pub deals: Vec<Deal>,
    #[serde(default)]
    pub meta: Option<DealsMeta>,
}

/// Listing metadata
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DealsMeta {
    /// Total number of matching deals; the API sends it as a string
    #[serde(default, deserialize_with = "lenient_count")]
    pub total: Option<usize>,
}

impl DealsPage {
    /// Total number of matching deals reported by the API, if any
    pub fn total(&self) -> Option<usize> {
        self.meta.as_ref().and_then(|meta| meta.total)
    }
}

impl CrmClient {
    /// Fetch one page of lost deals created on or after `created_after`
    ///
    /// # Arguments
    /// * `created_after` - Earliest creation date (day precision)
    /// * `limit` - Page size
    /// * `offset` - Number of deals to skip
    pub async fn list_lost_deals(
        &self,
        created_after: NaiveDate,
        limit: usize,
        offset: usize,
    ) -> Result<DealsPage> {
        let endpoint = format!(
            "/api/3/deals?filters[status]={}&filters[created_after]={}&limit={}&offset={}",
            LOST_STATUS,
            created_after.format("%Y-%m-%d"),
            limit,
            offset
        );

        self.get(&endpoint).await
    }
}

/// Accepts a count encoded either as a JSON number or a numeric string
fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().map(|n| n as usize),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

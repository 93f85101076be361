//! In-memory CrmRepository used by the service tests

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use dealscope_client::{DealsMeta, DealsPage, UpstreamError};
use dealscope_core::domain::deal::{COUNTRY_FIELD_ID, Deal, PROGRAM_FIELD_ID};

use crate::repository::CrmRepository;

#[derive(Default)]
pub struct FakeCrm {
    pub deals: Vec<Deal>,
    /// Total reported in the listing meta; `None` omits the meta block
    pub reported_total: Option<usize>,
    pub values: HashMap<(String, u32), String>,
    pub options: HashMap<u32, HashMap<String, String>>,
    pub fail_listing: bool,
    pub panic_on_listing: bool,
    pub failing_deals: HashSet<String>,
    pub failing_options: HashSet<u32>,
    pub listing_calls: Mutex<Vec<(NaiveDate, usize, usize)>>,
    pub option_calls: AtomicUsize,
    /// Field value lookups currently running, and the highest count seen
    pub value_calls_in_flight: AtomicUsize,
    pub peak_value_calls: AtomicUsize,
}

pub fn deal(id: &str) -> Deal {
    Deal {
        id: id.to_string(),
        title: format!("Deal {}", id),
        status: "2".to_string(),
        owner: "1".to_string(),
        extra: Default::default(),
    }
}

impl FakeCrm {
    /// Country options 0 = Portugal, 1 = Spain; program options 0 = Golden Visa, 1 = Residency
    pub fn with_options(mut self) -> Self {
        self.options.insert(
            COUNTRY_FIELD_ID,
            [("0", "Portugal"), ("1", "Spain")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self.options.insert(
            PROGRAM_FIELD_ID,
            [("0", "Golden Visa"), ("1", "Residency")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    /// Adds a deal with the given raw country and program values
    pub fn with_deal(mut self, id: &str, country: Option<&str>, program: Option<&str>) -> Self {
        self.deals.push(deal(id));
        if let Some(country) = country {
            self.values
                .insert((id.to_string(), COUNTRY_FIELD_ID), country.to_string());
        }
        if let Some(program) = program {
            self.values
                .insert((id.to_string(), PROGRAM_FIELD_ID), program.to_string());
        }
        self.reported_total = Some(self.deals.len());
        self
    }

    /// Three deals: two (Portugal, Golden Visa) and one (Spain, Residency)
    pub fn three_deals() -> Self {
        Self::default()
            .with_options()
            .with_deal("1", Some("0"), Some("0"))
            .with_deal("2", Some("0"), Some("0"))
            .with_deal("3", Some("1"), Some("1"))
    }

    pub fn listing_calls(&self) -> Vec<(NaiveDate, usize, usize)> {
        self.listing_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CrmRepository for FakeCrm {
    async fn list_lost_deals(
        &self,
        created_after: NaiveDate,
        limit: usize,
        offset: usize,
    ) -> Result<DealsPage, UpstreamError> {
        self.listing_calls
            .lock()
            .unwrap()
            .push((created_after, limit, offset));

        if self.panic_on_listing {
            panic!("listing exploded");
        }
        if self.fail_listing {
            return Err(UpstreamError::RetriesExhausted {
                status: 503,
                attempts: 3,
            });
        }

        let deals = self.deals.iter().skip(offset).take(limit).cloned().collect();
        Ok(DealsPage {
            deals,
            meta: self.reported_total.map(|total| DealsMeta { total: Some(total) }),
        })
    }

    async fn deal_custom_field_value(
        &self,
        deal_id: &str,
        field_id: u32,
    ) -> Result<Option<String>, UpstreamError> {
        let running = self.value_calls_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_value_calls.fetch_max(running, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.value_calls_in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_deals.contains(deal_id) {
            return Err(UpstreamError::status(500, "boom"));
        }
        Ok(self.values.get(&(deal_id.to_string(), field_id)).cloned())
    }

    async fn field_option_labels(
        &self,
        field_id: u32,
    ) -> Result<HashMap<String, String>, UpstreamError> {
        self.option_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_options.contains(&field_id) {
            return Err(UpstreamError::status(404, "no such field"));
        }
        Ok(self.options.get(&field_id).cloned().unwrap_or_default())
    }
}

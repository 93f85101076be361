//! Custom field fetcher
//!
//! Resolves the country and program of every deal, translating raw option
//! indices into labels.

use std::collections::HashMap;
use std::sync::Arc;

use dealscope_client::{RateLimiter, UpstreamError};
use dealscope_core::domain::deal::{
    COUNTRY_FIELD_ID, DealCustomField, PROGRAM_FIELD_ID, RECOGNIZED_FIELDS,
};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tracing::{debug, warn};

use crate::repository::CrmRepository;
use crate::store::{FieldOptionCache, OptionLabels};

/// Default number of deals processed at the same time
pub const DEFAULT_DEAL_CONCURRENCY: usize = 50;

#[derive(Clone)]
pub struct CustomFieldFetcher {
    crm: Arc<dyn CrmRepository>,
    options: Arc<FieldOptionCache>,
    concurrency: usize,
}

impl CustomFieldFetcher {
    pub fn new(crm: Arc<dyn CrmRepository>, options: Arc<FieldOptionCache>) -> Self {
        Self {
            crm,
            options,
            concurrency: DEFAULT_DEAL_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Fetches the recognized custom fields of every deal
    ///
    /// Deals are processed with at most `concurrency` in flight.
    /// `on_progress(done, total)` is called once per settled deal, failed ones
    /// included. A deal whose lookup fails is logged and left out; a deal with
    /// no recognized value set is left out as well.
    pub async fn fetch_custom_fields_for_deals<F>(
        &self,
        deal_ids: &[String],
        mut on_progress: F,
    ) -> HashMap<String, Vec<DealCustomField>>
    where
        F: FnMut(usize, usize) + Send,
    {
        let (country, program) = tokio::join!(
            self.option_labels(COUNTRY_FIELD_ID),
            self.option_labels(PROGRAM_FIELD_ID)
        );
        let labels: HashMap<u32, OptionLabels> =
            HashMap::from([(COUNTRY_FIELD_ID, country), (PROGRAM_FIELD_ID, program)]);

        let limiter = RateLimiter::concurrency(self.concurrency);
        let total = deal_ids.len();

        let limiter = &limiter;
        let labels = &labels;
        let mut pending: FuturesUnordered<_> = deal_ids
            .iter()
            .map(move |deal_id| async move {
                let outcome = limiter
                    .execute(self.fetch_deal_fields(deal_id, labels))
                    .await;
                (deal_id, outcome)
            })
            .collect();

        let mut fields_by_deal = HashMap::new();
        let mut settled = 0;

        while let Some((deal_id, outcome)) = pending.next().await {
            match outcome {
                Ok(fields) if !fields.is_empty() => {
                    fields_by_deal.insert(deal_id.clone(), fields);
                }
                Ok(_) => debug!("Deal {} has no recognized custom fields", deal_id),
                Err(err) => warn!("Failed to fetch custom fields for deal {}: {}", deal_id, err),
            }

            settled += 1;
            on_progress(settled, total);
        }

        fields_by_deal
    }

    /// Looks up both recognized fields of one deal concurrently
    async fn fetch_deal_fields(
        &self,
        deal_id: &str,
        labels: &HashMap<u32, OptionLabels>,
    ) -> Result<Vec<DealCustomField>, UpstreamError> {
        let (country, program) = tokio::try_join!(
            self.crm.deal_custom_field_value(deal_id, COUNTRY_FIELD_ID),
            self.crm.deal_custom_field_value(deal_id, PROGRAM_FIELD_ID)
        )?;

        let fields = RECOGNIZED_FIELDS
            .into_iter()
            .zip([country, program])
            .filter_map(|(field_id, value)| {
                let value = value.filter(|v| !v.is_empty())?;
                let label = labels
                    .get(&field_id)
                    .and_then(|options| options.get(&value))
                    .cloned()
                    .unwrap_or_else(|| value.clone());

                Some(DealCustomField {
                    deal_id: deal_id.to_string(),
                    custom_field_id: field_id,
                    field_value: value,
                    field_label: Some(label),
                })
            })
            .collect();

        Ok(fields)
    }

    /// Option labels of a field, fetched once per process
    ///
    /// A failed lookup yields an empty mapping for this run only and is not
    /// cached, so the next run tries again.
    async fn option_labels(&self, field_id: u32) -> OptionLabels {
        if let Some(labels) = self.options.get(field_id) {
            return labels;
        }

        match self.crm.field_option_labels(field_id).await {
            Ok(labels) => {
                debug!("Resolved {} options for field {}", labels.len(), field_id);
                self.options.insert(field_id, labels)
            }
            Err(err) => {
                warn!("Failed to fetch options for field {}: {}", field_id, err);
                OptionLabels::default()
            }
        }
    }
}

//! Deal fetcher
//!
//! Pages through the lost deals of the lookback window.

use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use dealscope_client::UpstreamError;
use dealscope_core::domain::deal::Deal;
use tracing::debug;

use crate::repository::CrmRepository;

/// Deals requested per listing page
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Default size of the lost-deal window, in days
pub const DEFAULT_LOOKBACK_DAYS: u32 = 30;

#[derive(Clone)]
pub struct DealFetcher {
    crm: Arc<dyn CrmRepository>,
    page_size: usize,
    lookback_days: u32,
}

impl DealFetcher {
    pub fn new(crm: Arc<dyn CrmRepository>) -> Self {
        Self {
            crm,
            page_size: DEFAULT_PAGE_SIZE,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = days;
        self
    }

    pub fn lookback_days(&self) -> u32 {
        self.lookback_days
    }

    /// Fetches every lost deal created within the lookback window
    ///
    /// `on_progress(fetched, total)` is called after each non-empty page.
    /// `total` is the count reported by the API, or the number fetched so far
    /// when the API reports none.
    ///
    /// Any page failure aborts the whole fetch.
    pub async fn fetch_lost_deals<F>(&self, mut on_progress: F) -> Result<Vec<Deal>, UpstreamError>
    where
        F: FnMut(usize, usize) + Send,
    {
        let created_after = lookback_start(Utc::now().date_naive(), self.lookback_days);
        let mut deals: Vec<Deal> = Vec::new();
        let mut reported_total: Option<usize> = None;
        let mut offset = 0;

        loop {
            let page = self
                .crm
                .list_lost_deals(created_after, self.page_size, offset)
                .await?;

            if page.deals.is_empty() {
                break;
            }

            if let Some(total) = page.total().filter(|total| *total > 0) {
                reported_total = Some(total);
            }

            let page_len = page.deals.len();
            deals.extend(page.deals);
            debug!(
                "Fetched {} lost deals (offset {}, {} so far)",
                page_len,
                offset,
                deals.len()
            );

            on_progress(deals.len(), reported_total.unwrap_or(deals.len()));

            let reached_total = reported_total.is_some_and(|total| deals.len() >= total);
            if page_len < self.page_size || reached_total {
                break;
            }

            offset += self.page_size;
        }

        Ok(deals)
    }
}

/// First day of a window of `days` days ending today
pub fn lookback_start(today: NaiveDate, days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN)
}

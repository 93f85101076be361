//! CRM repository
//!
//! Handles the upstream operations the report pipeline needs:
//! - Listing lost deals page by page
//! - Reading one custom field value of a deal
//! - Resolving the option labels of a dropdown field

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use dealscope_client::{CrmClient, DealsPage, UpstreamError};

/// Repository trait for the upstream CRM
#[async_trait]
pub trait CrmRepository: Send + Sync {
    /// Fetches one page of lost deals created on or after `created_after`
    ///
    /// # Arguments
    /// * `created_after` - Earliest creation date
    /// * `limit` - Page size
    /// * `offset` - Number of deals to skip
    async fn list_lost_deals(
        &self,
        created_after: NaiveDate,
        limit: usize,
        offset: usize,
    ) -> Result<DealsPage, UpstreamError>;

    /// Fetches the raw value of one custom field on a deal
    ///
    /// Returns `None` when the field is not set.
    async fn deal_custom_field_value(
        &self,
        deal_id: &str,
        field_id: u32,
    ) -> Result<Option<String>, UpstreamError>;

    /// Fetches the stored value to label mapping of a custom field
    async fn field_option_labels(
        &self,
        field_id: u32,
    ) -> Result<HashMap<String, String>, UpstreamError>;
}

/// HTTP implementation of CrmRepository
#[derive(Debug, Clone)]
pub struct HttpCrmRepository {
    client: CrmClient,
}

impl HttpCrmRepository {
    pub fn new(client: CrmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CrmRepository for HttpCrmRepository {
    async fn list_lost_deals(
        &self,
        created_after: NaiveDate,
        limit: usize,
        offset: usize,
    ) -> Result<DealsPage, UpstreamError> {
        self.client.list_lost_deals(created_after, limit, offset).await
    }

    async fn deal_custom_field_value(
        &self,
        deal_id: &str,
        field_id: u32,
    ) -> Result<Option<String>, UpstreamError> {
        self.client.deal_custom_field_value(deal_id, field_id).await
    }

    async fn field_option_labels(
        &self,
        field_id: u32,
    ) -> Result<HashMap<String, String>, UpstreamError> {
        let meta = self.client.custom_field_meta(field_id).await?;
        Ok(meta.option_labels())
    }
}

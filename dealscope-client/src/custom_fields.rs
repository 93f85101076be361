//! Deal custom field endpoints

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

use crate::CrmClient;
use crate::error::Result;

/// Custom field values stored on one deal
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomFieldData {
    #[serde(default, rename = "dealCustomFieldData")]
    pub values: Vec<FieldValue>,
}

/// A single stored custom field value
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValue {
    #[serde(default, deserialize_with = "lenient_string")]
    pub field_value: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub deal_id: Option<String>,
}

/// Envelope of the custom field metadata endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct CustomFieldMetaResponse {
    #[serde(rename = "dealCustomFieldMetum")]
    pub meta: Option<CustomFieldMeta>,
}

/// Custom field definition
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldMeta {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub field_label: Option<String>,
    #[serde(default)]
    pub field_options: Option<Vec<String>>,
}

impl CustomFieldMeta {
    /// Maps stored values to option labels
    ///
    /// A dropdown stores the zero-based index of the chosen option, so the
    /// label at position `i` is keyed by `"i"`.
    pub fn option_labels(&self) -> HashMap<String, String> {
        self.field_options
            .iter()
            .flatten()
            .enumerate()
            .map(|(index, label)| (index.to_string(), label.clone()))
            .collect()
    }
}

impl CustomFieldData {
    /// First non-empty stored value
    pub fn first_value(&self) -> Option<&str> {
        self.values
            .iter()
            .filter_map(|v| v.field_value.as_deref())
            .find(|v| !v.is_empty())
    }
}

impl CrmClient {
    /// Fetch the value stored in one custom field of a deal
    ///
    /// # Returns
    /// The first non-empty value, or `None` when the field is not set
    pub async fn deal_custom_field_value(
        &self,
        deal_id: &str,
        field_id: u32,
    ) -> Result<Option<String>> {
        let endpoint = format!(
            "/api/3/deals/{}/dealCustomFieldData?filters[customFieldId]={}",
            deal_id, field_id
        );

        let data: CustomFieldData = self.get(&endpoint).await?;
        Ok(data.first_value().map(str::to_string))
    }

    /// Fetch the definition of a custom field, including its option labels
    pub async fn custom_field_meta(&self, field_id: u32) -> Result<CustomFieldMeta> {
        let endpoint = format!("/api/3/dealCustomFieldMeta/{}", field_id);
        let response: CustomFieldMetaResponse = self.get(&endpoint).await?;

        Ok(response.meta.unwrap_or_default())
    }
}

/// Accepts a string, a number or null
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_labels_use_index() {
        let meta = CustomFieldMeta {
            field_options: Some(vec!["Portugal".to_string(), "Spain".to_string()]),
            ..Default::default()
        };

        let labels = meta.option_labels();
        assert_eq!(labels.get("0").map(String::as_str), Some("Portugal"));
        assert_eq!(labels.get("1").map(String::as_str), Some("Spain"));
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn test_null_options() {
        let response: CustomFieldMetaResponse = serde_json::from_value(serde_json::json!({
            "dealCustomFieldMetum": { "id": "60", "fieldLabel": "Country", "fieldOptions": null }
        }))
        .unwrap();

        let meta = response.meta.unwrap();
        assert_eq!(meta.id.as_deref(), Some("60"));
        assert!(meta.option_labels().is_empty());
    }

    #[test]
    fn test_first_value_skips_empty() {
        let data: CustomFieldData = serde_json::from_value(serde_json::json!({
            "dealCustomFieldData": [
                { "fieldValue": "", "dealId": "9" },
                { "fieldValue": 2, "dealId": 9 }
            ]
        }))
        .unwrap();

        assert_eq!(data.first_value(), Some("2"));
        assert_eq!(CustomFieldData::default().first_value(), None);
    }
}

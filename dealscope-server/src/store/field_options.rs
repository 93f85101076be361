//! Field option labels, cached for the lifetime of the process
//!
//! Entries are never invalidated: option lists edited upstream are only
//! picked up after a restart.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Stored value to label mapping of one custom field
pub type OptionLabels = Arc<HashMap<String, String>>;

#[derive(Debug, Default)]
pub struct FieldOptionCache {
    fields: RwLock<HashMap<u32, OptionLabels>>,
}

impl FieldOptionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field_id: u32) -> Option<OptionLabels> {
        let fields = self.fields.read().unwrap_or_else(PoisonError::into_inner);
        fields.get(&field_id).cloned()
    }

    /// Caches the labels of a field and returns the shared copy
    pub fn insert(&self, field_id: u32, labels: HashMap<String, String>) -> OptionLabels {
        let labels = Arc::new(labels);
        let mut fields = self.fields.write().unwrap_or_else(PoisonError::into_inner);
        fields.insert(field_id, Arc::clone(&labels));
        labels
    }

    pub fn len(&self) -> usize {
        self.fields.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

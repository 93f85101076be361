//! Report domain types

use serde::{Deserialize, Serialize};

/// Number of lost deals sharing one (country, program) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub country: String,
    pub program: String,
    pub count: usize,
}

impl AggregatedResult {
    pub fn new(country: impl Into<String>, program: impl Into<String>, count: usize) -> Self {
        Self {
            country: country.into(),
            program: program.into(),
            count,
        }
    }
}

//! Aggregation of per-deal custom fields into report rows

use std::collections::{BTreeMap, HashMap};

use crate::domain::deal::{COUNTRY_FIELD_ID, DealCustomField, PROGRAM_FIELD_ID};
use crate::domain::report::AggregatedResult;

/// Groups deals by (country, program) and counts them
///
/// Only deals carrying both the country and the program field are counted.
/// Rows are ordered by count descending, then country and program ascending,
/// so the output does not depend on the iteration order of `fields_by_deal`.
pub fn aggregate_results(
    fields_by_deal: &HashMap<String, Vec<DealCustomField>>,
) -> Vec<AggregatedResult> {
    let mut counts: BTreeMap<(&str, &str), usize> = BTreeMap::new();

    for fields in fields_by_deal.values() {
        let country = fields.iter().find(|f| f.custom_field_id == COUNTRY_FIELD_ID);
        let program = fields.iter().find(|f| f.custom_field_id == PROGRAM_FIELD_ID);

        if let (Some(country), Some(program)) = (country, program) {
            *counts
                .entry((country.label_or_unknown(), program.label_or_unknown()))
                .or_default() += 1;
        }
    }

    let mut results: Vec<AggregatedResult> = counts
        .into_iter()
        .map(|((country, program), count)| AggregatedResult::new(country, program, count))
        .collect();

    results.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.country.cmp(&b.country))
            .then_with(|| a.program.cmp(&b.program))
    });

    results
}

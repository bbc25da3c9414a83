use std::collections::BTreeMap;

use crate::analysis::types::PurchaseRecord;

/// Partitions purchases by `category_key` into their usable unit prices.
///
/// Every category seen in the input gets an entry, even when none of its
/// prices survive; those become zero-sample categories downstream.
pub fn group_prices_by_category(records: &[PurchaseRecord]) -> BTreeMap<String, Vec<f64>> {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for record in records {
        let prices = groups.entry(record.category_key.clone()).or_default();
        if let Some(price) = record.usable_unit_price() {
            prices.push(price);
        }
    }
    groups
}

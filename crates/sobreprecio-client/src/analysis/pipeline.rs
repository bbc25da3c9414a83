use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::analysis::classify::classify_purchase;
use crate::analysis::grouping::group_prices_by_category;
use crate::analysis::policy::OverpricingPolicy;
use crate::analysis::reference::compute_category_statistics;
use crate::analysis::types::{CategoryStatistics, ClassificationResult, PurchaseRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub statistics: BTreeMap<String, CategoryStatistics>,
    pub classifications: Vec<ClassificationResult>,
}

impl PipelineOutput {
    pub fn flagged_count(&self) -> usize {
        self.classifications
            .iter()
            .filter(|result| result.is_expensive)
            .count()
    }
}

/// Runs grouping, reference ranges and classification over a full batch.
///
/// Every category's statistics are finalized before any purchase is
/// classified. Categories are computed in parallel and collected in key order;
/// classifications keep the input order of `records`.
pub fn run_pipeline(records: &[PurchaseRecord], policy: OverpricingPolicy) -> PipelineOutput {
    let groups = group_prices_by_category(records);

    let statistics = groups
        .par_iter()
        .map(|(category_key, prices)| {
            let stats = compute_category_statistics(category_key, prices, policy);
            (category_key.clone(), stats)
        })
        .collect::<Vec<(String, CategoryStatistics)>>()
        .into_iter()
        .collect::<BTreeMap<String, CategoryStatistics>>();

    for stats in statistics.values() {
        debug!(
            category_key = %stats.category_key,
            sample_count = stats.sample_count,
            q1 = ?stats.q1,
            q3 = ?stats.q3,
            max_acceptable_price = ?stats.max_acceptable_price,
            "category reference range computed"
        );
    }

    let classifications = records
        .par_iter()
        .map(|record| match statistics.get(&record.category_key) {
            Some(stats) => classify_purchase(record, stats, policy),
            None => classify_purchase(
                record,
                &CategoryStatistics::empty(&record.category_key),
                policy,
            ),
        })
        .collect::<Vec<ClassificationResult>>();

    let output = PipelineOutput {
        statistics,
        classifications,
    };
    info!(
        purchases = records.len(),
        categories = output.statistics.len(),
        flagged = output.flagged_count(),
        "overpricing pipeline finished"
    );
    output
}

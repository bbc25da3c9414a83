use crate::analysis::policy::OverpricingPolicy;
use crate::analysis::types::CategoryStatistics;

/// Computes the reference range for one category from its historical prices.
///
/// Quartiles use linear interpolation between closest ranks (the "type 7"
/// estimator): for probability `p` over `n` sorted values the rank is
/// `p * (n - 1)` and the result interpolates between the two bracketing
/// entries. `[10, 20, ..., 100]` gives Q1 = 32.5 and Q3 = 77.5.
pub fn compute_category_statistics(
    category_key: &str,
    prices: &[f64],
    policy: OverpricingPolicy,
) -> CategoryStatistics {
    let sorted = sorted_prices(prices);
    let (Some(q1), Some(q3)) = (quantile(&sorted, 0.25), quantile(&sorted, 0.75)) else {
        return CategoryStatistics::empty(category_key);
    };

    let iqr = (q3 - q1).max(0.0);
    CategoryStatistics {
        category_key: category_key.to_string(),
        sample_count: sorted.len(),
        q1: Some(q1),
        q3: Some(q3),
        iqr: Some(iqr),
        expected_min_range: Some(q1),
        expected_max_range: Some(q3),
        max_acceptable_price: Some(policy.max_acceptable_price(q3, iqr)),
        has_sufficient_data: policy.has_sufficient_history(sorted.len()),
    }
}

fn sorted_prices(prices: &[f64]) -> Vec<f64> {
    let mut values = prices
        .iter()
        .copied()
        .filter(|price| price.is_finite() && *price > 0.0)
        .collect::<Vec<f64>>();
    values.sort_by(|left, right| left.total_cmp(right));
    values
}

/// Type-7 quantile over an ascending slice. `None` for an empty slice.
pub fn quantile(sorted: &[f64], probability: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = probability.clamp(0.0, 1.0) * last as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let lower_value = *sorted.get(lower)?;
    let upper_value = *sorted.get(upper)?;
    Some(lower_value + (rank - lower as f64) * (upper_value - lower_value))
}

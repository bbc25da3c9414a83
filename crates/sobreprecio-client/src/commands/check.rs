use std::path::{Path, PathBuf};

use crate::analysis::classify::classify_purchase;
use crate::analysis::query::load_category_row;
use crate::analysis::types::{CategoryStatistics, PurchaseRecord};
use crate::config::EffectivePolicy;
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{CategoryRow, CheckData};
use crate::setup::load_setup;
use crate::state::open_connection;
use crate::{ClientError, ClientResult};

#[derive(Debug, Default)]
pub struct CheckRunOptions<'a> {
    pub category: String,
    pub unit_price: f64,
    pub quantity: f64,
    pub home_override: Option<&'a Path>,
}

pub fn run(category: &str, unit_price: f64, quantity: f64) -> ClientResult<SuccessEnvelope> {
    run_with_options(CheckRunOptions {
        category: category.to_string(),
        unit_price,
        quantity,
        home_override: None,
    })
}

/// Classifies a hypothetical purchase against the stored reference range
/// of its category. Nothing is written.
#[doc(hidden)]
pub fn run_with_options(options: CheckRunOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let category_key = options.category.trim().to_string();
    if category_key.is_empty() {
        return Err(ClientError::invalid_argument_for_command(
            "`--category` must not be empty.",
            Some("check"),
        ));
    }
    if !options.unit_price.is_finite() {
        return Err(ClientError::invalid_argument_for_command(
            "`--unit-price` must be a finite number.",
            Some("check"),
        ));
    }
    if !options.quantity.is_finite() || options.quantity < 0.0 {
        return Err(ClientError::invalid_argument_for_command(
            "`--quantity` must be a finite number >= 0.",
            Some("check"),
        ));
    }

    let setup = load_setup(options.home_override)?;
    let db_path = PathBuf::from(&setup.db_path);
    let connection = open_connection(&db_path)?;

    let Some(stored) = load_category_row(&connection, &db_path, &category_key)? else {
        return Err(ClientError::category_not_found(&category_key));
    };
    let row = rebase_on_policy(stored, &setup.policy);

    let record = PurchaseRecord {
        purchase_id: "check".to_string(),
        category_key: category_key.clone(),
        unit_price: Some(options.unit_price),
        quantity: options.quantity,
        municipality: String::new(),
        region: String::new(),
    };
    let result = classify_purchase(&record, &statistics_from_row(&row), setup.policy.policy);

    let data = CheckData {
        category_key,
        policy_version: setup.policy.version.to_string(),
        unit_price: options.unit_price,
        quantity: options.quantity,
        total_amount: options.unit_price * options.quantity,
        statistics: row,
        is_expensive: result.is_expensive,
        price_excess_amount: result.price_excess_amount,
        price_excess_percentage: result.price_excess_percentage,
        failed_gates: result.failed_gates,
    };

    success("check", data)
}

/// Quartiles do not depend on the policy; the limit and the history gate do.
/// Both are rebuilt so a changed `policy.json` applies before the next refresh.
fn rebase_on_policy(mut row: CategoryRow, policy: &EffectivePolicy) -> CategoryRow {
    let sample_count = usize::try_from(row.sample_count).unwrap_or(0);
    row.max_acceptable_price = row
        .q3
        .zip(row.iqr)
        .map(|(q3, iqr)| policy.policy.max_acceptable_price(q3, iqr));
    row.has_sufficient_data = policy.policy.has_sufficient_history(sample_count);
    row.policy_version = policy.version.to_string();
    row
}

fn statistics_from_row(row: &CategoryRow) -> CategoryStatistics {
    CategoryStatistics {
        category_key: row.category_key.clone(),
        sample_count: usize::try_from(row.sample_count).unwrap_or(0),
        q1: row.q1,
        q3: row.q3,
        iqr: row.iqr,
        expected_min_range: row.expected_min_range,
        expected_max_range: row.expected_max_range,
        max_acceptable_price: row.max_acceptable_price,
        has_sufficient_data: row.has_sufficient_data,
    }
}

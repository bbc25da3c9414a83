use std::path::Path;

use rusqlite::{Connection, Transaction, TransactionBehavior, params};
use tracing::{info, info_span};

use crate::ClientResult;
use crate::analysis::pipeline::run_pipeline;
use crate::analysis::query::{format_failed_gates, load_category_labels, load_purchase_records};
use crate::config::EffectivePolicy;
use crate::contracts::types::AnalysisRefreshData;
use crate::state::{map_sqlite_error, now_timestamp};

pub fn refresh_all(
    connection: &mut Connection,
    db_path: &Path,
    policy: &EffectivePolicy,
) -> ClientResult<AnalysisRefreshData> {
    let transaction = connection
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    let summary = refresh_all_internal(&transaction, db_path, policy)?;
    transaction
        .commit()
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    Ok(summary)
}

pub fn refresh_all_in_transaction(
    transaction: &Transaction<'_>,
    db_path: &Path,
    policy: &EffectivePolicy,
) -> ClientResult<AnalysisRefreshData> {
    refresh_all_internal(transaction, db_path, policy)
}

/// Recomputes every category reference range and every classification from
/// the stored purchases, replacing the previous materialization wholesale.
fn refresh_all_internal(
    connection: &Connection,
    db_path: &Path,
    policy: &EffectivePolicy,
) -> ClientResult<AnalysisRefreshData> {
    let span = info_span!("analysis_refresh", policy_version = policy.version);
    let _guard = span.enter();

    let records = load_purchase_records(connection, db_path)?;
    let labels = load_category_labels(connection, db_path)?;
    let output = run_pipeline(&records, policy.policy);

    connection
        .execute("DELETE FROM internal_purchase_classifications", [])
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    connection
        .execute("DELETE FROM internal_category_statistics", [])
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut sufficient_categories = 0_i64;
    if !output.statistics.is_empty() {
        let mut statement = connection
            .prepare(
                "INSERT INTO internal_category_statistics (
                    category_key,
                    category_label,
                    sample_count,
                    q1,
                    q3,
                    iqr,
                    expected_min_range,
                    expected_max_range,
                    max_acceptable_price,
                    has_sufficient_data,
                    policy_version
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )
            .map_err(|error| map_sqlite_error(db_path, &error))?;

        for stats in output.statistics.values() {
            statement
                .execute(params![
                    &stats.category_key,
                    labels.get(&stats.category_key),
                    stats.sample_count as i64,
                    stats.q1,
                    stats.q3,
                    stats.iqr,
                    stats.expected_min_range,
                    stats.expected_max_range,
                    stats.max_acceptable_price,
                    if stats.has_sufficient_data { 1_i64 } else { 0_i64 },
                    policy.version,
                ])
                .map_err(|error| map_sqlite_error(db_path, &error))?;
            if stats.has_sufficient_data {
                sufficient_categories += 1;
            }
        }
    }

    if !output.classifications.is_empty() {
        let mut statement = connection
            .prepare(
                "INSERT INTO internal_purchase_classifications (
                    purchase_id,
                    category_key,
                    is_expensive,
                    price_excess_amount,
                    price_excess_percentage,
                    failed_gates,
                    policy_version
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .map_err(|error| map_sqlite_error(db_path, &error))?;

        for result in &output.classifications {
            statement
                .execute(params![
                    &result.purchase_id,
                    &result.category_key,
                    if result.is_expensive { 1_i64 } else { 0_i64 },
                    result.price_excess_amount,
                    result.price_excess_percentage,
                    format_failed_gates(&result.failed_gates),
                    policy.version,
                ])
                .map_err(|error| map_sqlite_error(db_path, &error))?;
        }
    }

    let completed_at = now_timestamp();
    connection
        .execute(
            "INSERT INTO internal_meta (key, value) VALUES ('last_refresh_at', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [&completed_at],
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let summary = AnalysisRefreshData {
        policy_version: policy.version.to_string(),
        purchases: records.len() as i64,
        categories: output.statistics.len() as i64,
        sufficient_categories,
        flagged: output.flagged_count() as i64,
        completed_at,
    };
    info!(
        purchases = summary.purchases,
        categories = summary.categories,
        sufficient_categories = summary.sufficient_categories,
        flagged = summary.flagged,
        "analysis refreshed"
    );
    Ok(summary)
}

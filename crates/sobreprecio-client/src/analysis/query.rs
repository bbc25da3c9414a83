use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};

use crate::ClientResult;
use crate::analysis::types::{ClassificationResult, FlagGate, PurchaseRecord};
use crate::contracts::types::{CategoryRow, FlaggedRow};
use crate::state::map_sqlite_error;

/// Parameters for the category statistics listing.
#[derive(Debug, Clone, Default)]
pub struct CategoryQuery {
    pub category_key: Option<String>,
    pub sufficient_only: bool,
}

/// Parameters for the flagged purchase listing. `None` fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct FlaggedQuery {
    pub category_key: Option<String>,
    pub municipality: Option<String>,
    pub region: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<i64>,
}

pub fn load_purchase_records(
    connection: &Connection,
    db_path: &Path,
) -> ClientResult<Vec<PurchaseRecord>> {
    let mut statement = connection
        .prepare(
            "SELECT
                purchase_id,
                category_key,
                unit_price,
                quantity,
                municipality,
                region
             FROM internal_purchases
             ORDER BY purchase_id ASC",
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let rows_iter = statement
        .query_map([], |row| {
            Ok(PurchaseRecord {
                purchase_id: row.get(0)?,
                category_key: row.get(1)?,
                unit_price: row.get(2)?,
                quantity: row.get(3)?,
                municipality: row.get(4)?,
                region: row.get(5)?,
            })
        })
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut records = Vec::new();
    for row in rows_iter {
        records.push(row.map_err(|error| map_sqlite_error(db_path, &error))?);
    }
    Ok(records)
}

/// One display label per category; the lexically greatest non-null label wins.
pub fn load_category_labels(
    connection: &Connection,
    db_path: &Path,
) -> ClientResult<BTreeMap<String, String>> {
    let mut statement = connection
        .prepare(
            "SELECT category_key, MAX(category_label)
             FROM internal_purchases
             WHERE category_label IS NOT NULL
             GROUP BY category_key",
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let rows_iter = statement
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut labels = BTreeMap::new();
    for row in rows_iter {
        let (category_key, label) = row.map_err(|error| map_sqlite_error(db_path, &error))?;
        labels.insert(category_key, label);
    }
    Ok(labels)
}

pub fn load_classifications(
    connection: &Connection,
    db_path: &Path,
) -> ClientResult<Vec<ClassificationResult>> {
    let mut statement = connection
        .prepare(
            "SELECT
                purchase_id,
                category_key,
                is_expensive,
                price_excess_amount,
                price_excess_percentage,
                failed_gates
             FROM internal_purchase_classifications
             ORDER BY purchase_id ASC",
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let rows_iter = statement
        .query_map([], |row| {
            let failed_gates: String = row.get(5)?;
            Ok(ClassificationResult {
                purchase_id: row.get(0)?,
                category_key: row.get(1)?,
                is_expensive: row.get::<_, i64>(2)? == 1,
                price_excess_amount: row.get(3)?,
                price_excess_percentage: row.get(4)?,
                failed_gates: parse_failed_gates(&failed_gates),
            })
        })
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut results = Vec::new();
    for row in rows_iter {
        results.push(row.map_err(|error| map_sqlite_error(db_path, &error))?);
    }
    Ok(results)
}

pub fn load_category_rows(
    connection: &Connection,
    db_path: &Path,
    query: &CategoryQuery,
) -> ClientResult<Vec<CategoryRow>> {
    let mut statement = connection
        .prepare(
            "SELECT
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
             FROM internal_category_statistics
             WHERE (?1 IS NULL OR category_key = ?1)
               AND (?2 = 0 OR has_sufficient_data = 1)
             ORDER BY sample_count DESC, category_key ASC",
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let rows_iter = statement
        .query_map(
            params![query.category_key, i64::from(query.sufficient_only)],
            category_row_from_sql,
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut rows = Vec::new();
    for row in rows_iter {
        rows.push(row.map_err(|error| map_sqlite_error(db_path, &error))?);
    }
    Ok(rows)
}

pub fn load_category_row(
    connection: &Connection,
    db_path: &Path,
    category_key: &str,
) -> ClientResult<Option<CategoryRow>> {
    connection
        .query_row(
            "SELECT
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
             FROM internal_category_statistics
             WHERE category_key = ?1",
            [category_key],
            category_row_from_sql,
        )
        .optional()
        .map_err(|error| map_sqlite_error(db_path, &error))
}

pub fn count_flagged(
    connection: &Connection,
    db_path: &Path,
    query: &FlaggedQuery,
) -> ClientResult<i64> {
    connection
        .query_row(
            "SELECT COUNT(*)
             FROM internal_purchase_classifications AS c
             JOIN internal_purchases AS p ON p.purchase_id = c.purchase_id
             WHERE c.is_expensive = 1
               AND (?1 IS NULL OR p.category_key = ?1)
               AND (?2 IS NULL OR p.municipality = ?2)
               AND (?3 IS NULL OR p.region = ?3)
               AND (?4 IS NULL OR p.purchased_at >= ?4)
               AND (?5 IS NULL OR p.purchased_at <= ?5)",
            params![
                query.category_key,
                query.municipality,
                query.region,
                query.from,
                query.to,
            ],
            |row| row.get::<_, i64>(0),
        )
        .map_err(|error| map_sqlite_error(db_path, &error))
}

pub fn load_flagged_rows(
    connection: &Connection,
    db_path: &Path,
    query: &FlaggedQuery,
) -> ClientResult<Vec<FlaggedRow>> {
    let mut statement = connection
        .prepare(
            "SELECT
                p.purchase_id,
                p.external_id,
                p.category_key,
                p.category_label,
                p.municipality,
                p.region,
                p.supplier,
                p.item_description,
                p.purchased_at,
                p.unit_price,
                p.quantity,
                s.max_acceptable_price,
                c.price_excess_amount,
                c.price_excess_percentage
             FROM internal_purchase_classifications AS c
             JOIN internal_purchases AS p ON p.purchase_id = c.purchase_id
             LEFT JOIN internal_category_statistics AS s ON s.category_key = c.category_key
             WHERE c.is_expensive = 1
               AND (?1 IS NULL OR p.category_key = ?1)
               AND (?2 IS NULL OR p.municipality = ?2)
               AND (?3 IS NULL OR p.region = ?3)
               AND (?4 IS NULL OR p.purchased_at >= ?4)
               AND (?5 IS NULL OR p.purchased_at <= ?5)
             ORDER BY c.price_excess_amount * p.quantity DESC, p.purchase_id ASC
             LIMIT ?6",
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let rows_iter = statement
        .query_map(
            params![
                query.category_key,
                query.municipality,
                query.region,
                query.from,
                query.to,
                query.limit.unwrap_or(-1),
            ],
            |row| {
                let unit_price: f64 = row.get(9)?;
                let quantity: f64 = row.get(10)?;
                Ok(FlaggedRow {
                    purchase_id: row.get(0)?,
                    external_id: row.get(1)?,
                    category_key: row.get(2)?,
                    category_label: row.get(3)?,
                    municipality: row.get(4)?,
                    region: row.get(5)?,
                    supplier: row.get(6)?,
                    item_description: row.get(7)?,
                    purchased_at: row.get(8)?,
                    unit_price,
                    quantity,
                    total_amount: unit_price * quantity,
                    max_acceptable_price: row.get(11)?,
                    price_excess_amount: row.get(12)?,
                    price_excess_percentage: row.get(13)?,
                })
            },
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut rows = Vec::new();
    for row in rows_iter {
        rows.push(row.map_err(|error| map_sqlite_error(db_path, &error))?);
    }
    Ok(rows)
}

pub(crate) fn format_failed_gates(gates: &[FlagGate]) -> String {
    gates
        .iter()
        .map(|gate| gate.as_str())
        .collect::<Vec<&str>>()
        .join(",")
}

fn parse_failed_gates(value: &str) -> Vec<FlagGate> {
    value
        .split(',')
        .filter_map(|code| FlagGate::parse(code.trim()))
        .collect()
}

fn category_row_from_sql(row: &rusqlite::Row<'_>) -> rusqlite::Result<CategoryRow> {
    Ok(CategoryRow {
        category_key: row.get(0)?,
        category_label: row.get(1)?,
        sample_count: row.get(2)?,
        q1: row.get(3)?,
        q3: row.get(4)?,
        iqr: row.get(5)?,
        expected_min_range: row.get(6)?,
        expected_max_range: row.get(7)?,
        max_acceptable_price: row.get(8)?,
        has_sufficient_data: row.get::<_, i64>(9)? == 1,
        policy_version: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::{format_failed_gates, parse_failed_gates};
    use crate::analysis::types::FlagGate;

    #[test]
    fn failed_gates_survive_storage_encoding() {
        let gates = vec![FlagGate::WithinThreshold, FlagGate::OrderBelowMinimum];
        let encoded = format_failed_gates(&gates);
        assert_eq!(encoded, "within_threshold,order_below_minimum");
        assert_eq!(parse_failed_gates(&encoded), gates);
        assert!(parse_failed_gates("").is_empty());
    }
}

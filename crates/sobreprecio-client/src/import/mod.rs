pub(crate) mod input;
pub(crate) mod parse;
pub(crate) mod persist;
pub(crate) mod validate;

use std::collections::BTreeSet;

use rusqlite::TransactionBehavior;
use tracing::info;

use crate::analysis::refresh::refresh_all_in_transaction;
use crate::contracts::types::{AnalysisRefreshData, ImportSummary};
use crate::setup::SetupContext;
use crate::state::{map_sqlite_error, open_connection};
use crate::{ClientError, ClientResult};

pub(crate) const REQUIRED_IMPORT_FIELDS: [&str; 4] =
    ["category_key", "quantity", "municipality", "region"];

pub(crate) const OPTIONAL_IMPORT_FIELDS: [&str; 6] = [
    "unit_price",
    "external_id",
    "category_label",
    "supplier",
    "item_description",
    "purchased_at",
];

#[derive(Debug, Clone)]
pub(crate) struct CanonicalPurchase {
    pub external_id: Option<String>,
    pub category_key: String,
    pub category_label: Option<String>,
    pub unit_price: Option<f64>,
    pub quantity: f64,
    pub municipality: String,
    pub region: String,
    pub supplier: Option<String>,
    pub item_description: Option<String>,
    pub purchased_at: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct ImportExecutionResult {
    pub dry_run: bool,
    pub import_id: Option<String>,
    pub message: String,
    pub summary: ImportSummary,
    pub source_used: String,
    pub categories_in_batch: i64,
    pub rows_without_usable_price: i64,
    pub refresh: Option<AnalysisRefreshData>,
}

pub(crate) fn execute(
    setup: &SetupContext,
    path: Option<String>,
    dry_run: bool,
    stdin_override: Option<String>,
) -> ClientResult<ImportExecutionResult> {
    let resolved_source = input::resolve_source(path, stdin_override)?;
    let parsed_rows = parse::parse_source(&resolved_source.content)?;
    let validated = validate::validate_rows(parsed_rows)?;

    let categories_in_batch = validated
        .rows
        .iter()
        .map(|row| row.category_key.as_str())
        .collect::<BTreeSet<&str>>()
        .len() as i64;
    let rows_without_usable_price = validated
        .rows
        .iter()
        .filter(|row| !row.unit_price.is_some_and(|price| price > 0.0))
        .count() as i64;
    let source_used = resolved_source.source_kind.as_str().to_string();

    if dry_run {
        return Ok(ImportExecutionResult {
            dry_run: true,
            import_id: None,
            message: "Validation passed. No purchases were written.".to_string(),
            summary: validated.summary,
            source_used,
            categories_in_batch,
            rows_without_usable_price,
            refresh: None,
        });
    }

    let db_path = setup.db_path.clone();
    let mut connection = open_connection(&db_path)?;
    let transaction = connection
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|error| map_sqlite_error(&db_path, &error))?;

    let persisted = persist::persist_import(
        &transaction,
        &db_path,
        persist::PersistInput {
            rows: &validated.rows,
            rows_read: validated.summary.rows_read,
            rows_valid: validated.summary.rows_valid,
            rows_invalid: validated.summary.rows_invalid,
            source_kind: resolved_source.source_kind.as_str(),
            source_ref: resolved_source.source_ref.as_deref(),
        },
    )?;
    let refresh = refresh_all_in_transaction(&transaction, &db_path, &setup.policy)?;
    transaction
        .commit()
        .map_err(|error| map_sqlite_error(&db_path, &error))?;

    info!(
        import_id = %persisted.import_id,
        inserted = persisted.inserted,
        flagged = refresh.flagged,
        "import committed"
    );

    let mut summary = validated.summary;
    summary.inserted = persisted.inserted;
    Ok(ImportExecutionResult {
        dry_run: false,
        import_id: Some(persisted.import_id),
        message: format!(
            "Imported {} purchases and refreshed overpricing analysis.",
            persisted.inserted
        ),
        summary,
        source_used,
        categories_in_batch,
        rows_without_usable_price,
        refresh: Some(refresh),
    })
}

pub(crate) fn invalid_input_error(message: &str) -> ClientError {
    ClientError::invalid_argument_with_recovery(
        message,
        vec![
            "Provide purchases as a JSON array or a CSV with a header row.".to_string(),
            "Run `sobreprecio import create --help` for the import schema.".to_string(),
        ],
    )
}

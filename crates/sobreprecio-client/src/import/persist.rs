use std::path::Path;

use rusqlite::{Transaction, params};
use ulid::Ulid;

use crate::ClientResult;
use crate::import::CanonicalPurchase;
use crate::state::{map_sqlite_error, now_timestamp};

#[derive(Debug, Clone)]
pub(crate) struct PersistResult {
    pub(crate) import_id: String,
    pub(crate) inserted: i64,
}

pub(crate) struct PersistInput<'a> {
    pub(crate) rows: &'a [CanonicalPurchase],
    pub(crate) rows_read: i64,
    pub(crate) rows_valid: i64,
    pub(crate) rows_invalid: i64,
    pub(crate) source_kind: &'a str,
    pub(crate) source_ref: Option<&'a str>,
}

/// Writes one import run and its purchases inside the caller's transaction.
pub(crate) fn persist_import(
    transaction: &Transaction<'_>,
    db_path: &Path,
    input: PersistInput<'_>,
) -> ClientResult<PersistResult> {
    let import_id = format!("imp_{}", Ulid::new());
    let timestamp = now_timestamp();

    transaction
        .execute(
            "INSERT INTO internal_import_runs (
                import_id,
                status,
                created_at,
                committed_at,
                rows_read,
                rows_valid,
                rows_invalid,
                inserted,
                source_kind,
                source_ref
             ) VALUES (?1, 'committed', ?2, ?2, ?3, ?4, ?5, 0, ?6, ?7)",
            params![
                &import_id,
                &timestamp,
                input.rows_read,
                input.rows_valid,
                input.rows_invalid,
                input.source_kind,
                input.source_ref,
            ],
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut inserted = 0_i64;
    {
        let mut statement = transaction
            .prepare(
                "INSERT INTO internal_purchases (
                    purchase_id,
                    import_id,
                    external_id,
                    category_key,
                    category_label,
                    unit_price,
                    quantity,
                    municipality,
                    region,
                    supplier,
                    item_description,
                    purchased_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )
            .map_err(|error| map_sqlite_error(db_path, &error))?;

        for row in input.rows {
            statement
                .execute(params![
                    format!("pur_{}", Ulid::new()),
                    &import_id,
                    &row.external_id,
                    &row.category_key,
                    &row.category_label,
                    row.unit_price,
                    row.quantity,
                    &row.municipality,
                    &row.region,
                    &row.supplier,
                    &row.item_description,
                    &row.purchased_at,
                ])
                .map_err(|error| map_sqlite_error(db_path, &error))?;
            inserted += 1;
        }
    }

    transaction
        .execute(
            "UPDATE internal_import_runs SET inserted = ?1 WHERE import_id = ?2",
            params![inserted, &import_id],
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    Ok(PersistResult {
        import_id,
        inserted,
    })
}

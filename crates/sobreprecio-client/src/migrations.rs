use std::collections::HashMap;

use rusqlite::Connection;
use rusqlite_migration::{M, Migrations};

const BOOTSTRAP_SQL: &str = include_str!("migrations/0001_bootstrap.sql");

pub const REQUIRED_VIEW_NAMES: [&str; 3] =
    ["v1_purchases", "v1_category_statistics", "v1_classifications"];

pub const REQUIRED_INDEX_NAMES: [&str; 3] = [
    "idx_internal_purchases_category_key",
    "idx_internal_purchases_region_municipality",
    "idx_internal_purchase_classifications_flagged",
];

pub const REQUIRED_TABLE_NAMES: [&str; 5] = [
    "internal_meta",
    "internal_import_runs",
    "internal_purchases",
    "internal_category_statistics",
    "internal_purchase_classifications",
];

pub fn run_pending(conn: &mut Connection) -> rusqlite_migration::Result<()> {
    let migrations = Migrations::new(vec![M::up(BOOTSTRAP_SQL)]);
    migrations.to_latest(conn)
}

/// Idempotent SQL that recreates one view or index from the bootstrap script.
pub fn safe_repair_statement(statement_name: &str) -> Option<String> {
    parse_safe_repair_statements().remove(statement_name)
}

fn parse_safe_repair_statements() -> HashMap<String, String> {
    let mut blocks: HashMap<String, String> = HashMap::new();
    let mut active_name: Option<String> = None;
    let mut active_sql = String::new();

    for line in BOOTSTRAP_SQL.lines() {
        let trimmed = line.trim();

        if let Some(name) = trimmed.strip_prefix("-- sobreprecio:safe_repair:start:") {
            active_name = Some(name.to_string());
            active_sql.clear();
            continue;
        }

        if let Some(name) = trimmed.strip_prefix("-- sobreprecio:safe_repair:end:") {
            if let Some(active) = &active_name
                && active == name
            {
                blocks.insert(name.to_string(), active_sql.trim().to_string());
            }
            active_name = None;
            active_sql.clear();
            continue;
        }

        if active_name.is_some() {
            active_sql.push_str(line);
            active_sql.push('\n');
        }
    }

    blocks
}

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use serde_json::{Value, json};
use sobreprecio_client::commands::import::{self, ImportRunOptions};
use sobreprecio_client::{ClientResult, SuccessEnvelope};
use tempfile::{TempDir, tempdir};

pub const STEADY_CATEGORY: &str = "42131606";
pub const STEADY_LABEL: &str = "Guantes quirúrgicos";

pub fn temp_home() -> std::io::Result<(TempDir, PathBuf)> {
    let dir = tempdir()?;
    let home = dir.path().join("store-home");
    fs::create_dir_all(&home)?;
    Ok((dir, home))
}

pub fn purchase(
    category_key: &str,
    unit_price: Option<f64>,
    quantity: f64,
    municipality: &str,
    region: &str,
) -> Value {
    json!({
        "category_key": category_key,
        "category_label": STEADY_LABEL,
        "unit_price": unit_price,
        "quantity": quantity,
        "municipality": municipality,
        "region": region,
        "purchased_at": "2024-03-15",
    })
}

/// Eleven ordinary purchases at 100 CLP, one 500 CLP order and one
/// 15000 CLP order. Only the 15000 CLP order clears every gate.
pub fn steady_category_with_spikes() -> Vec<Value> {
    let mut rows = (0..11)
        .map(|_| purchase(STEADY_CATEGORY, Some(100.0), 1.0, "Iquique", "Tarapacá"))
        .collect::<Vec<Value>>();
    rows.push(purchase(STEADY_CATEGORY, Some(500.0), 10.0, "Iquique", "Tarapacá"));
    rows.push(purchase(
        STEADY_CATEGORY,
        Some(15_000.0),
        7.0,
        "Arica",
        "Arica y Parinacota",
    ));
    rows
}

pub fn write_fixture_json(dir: &Path, name: &str, rows: &[Value]) -> std::io::Result<PathBuf> {
    let path = dir.join(name);
    let body = serde_json::to_string_pretty(rows).map_err(std::io::Error::other)?;
    fs::write(&path, body)?;
    Ok(path)
}

pub fn try_import(home: &Path, path: &Path, dry_run: bool) -> ClientResult<SuccessEnvelope> {
    import::run_with_options(ImportRunOptions {
        path: Some(path.display().to_string()),
        dry_run,
        home_override: Some(home),
        stdin_override: None,
    })
}

pub fn import_rows(home: &Path, rows: &[Value]) -> Value {
    let fixture = write_fixture_json(home, "purchases.json", rows);
    assert!(fixture.is_ok());
    if let Ok(path) = fixture {
        let result = try_import(home, &path, false);
        assert!(result.is_ok());
        if let Ok(success) = result {
            return success.data;
        }
    }
    Value::Null
}

pub fn query_count(db_path: &Path, sql: &str) -> i64 {
    let connection = Connection::open(db_path);
    assert!(connection.is_ok());
    if let Ok(conn) = connection {
        return conn
            .query_row(sql, [], |row| row.get::<_, i64>(0))
            .unwrap_or(-1);
    }
    -1
}

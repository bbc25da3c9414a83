use std::io;

use serde_json::Value;

use super::analysis_text::refresh_summary_rows;
use super::format::{
    self, Column, format_local_timestamp, render_table_or_blocks, terminal_width, value_i64,
    value_str,
};

pub fn render_import_run(data: &Value) -> io::Result<String> {
    let dry_run = data
        .get("dry_run")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let summary = data
        .get("summary")
        .filter(|value| value.is_object())
        .ok_or_else(|| io::Error::other("import output requires summary"))?;

    let mut lines = Vec::new();
    if dry_run {
        lines.push("Dry-run validation completed successfully.".to_string());
    } else {
        lines.push("Import completed successfully.".to_string());
    }

    lines.push(String::new());
    lines.push("Summary:".to_string());

    let mut entries = Vec::new();
    if !dry_run {
        entries.push((
            "Import ID:",
            value_str(data, "import_id").unwrap_or("unknown").to_string(),
        ));
    }
    entries.push(("Source:", value_str(data, "source_used").unwrap_or("-").to_string()));
    entries.push(("Rows read:", value_i64(summary, "rows_read").to_string()));
    entries.push(("Rows valid:", value_i64(summary, "rows_valid").to_string()));
    entries.push(("Rows invalid:", value_i64(summary, "rows_invalid").to_string()));
    entries.push(("Inserted:", value_i64(summary, "inserted").to_string()));
    entries.push((
        "Categories in file:",
        value_i64(data, "categories_in_batch").to_string(),
    ));
    entries.push((
        "Rows without price:",
        value_i64(data, "rows_without_usable_price").to_string(),
    ));
    lines.extend(format::key_value_rows(&entries, 2));

    if let Some(refresh) = data.get("refresh").filter(|value| value.is_object()) {
        lines.push(String::new());
        lines.push("Analysis:".to_string());
        lines.extend(format::key_value_rows(&refresh_summary_rows(refresh), 2));
    }

    lines.push(String::new());
    lines.push(data_range_line(data.get("data_range")));

    if dry_run {
        lines.push(String::new());
        lines.push("No rows were written because this was a dry run.".to_string());
    }

    lines.push(String::new());
    lines.push("What to do next:".to_string());
    if dry_run {
        lines.push("  1. Run `sobreprecio import create <path>` to commit these rows.".to_string());
    } else {
        lines.push("  1. Run `sobreprecio flagged` to review overpriced purchases.".to_string());
        lines.push("  2. Run `sobreprecio rollup --level region` for rates per region.".to_string());
    }

    Ok(lines.join("\n"))
}

pub fn render_import_list(data: &Value) -> io::Result<String> {
    let rows = data
        .get("rows")
        .and_then(Value::as_array)
        .ok_or_else(|| io::Error::other("import list output requires rows"))?;

    if rows.is_empty() {
        return Ok([
            "No imports found yet.",
            "",
            "Run your first import:",
            "  1. sobreprecio import create --help",
            "  2. sobreprecio import create --dry-run <path>",
            "  3. sobreprecio import create <path>",
        ]
        .join("\n"));
    }

    let count_label = if rows.len() == 1 {
        "1 import found.".to_string()
    } else {
        format!("{} imports found.", rows.len())
    };

    let columns = [
        Column::left("Import ID"),
        Column::left("Status"),
        Column::left("Created (local)"),
        Column::left("Source"),
        Column::right("Rows Read"),
        Column::right("Inserted"),
    ];

    // Rows arrive newest first from the store.
    let table_rows = rows
        .iter()
        .map(|row| {
            vec![
                value_str(row, "import_id").unwrap_or("unknown").to_string(),
                value_str(row, "status").unwrap_or("unknown").to_string(),
                format_local_timestamp(value_str(row, "created_at")),
                value_str(row, "source_ref")
                    .or_else(|| value_str(row, "source_kind"))
                    .unwrap_or("-")
                    .to_string(),
                value_i64(row, "rows_read").to_string(),
                value_i64(row, "inserted").to_string(),
            ]
        })
        .collect::<Vec<Vec<String>>>();

    let mut lines = vec![count_label, String::new()];
    lines.extend(render_table_or_blocks(
        &columns,
        &table_rows,
        terminal_width(),
        "Import",
    ));
    Ok(lines.join("\n"))
}

pub(super) fn data_range_line(range: Option<&Value>) -> String {
    let Some(range) = range else {
        return "No purchases stored yet.".to_string();
    };
    let purchases = value_i64(range, "purchases");
    if purchases == 0 {
        return "No purchases stored yet.".to_string();
    }
    match (value_str(range, "earliest"), value_str(range, "latest")) {
        (Some(earliest), Some(latest)) => {
            format!("Data covers {purchases} purchases from {earliest} to {latest}.")
        }
        _ => format!("Data covers {purchases} purchases."),
    }
}

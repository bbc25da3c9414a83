use std::io;

use serde_json::Value;

use super::format::{
    Column, format_clp, format_local_timestamp, format_optional_clp, format_percentage,
    format_quantity, key_value_rows, render_table_or_blocks, terminal_width, value_f64, value_i64,
    value_str,
};
use super::import_text::data_range_line;

pub(super) fn refresh_summary_rows(refresh: &Value) -> Vec<(&'static str, String)> {
    vec![
        (
            "Policy:",
            value_str(refresh, "policy_version").unwrap_or("unknown").to_string(),
        ),
        ("Purchases:", value_i64(refresh, "purchases").to_string()),
        (
            "Categories:",
            format!(
                "{} ({} with enough history)",
                value_i64(refresh, "categories"),
                value_i64(refresh, "sufficient_categories")
            ),
        ),
        ("Flagged:", value_i64(refresh, "flagged").to_string()),
    ]
}

pub fn render_refresh(data: &Value) -> io::Result<String> {
    if !data.is_object() {
        return Err(io::Error::other("analysis refresh output requires an object"));
    }

    let mut lines = vec![
        "Analysis refreshed.".to_string(),
        String::new(),
        "Summary:".to_string(),
    ];
    let mut entries = refresh_summary_rows(data);
    entries.push((
        "Completed:",
        format_local_timestamp(value_str(data, "completed_at")),
    ));
    lines.extend(key_value_rows(&entries, 2));
    Ok(lines.join("\n"))
}

pub fn render_categories(data: &Value) -> io::Result<String> {
    let rows = rows_of(data, "categories")?;

    if rows.is_empty() {
        let mut lines = vec!["No category statistics found.".to_string(), String::new()];
        if data.get("sufficient_only").and_then(Value::as_bool) == Some(true) {
            lines.push(
                "No category has more than the minimum number of priced purchases yet.".to_string(),
            );
        } else {
            lines.push("Import purchases first: sobreprecio import create <path>".to_string());
        }
        return Ok(lines.join("\n"));
    }

    let columns = [
        Column::left("Category"),
        Column::left("Label"),
        Column::right("Samples"),
        Column::right("Q1"),
        Column::right("Q3"),
        Column::right("Max Acceptable"),
        Column::left("Enough History"),
    ];

    let table_rows = rows
        .iter()
        .map(|row| {
            let sufficient = row
                .get("has_sufficient_data")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            vec![
                value_str(row, "category_key").unwrap_or("").to_string(),
                value_str(row, "category_label").unwrap_or("-").to_string(),
                value_i64(row, "sample_count").to_string(),
                format_optional_clp(value_f64(row, "q1")),
                format_optional_clp(value_f64(row, "q3")),
                format_optional_clp(value_f64(row, "max_acceptable_price")),
                if sufficient { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect::<Vec<Vec<String>>>();

    let mut lines = vec![count_line(rows.len(), "category", "categories"), String::new()];
    lines.extend(render_table_or_blocks(
        &columns,
        &table_rows,
        terminal_width(),
        "Category",
    ));
    Ok(lines.join("\n"))
}

pub fn render_flagged(data: &Value) -> io::Result<String> {
    let rows = rows_of(data, "flagged")?;
    let total = value_i64(data, "total");

    if rows.is_empty() {
        return Ok([
            "No overpriced purchases found for these filters.".to_string(),
            String::new(),
            data_range_line(data.get("data_range")),
        ]
        .join("\n"));
    }

    let header = if total > rows.len() as i64 {
        format!(
            "Showing {} of {total} overpriced purchases, largest excess first.",
            rows.len()
        )
    } else {
        let noun = if rows.len() == 1 { "purchase" } else { "purchases" };
        format!("{} overpriced {noun}, largest excess first.", rows.len())
    };

    let columns = [
        Column::left("Date"),
        Column::left("Category"),
        Column::left("Municipality"),
        Column::left("Supplier"),
        Column::right("Unit Price"),
        Column::right("Qty"),
        Column::right("Max Acceptable"),
        Column::right("Excess"),
        Column::right("Excess %"),
    ];

    let table_rows = rows
        .iter()
        .map(|row| {
            vec![
                value_str(row, "purchased_at").unwrap_or("-").to_string(),
                value_str(row, "category_label")
                    .or_else(|| value_str(row, "category_key"))
                    .unwrap_or("")
                    .to_string(),
                format!(
                    "{}, {}",
                    value_str(row, "municipality").unwrap_or(""),
                    value_str(row, "region").unwrap_or("")
                ),
                value_str(row, "supplier").unwrap_or("-").to_string(),
                format_optional_clp(value_f64(row, "unit_price")),
                format_quantity(value_f64(row, "quantity").unwrap_or(0.0)),
                format_optional_clp(value_f64(row, "max_acceptable_price")),
                format_optional_clp(value_f64(row, "price_excess_amount")),
                format_percentage(value_f64(row, "price_excess_percentage")),
            ]
        })
        .collect::<Vec<Vec<String>>>();

    let mut lines = vec![header, String::new()];
    lines.extend(render_table_or_blocks(
        &columns,
        &table_rows,
        terminal_width(),
        "Purchase",
    ));
    lines.push(String::new());
    lines.push(data_range_line(data.get("data_range")));
    Ok(lines.join("\n"))
}

pub fn render_rollup(data: &Value) -> io::Result<String> {
    let rows = rows_of(data, "rollup")?;
    let level = value_str(data, "level").unwrap_or("municipality");

    if rows.is_empty() {
        return Ok([
            "No purchases to aggregate yet.",
            "",
            "Import purchases first: sobreprecio import create <path>",
        ]
        .join("\n"));
    }

    let jurisdiction = match level {
        "region" => "Region",
        "country" => "Country",
        _ => "Municipality",
    };
    let columns = [
        Column::left(jurisdiction),
        Column::right("Purchases"),
        Column::right("Flagged"),
        Column::right("Rate"),
        Column::right("Flagged Total"),
    ];

    let table_rows = rows
        .iter()
        .map(|row| {
            vec![
                value_str(row, "label").unwrap_or("").to_string(),
                value_i64(row, "purchases").to_string(),
                value_i64(row, "flagged").to_string(),
                format_percentage(value_f64(row, "overpricing_rate")),
                format_clp(value_f64(row, "flagged_total_amount").unwrap_or(0.0)),
            ]
        })
        .collect::<Vec<Vec<String>>>();

    let mut lines = vec![
        format!(
            "Overpricing rate by {level} ({}), highest first.",
            value_str(data, "policy_version").unwrap_or("unknown")
        ),
        String::new(),
    ];
    lines.extend(render_table_or_blocks(
        &columns,
        &table_rows,
        terminal_width(),
        jurisdiction,
    ));
    Ok(lines.join("\n"))
}

pub fn render_check(data: &Value) -> io::Result<String> {
    let statistics = data
        .get("statistics")
        .filter(|value| value.is_object())
        .ok_or_else(|| io::Error::other("check output requires statistics"))?;
    let expensive = data
        .get("is_expensive")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let mut lines = vec![if expensive {
        "This purchase would be flagged as overpriced.".to_string()
    } else {
        "This purchase would not be flagged.".to_string()
    }];

    lines.push(String::new());
    lines.push("Purchase:".to_string());
    lines.extend(key_value_rows(
        &[
            (
                "Category:",
                value_str(data, "category_key").unwrap_or("").to_string(),
            ),
            (
                "Unit price:",
                format_optional_clp(value_f64(data, "unit_price")),
            ),
            (
                "Quantity:",
                format_quantity(value_f64(data, "quantity").unwrap_or(0.0)),
            ),
            (
                "Order total:",
                format_optional_clp(value_f64(data, "total_amount")),
            ),
            (
                "Excess per unit:",
                format_optional_clp(value_f64(data, "price_excess_amount")),
            ),
            (
                "Excess %:",
                format_percentage(value_f64(data, "price_excess_percentage")),
            ),
        ],
        2,
    ));

    lines.push(String::new());
    lines.push("Reference range:".to_string());
    lines.extend(key_value_rows(
        &[
            (
                "Policy:",
                value_str(data, "policy_version").unwrap_or("unknown").to_string(),
            ),
            ("Samples:", value_i64(statistics, "sample_count").to_string()),
            (
                "Expected range:",
                format!(
                    "{} to {}",
                    format_optional_clp(value_f64(statistics, "expected_min_range")),
                    format_optional_clp(value_f64(statistics, "expected_max_range"))
                ),
            ),
            (
                "Max acceptable:",
                format_optional_clp(value_f64(statistics, "max_acceptable_price")),
            ),
        ],
        2,
    ));

    let gates = data
        .get("failed_gates")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    if !gates.is_empty() {
        lines.push(String::new());
        lines.push("Not flagged because:".to_string());
        for gate in gates.iter().filter_map(Value::as_str) {
            lines.push(format!("  - {}", describe_gate(gate)));
        }
    }

    Ok(lines.join("\n"))
}

pub fn render_policy(data: &Value) -> io::Result<String> {
    if !data.is_object() {
        return Err(io::Error::other("policy output requires an object"));
    }

    let config_path = value_str(data, "config_path").unwrap_or("unknown");
    let config_state = if data.get("config_present").and_then(Value::as_bool) == Some(true) {
        format!("{config_path} (loaded)")
    } else {
        format!("{config_path} (not present, defaults in use)")
    };

    let mut lines = vec![
        format!(
            "Effective policy: {}",
            value_str(data, "version").unwrap_or("unknown")
        ),
        String::new(),
    ];
    lines.extend(key_value_rows(
        &[
            (
                "IQR multiplier:",
                value_f64(data, "iqr_multiplier")
                    .map(|value| value.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            (
                "History floor:",
                format!("more than {} priced purchases", value_i64(data, "history_floor")),
            ),
            (
                "Excess floor:",
                format!(
                    "more than {} per unit",
                    format_optional_clp(value_f64(data, "excess_floor"))
                ),
            ),
            (
                "Order total floor:",
                format!(
                    "more than {}",
                    format_optional_clp(value_f64(data, "order_total_floor"))
                ),
            ),
            (
                "Quantiles:",
                value_str(data, "quantile_method").unwrap_or("-").to_string(),
            ),
            ("Config file:", config_state),
        ],
        2,
    ));
    Ok(lines.join("\n"))
}

fn describe_gate(gate: &str) -> String {
    match gate {
        "no_usable_price" => "the unit price is missing, zero or negative".to_string(),
        "no_reference_data" => "the category has no priced purchases to compare with".to_string(),
        "within_threshold" => "the unit price does not exceed the max acceptable price".to_string(),
        "insufficient_history" => "the category does not have enough priced purchases".to_string(),
        "excess_not_material" => "the excess per unit is below the materiality floor".to_string(),
        "order_below_minimum" => "the order total is below the minimum order size".to_string(),
        other => other.to_string(),
    }
}

fn rows_of<'a>(data: &'a Value, command: &str) -> io::Result<&'a Vec<Value>> {
    data.get("rows")
        .and_then(Value::as_array)
        .ok_or_else(|| io::Error::other(format!("{command} output requires rows")))
}

fn count_line(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("1 {singular} found.")
    } else {
        format!("{count} {plural} found.")
    }
}

use std::cmp;

use chrono::{Local, TimeZone};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy)]
pub struct Column<'a> {
    pub name: &'a str,
    pub align: Align,
}

impl<'a> Column<'a> {
    pub const fn left(name: &'a str) -> Self {
        Self {
            name,
            align: Align::Left,
        }
    }

    pub const fn right(name: &'a str) -> Self {
        Self {
            name,
            align: Align::Right,
        }
    }
}

const INDENT: usize = 2;
const COLUMN_GAP: usize = 2;
const MIN_TABLE_COLUMN_WIDTH: usize = 8;

pub fn terminal_width() -> usize {
    let from_env = std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(120);
    cmp::max(from_env, 40)
}

/// Chilean peso amount with `.` thousands separators, e.g. `$1.234.567`.
/// Fractions are rounded to whole pesos.
pub fn format_clp(value: f64) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }
    let rounded = value.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    let digits = format!("{:.0}", rounded.abs());
    format!("{sign}${}", group_thousands(&digits, '.'))
}

pub fn format_optional_clp(value: Option<f64>) -> String {
    value.map(format_clp).unwrap_or_else(|| "-".to_string())
}

pub fn format_percentage(value: Option<f64>) -> String {
    match value {
        Some(number) if number.is_finite() => format!("{number:.1}%"),
        _ => "-".to_string(),
    }
}

/// Quantities print without a fraction when they are whole.
pub fn format_quantity(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return group_thousands(&format!("{value:.0}"), '.');
    }
    format!("{value}")
}

fn group_thousands(digits: &str, separator: char) -> String {
    let (sign, body) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };
    let mut grouped = String::with_capacity(body.len() + body.len() / 3);
    for (index, ch) in body.chars().enumerate() {
        if index > 0 && (body.len() - index) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped}")
}

pub fn value_str<'a>(row: &'a Value, key: &str) -> Option<&'a str> {
    row.get(key).and_then(Value::as_str)
}

pub fn value_i64(row: &Value, key: &str) -> i64 {
    row.get(key).and_then(Value::as_i64).unwrap_or(0)
}

pub fn value_f64(row: &Value, key: &str) -> Option<f64> {
    row.get(key).and_then(Value::as_f64)
}

/// Unix-seconds strings as stored in the database, shown in local time.
pub fn format_local_timestamp(raw: Option<&str>) -> String {
    let Some(seconds) = raw.and_then(|value| value.parse::<i64>().ok()) else {
        return "unknown".to_string();
    };
    let Some(local_dt) = Local.timestamp_opt(seconds, 0).single() else {
        return "unknown".to_string();
    };
    local_dt.format("%Y-%m-%d %H:%M:%S %:z").to_string()
}

pub fn key_value_rows(entries: &[(&str, String)], indent: usize) -> Vec<String> {
    let label_width = entries
        .iter()
        .map(|(label, _)| display_width(label))
        .max()
        .unwrap_or(0);
    let padding = " ".repeat(indent);

    entries
        .iter()
        .map(|(label, value)| format!("{padding}{}  {value}", pad_right(label, label_width)))
        .collect()
}

/// Renders an aligned table, or labelled blocks when the columns cannot fit
/// `max_width`. Long cells wrap instead of truncating.
pub fn render_table_or_blocks(
    columns: &[Column<'_>],
    rows: &[Vec<String>],
    max_width: usize,
    block_label: &str,
) -> Vec<String> {
    if columns.is_empty() {
        return Vec::new();
    }

    let minimums = columns
        .iter()
        .map(|column| cmp::max(display_width(column.name), MIN_TABLE_COLUMN_WIDTH))
        .collect::<Vec<usize>>();
    let gap_total = COLUMN_GAP * columns.len().saturating_sub(1);
    let budget = max_width
        .saturating_sub(INDENT)
        .saturating_sub(gap_total);

    let natural = natural_column_widths(columns, rows);
    let Some(widths) = fit_widths_to_budget(&natural, &minimums, budget) else {
        return render_blocks(columns, rows, block_label);
    };

    let header = columns
        .iter()
        .map(|column| column.name.to_string())
        .collect::<Vec<String>>();
    let mut output = vec![format_row(columns, &header, &widths)];

    for row in rows {
        let wrapped = widths
            .iter()
            .enumerate()
            .map(|(index, width)| wrap_text(row.get(index).map_or("", String::as_str), *width))
            .collect::<Vec<Vec<String>>>();
        let height = wrapped.iter().map(Vec::len).max().unwrap_or(1);

        for line_index in 0..height {
            let cells = wrapped
                .iter()
                .map(|chunks| chunks.get(line_index).cloned().unwrap_or_default())
                .collect::<Vec<String>>();
            output.push(format_row(columns, &cells, &widths));
        }
    }

    output
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn pad_right(value: &str, width: usize) -> String {
    let padding = width.saturating_sub(display_width(value));
    format!("{value}{}", " ".repeat(padding))
}

fn pad_left(value: &str, width: usize) -> String {
    let padding = width.saturating_sub(display_width(value));
    format!("{}{value}", " ".repeat(padding))
}

fn natural_column_widths(columns: &[Column<'_>], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths = columns
        .iter()
        .map(|column| display_width(column.name))
        .collect::<Vec<usize>>();

    for row in rows {
        for (slot, value) in widths.iter_mut().zip(row.iter()) {
            *slot = cmp::max(*slot, display_width(value));
        }
    }

    widths
}

fn fit_widths_to_budget(
    natural: &[usize],
    minimums: &[usize],
    budget: usize,
) -> Option<Vec<usize>> {
    if natural.len() != minimums.len() || minimums.iter().sum::<usize>() > budget {
        return None;
    }

    let mut widths = natural.to_vec();
    let mut total = widths.iter().sum::<usize>();

    while total > budget {
        let mut reduced = false;
        for (width, floor) in widths.iter_mut().zip(minimums.iter()) {
            if total <= budget {
                break;
            }
            if *width > *floor {
                *width -= 1;
                total -= 1;
                reduced = true;
            }
        }
        if !reduced {
            return None;
        }
    }

    Some(widths)
}

fn format_row(columns: &[Column<'_>], cells: &[String], widths: &[usize]) -> String {
    let pieces = columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let width = widths.get(index).copied().unwrap_or(MIN_TABLE_COLUMN_WIDTH);
            let value = cells.get(index).map_or("", String::as_str);
            match column.align {
                Align::Left => pad_right(value, width),
                Align::Right => pad_left(value, width),
            }
        })
        .collect::<Vec<String>>();

    format!("{}{}", " ".repeat(INDENT), pieces.join("  ").trim_end())
}

fn wrap_text(value: &str, width: usize) -> Vec<String> {
    if width == 0 || display_width(value) <= width {
        return vec![value.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();

    for word in value.split_whitespace() {
        let word_width = display_width(word);
        if !current.is_empty() && display_width(&current) + 1 + word_width <= width {
            current.push(' ');
            current.push_str(word);
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if word_width <= width {
            current.push_str(word);
        } else {
            lines.extend(split_long_token(word, width));
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        return split_long_token(value, width);
    }
    lines
}

fn split_long_token(token: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![token.to_string()];
    }
    token
        .chars()
        .collect::<Vec<char>>()
        .chunks(width)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect()
}

fn render_blocks(columns: &[Column<'_>], rows: &[Vec<String>], block_label: &str) -> Vec<String> {
    let labels = columns
        .iter()
        .map(|column| format!("{}:", column.name))
        .collect::<Vec<String>>();
    let label_width = labels
        .iter()
        .map(|label| display_width(label))
        .max()
        .unwrap_or(0);

    let mut output = Vec::new();
    for (row_index, row) in rows.iter().enumerate() {
        if row_index > 0 {
            output.push(String::new());
        }
        output.push(format!("  {block_label} {}:", row_index + 1));
        for (column_index, label) in labels.iter().enumerate() {
            let value = row.get(column_index).map_or("", String::as_str);
            output.push(format!("    {}  {value}", pad_right(label, label_width)));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::{
        Column, fit_widths_to_budget, format_clp, format_local_timestamp, format_percentage,
        format_quantity, key_value_rows, render_table_or_blocks, split_long_token,
    };

    #[test]
    fn clp_amounts_use_dot_separators() {
        assert_eq!(format_clp(0.0), "$0");
        assert_eq!(format_clp(999.4), "$999");
        assert_eq!(format_clp(15_000.0), "$15.000");
        assert_eq!(format_clp(1_234_567.5), "$1.234.568");
        assert_eq!(format_clp(-10_500.0), "-$10.500");
        assert_eq!(format_clp(f64::NAN), "-");
    }

    #[test]
    fn percentages_and_quantities_render_compactly() {
        assert_eq!(format_percentage(Some(14_900.0)), "14900.0%");
        assert_eq!(format_percentage(None), "-");
        assert_eq!(format_quantity(1200.0), "1.200");
        assert_eq!(format_quantity(2.5), "2.5");
    }

    #[test]
    fn unparseable_timestamps_render_unknown() {
        assert_eq!(format_local_timestamp(None), "unknown");
        assert_eq!(format_local_timestamp(Some("ayer")), "unknown");
        assert_ne!(format_local_timestamp(Some("1710460800")), "unknown");
    }

    #[test]
    fn key_value_rows_align_labels() {
        let rows = key_value_rows(
            &[
                ("Rows read:", "100".to_string()),
                ("Categorías:", "3".to_string()),
            ],
            2,
        );

        assert_eq!(rows[0], "  Rows read:   100");
        assert_eq!(rows[1], "  Categorías:  3");
    }

    #[test]
    fn table_renderer_aligns_accented_cells() {
        let columns = [Column::left("Municipality"), Column::right("Rate")];
        let rows = vec![
            vec!["Los Ángeles".to_string(), "12.5%".to_string()],
            vec!["Arica".to_string(), "0.0%".to_string()],
        ];

        let rendered = render_table_or_blocks(&columns, &rows, 80, "Row");
        assert_eq!(rendered[0], "  Municipality   Rate");
        assert_eq!(rendered[1], "  Los Ángeles   12.5%");
        assert_eq!(rendered[2], "  Arica          0.0%");
    }

    #[test]
    fn table_renderer_wraps_without_truncating() {
        let columns = [Column::left("Description"), Column::right("Excess")];
        let rows = vec![vec![
            "GUANTE NITRILO TALLA M CAJA CIEN UNIDADES".to_string(),
            "$14.900".to_string(),
        ]];

        let rendered = render_table_or_blocks(&columns, &rows, 40, "Row");
        assert!(rendered[0].contains("Description"));
        assert!(rendered.iter().any(|line| line.contains("GUANTE")));
        assert!(rendered.iter().any(|line| line.contains("UNIDADES")));
        assert!(rendered.iter().any(|line| line.contains("$14.900")));
    }

    #[test]
    fn narrow_width_falls_back_to_blocks() {
        let columns = [
            Column::left("Category"),
            Column::right("Unit price"),
            Column::left("Region"),
        ];
        let rows = vec![vec![
            "42131606".to_string(),
            "$15.000".to_string(),
            "Arica y Parinacota".to_string(),
        ]];

        let rendered = render_table_or_blocks(&columns, &rows, 20, "Purchase");
        assert_eq!(rendered[0], "  Purchase 1:");
        assert!(rendered[1].contains("Category:"));
        assert!(rendered[3].contains("Arica y Parinacota"));
    }

    #[test]
    fn fit_widths_respects_column_name_minimums() {
        let fitted = fit_widths_to_budget(&[20, 12], &[8, 10], 19);
        assert_eq!(fitted, Some(vec![9, 10]));
        assert_eq!(fit_widths_to_budget(&[20, 12], &[8, 10], 17), None);
    }

    #[test]
    fn split_long_token_handles_unicode() {
        assert_eq!(
            split_long_token("ñandú", 3),
            vec!["ñan".to_string(), "dú".to_string()]
        );
    }
}

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::contracts::types::{ImportIssue, ImportSummary};
use crate::import::CanonicalPurchase;
use crate::import::parse::ParsedRow;
use crate::{ClientError, ClientResult};

#[derive(Debug, Clone)]
pub(crate) struct ValidatedRows {
    pub(crate) rows: Vec<CanonicalPurchase>,
    pub(crate) summary: ImportSummary,
}

/// Validates every row; any issue rejects the whole batch.
///
/// Non-positive unit prices pass validation. They carry no market signal and
/// are dropped by the category grouper instead.
pub(crate) fn validate_rows(parsed_rows: Vec<ParsedRow>) -> ClientResult<ValidatedRows> {
    let total_rows = parsed_rows.len();
    let mut rows = Vec::new();
    let mut issues = Vec::new();

    for raw in parsed_rows {
        let mut row_issues = Vec::new();

        let category_key = validate_required_string(
            raw.row,
            "category_key",
            raw.category_key,
            &mut row_issues,
        );
        let unit_price = validate_unit_price(raw.row, raw.unit_price, &mut row_issues);
        let quantity = validate_quantity(raw.row, raw.quantity, &mut row_issues);
        let municipality = validate_required_string(
            raw.row,
            "municipality",
            raw.municipality,
            &mut row_issues,
        );
        let region = validate_required_string(raw.row, "region", raw.region, &mut row_issues);
        let purchased_at = validate_purchased_at(raw.row, raw.purchased_at, &mut row_issues);

        if row_issues.is_empty() {
            rows.push(CanonicalPurchase {
                external_id: normalize_optional(raw.external_id),
                category_key: category_key.unwrap_or_default(),
                category_label: normalize_optional(raw.category_label),
                unit_price,
                quantity: quantity.unwrap_or_default(),
                municipality: municipality.unwrap_or_default(),
                region: region.unwrap_or_default(),
                supplier: normalize_optional(raw.supplier),
                item_description: normalize_optional(raw.item_description),
                purchased_at,
            });
        } else {
            issues.extend(row_issues);
        }
    }

    let summary = ImportSummary {
        rows_read: total_rows as i64,
        rows_valid: rows.len() as i64,
        rows_invalid: issues
            .iter()
            .map(|issue| issue.row)
            .collect::<HashSet<i64>>()
            .len() as i64,
        inserted: 0,
    };

    if !issues.is_empty() {
        return Err(ClientError::import_validation_failed(summary, issues));
    }

    Ok(ValidatedRows { rows, summary })
}

fn validate_required_string(
    row: i64,
    field: &str,
    value: Option<String>,
    issues: &mut Vec<ImportIssue>,
) -> Option<String> {
    let normalized = normalize_optional(value);
    if normalized.is_none() {
        issues.push(missing_field(row, field, "non-empty string"));
    }
    normalized
}

fn validate_unit_price(
    row: i64,
    value: Option<String>,
    issues: &mut Vec<ImportIssue>,
) -> Option<f64> {
    let candidate = normalize_optional(value)?;
    match parse_finite_number(&candidate) {
        Some(price) => Some(price),
        None => {
            issues.push(ImportIssue {
                row,
                field: "unit_price".to_string(),
                code: "invalid_number".to_string(),
                description: format!("unit_price must be numeric; got \"{candidate}\""),
                expected: Some("number in CLP (e.g. 12990)".to_string()),
                received: Some(candidate),
            });
            None
        }
    }
}

fn validate_quantity(row: i64, value: Option<String>, issues: &mut Vec<ImportIssue>) -> Option<f64> {
    let Some(candidate) = normalize_optional(value) else {
        issues.push(missing_field(row, "quantity", "number >= 0"));
        return None;
    };

    let Some(quantity) = parse_finite_number(&candidate) else {
        issues.push(ImportIssue {
            row,
            field: "quantity".to_string(),
            code: "invalid_number".to_string(),
            description: format!("quantity must be numeric; got \"{candidate}\""),
            expected: Some("number >= 0".to_string()),
            received: Some(candidate),
        });
        return None;
    };

    if quantity < 0.0 {
        issues.push(ImportIssue {
            row,
            field: "quantity".to_string(),
            code: "negative_quantity".to_string(),
            description: format!("quantity must not be negative; got {candidate}"),
            expected: Some("number >= 0".to_string()),
            received: Some(candidate),
        });
        return None;
    }

    Some(quantity)
}

fn validate_purchased_at(
    row: i64,
    value: Option<String>,
    issues: &mut Vec<ImportIssue>,
) -> Option<String> {
    let candidate = normalize_optional(value)?;
    if candidate.len() == 10 && NaiveDate::parse_from_str(&candidate, "%Y-%m-%d").is_ok() {
        return Some(candidate);
    }

    issues.push(ImportIssue {
        row,
        field: "purchased_at".to_string(),
        code: "invalid_date".to_string(),
        description: format!("purchased_at must be YYYY-MM-DD; got \"{candidate}\""),
        expected: Some("YYYY-MM-DD".to_string()),
        received: Some(candidate),
    });
    None
}

fn parse_finite_number(value: &str) -> Option<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
}

fn missing_field(row: i64, field: &str, expected: &str) -> ImportIssue {
    ImportIssue {
        row,
        field: field.to_string(),
        code: "missing_required_field".to_string(),
        description: format!("{field} must be present and non-empty."),
        expected: Some(expected.to_string()),
        received: Some(String::new()),
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    let raw = value?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::validate_rows;
    use crate::import::parse::ParsedRow;

    fn parsed(row: i64, unit_price: Option<&str>, quantity: Option<&str>) -> ParsedRow {
        ParsedRow {
            row,
            category_key: Some(" 42131606 ".to_string()),
            unit_price: unit_price.map(str::to_string),
            quantity: quantity.map(str::to_string),
            municipality: Some("Coquimbo".to_string()),
            region: Some("Coquimbo".to_string()),
            ..ParsedRow::default()
        }
    }

    #[test]
    fn accepts_missing_and_non_positive_prices() {
        let validated = validate_rows(vec![
            parsed(1, None, Some("2")),
            parsed(2, Some("0"), Some("2")),
            parsed(3, Some("-15"), Some("2")),
            parsed(4, Some("1990.5"), Some("0")),
        ]);
        assert!(validated.is_ok());
        if let Ok(result) = validated {
            assert_eq!(result.summary.rows_valid, 4);
            assert_eq!(result.rows[0].unit_price, None);
            assert_eq!(result.rows[1].unit_price, Some(0.0));
            assert_eq!(result.rows[2].unit_price, Some(-15.0));
            assert_eq!(result.rows[3].category_key, "42131606");
        }
    }

    #[test]
    fn rejects_batch_with_any_invalid_row() {
        let validated = validate_rows(vec![
            parsed(1, Some("abc"), Some("2")),
            parsed(2, Some("100"), Some("-1")),
            parsed(3, Some("100"), None),
            parsed(4, Some("100"), Some("3")),
        ]);
        assert!(validated.is_err());
        if let Err(error) = validated {
            assert_eq!(error.code, "import_validation_failed");
            let data = error.data.unwrap_or_default();
            assert_eq!(data["summary"]["rows_invalid"], serde_json::json!(3));
            let codes = data["issues"]
                .as_array()
                .cloned()
                .unwrap_or_default()
                .iter()
                .filter_map(|issue| issue["code"].as_str().map(str::to_string))
                .collect::<Vec<String>>();
            assert_eq!(
                codes,
                vec![
                    "invalid_number".to_string(),
                    "negative_quantity".to_string(),
                    "missing_required_field".to_string(),
                ]
            );
        }
    }

    #[test]
    fn rejects_invalid_purchase_dates() {
        let mut row = parsed(1, Some("100"), Some("1"));
        row.purchased_at = Some("2024-02-30".to_string());
        assert!(validate_rows(vec![row]).is_err());

        let mut valid = parsed(1, Some("100"), Some("1"));
        valid.purchased_at = Some("2024-02-29".to_string());
        assert!(validate_rows(vec![valid]).is_ok());
    }

    #[test]
    fn rejects_non_finite_prices() {
        assert!(validate_rows(vec![parsed(1, Some("inf"), Some("1"))]).is_err());
        assert!(validate_rows(vec![parsed(1, Some("NaN"), Some("1"))]).is_err());
    }
}

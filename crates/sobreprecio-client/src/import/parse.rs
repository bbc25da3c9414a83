use std::collections::HashMap;

use serde_json::Value;

use crate::import::{OPTIONAL_IMPORT_FIELDS, REQUIRED_IMPORT_FIELDS, invalid_input_error};
use crate::{ClientError, ClientResult};

#[derive(Debug, Clone, Default)]
pub(crate) struct ParsedRow {
    pub(crate) row: i64,
    pub(crate) external_id: Option<String>,
    pub(crate) category_key: Option<String>,
    pub(crate) category_label: Option<String>,
    pub(crate) unit_price: Option<String>,
    pub(crate) quantity: Option<String>,
    pub(crate) municipality: Option<String>,
    pub(crate) region: Option<String>,
    pub(crate) supplier: Option<String>,
    pub(crate) item_description: Option<String>,
    pub(crate) purchased_at: Option<String>,
}

pub(crate) fn parse_source(content: &str) -> ClientResult<Vec<ParsedRow>> {
    let trimmed = content.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Err(invalid_input_error("Import source is empty."));
    }

    if looks_like_ndjson(trimmed) {
        return Err(ClientError::invalid_import_format(
            "NDJSON is not supported. Provide a JSON array or CSV.",
            "ndjson",
        ));
    }

    if trimmed.starts_with('[') {
        return parse_json_array(trimmed);
    }

    if serde_json::from_str::<Value>(trimmed).is_ok() {
        return Err(ClientError::invalid_import_format(
            "JSON input must be a top-level array of purchase objects.",
            "json_non_array",
        ));
    }

    if looks_like_csv(trimmed) {
        return parse_csv(trimmed);
    }

    Err(ClientError::invalid_import_format(
        "Unsupported import format. Provide a JSON array or CSV with headers.",
        "unknown",
    ))
}

fn parse_json_array(content: &str) -> ClientResult<Vec<ParsedRow>> {
    let parsed = serde_json::from_str::<Value>(content)
        .map_err(|_| invalid_input_error("Invalid JSON input. Provide a valid JSON array."))?;

    let Some(items) = parsed.as_array() else {
        return Err(invalid_input_error(
            "JSON input must be a top-level array of purchase objects.",
        ));
    };

    let mut rows = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let Some(object) = item.as_object() else {
            return Err(invalid_input_error(
                "JSON array entries must all be objects with purchase fields.",
            ));
        };

        rows.push(ParsedRow {
            row: (index as i64) + 1,
            external_id: read_optional_string(object.get("external_id")),
            category_key: read_optional_string(object.get("category_key")),
            category_label: read_optional_string(object.get("category_label")),
            unit_price: read_optional_string(object.get("unit_price")),
            quantity: read_optional_string(object.get("quantity")),
            municipality: read_optional_string(object.get("municipality")),
            region: read_optional_string(object.get("region")),
            supplier: read_optional_string(object.get("supplier")),
            item_description: read_optional_string(object.get("item_description")),
            purchased_at: read_optional_string(object.get("purchased_at")),
        });
    }

    Ok(rows)
}

fn parse_csv(content: &str) -> ClientResult<Vec<ParsedRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|_| invalid_input_error("CSV header row is missing or unreadable."))?
        .iter()
        .map(|value| value.trim().to_string())
        .collect::<Vec<String>>();

    if !headers_are_valid(&headers) {
        return Err(ClientError::import_schema_mismatch(
            expected_headers(),
            headers,
        ));
    }

    let index_by_name = headers
        .iter()
        .enumerate()
        .map(|(index, name)| (name.to_string(), index))
        .collect::<HashMap<String, usize>>();

    let mut rows = Vec::new();
    for (row_index, result_row) in reader.records().enumerate() {
        let record =
            result_row.map_err(|_| invalid_input_error("CSV rows are malformed or not UTF-8."))?;

        rows.push(ParsedRow {
            row: (row_index as i64) + 1,
            external_id: value_for(&record, &index_by_name, "external_id"),
            category_key: value_for(&record, &index_by_name, "category_key"),
            category_label: value_for(&record, &index_by_name, "category_label"),
            unit_price: value_for(&record, &index_by_name, "unit_price"),
            quantity: value_for(&record, &index_by_name, "quantity"),
            municipality: value_for(&record, &index_by_name, "municipality"),
            region: value_for(&record, &index_by_name, "region"),
            supplier: value_for(&record, &index_by_name, "supplier"),
            item_description: value_for(&record, &index_by_name, "item_description"),
            purchased_at: value_for(&record, &index_by_name, "purchased_at"),
        });
    }

    Ok(rows)
}

fn value_for(
    record: &csv::StringRecord,
    index_by_name: &HashMap<String, usize>,
    field_name: &str,
) -> Option<String> {
    let index = index_by_name.get(field_name)?;
    let value = record.get(*index)?;
    Some(value.to_string())
}

fn read_optional_string(value: Option<&Value>) -> Option<String> {
    let current = value?;

    if current.is_null() {
        return None;
    }

    if let Some(string_value) = current.as_str() {
        return Some(string_value.to_string());
    }

    Some(current.to_string())
}

fn looks_like_ndjson(content: &str) -> bool {
    let lines = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<&str>>();
    if lines.len() < 2 {
        return false;
    }

    lines.iter().all(|line| {
        serde_json::from_str::<Value>(line.trim())
            .map(|value| value.is_object())
            .unwrap_or(false)
    })
}

fn looks_like_csv(content: &str) -> bool {
    let Some(first_line) = content.lines().find(|line| !line.trim().is_empty()) else {
        return false;
    };
    first_line.contains(',')
}

fn headers_are_valid(actual_headers: &[String]) -> bool {
    let has_required = REQUIRED_IMPORT_FIELDS
        .iter()
        .all(|required| actual_headers.iter().any(|value| value == required));
    let all_known = actual_headers.iter().all(|header| {
        REQUIRED_IMPORT_FIELDS.contains(&header.as_str())
            || OPTIONAL_IMPORT_FIELDS.contains(&header.as_str())
    });
    has_required && all_known
}

fn expected_headers() -> Vec<String> {
    REQUIRED_IMPORT_FIELDS
        .iter()
        .chain(OPTIONAL_IMPORT_FIELDS.iter())
        .map(|value| value.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::parse_source;

    #[test]
    fn parses_csv_with_optional_columns_omitted() {
        let body = "category_key,unit_price,quantity,municipality,region\n\
                    42131606,1290,10,Valdivia,Los Ríos\n\
                    42131606,,4,Valdivia,Los Ríos\n";
        let parsed = parse_source(body);
        assert!(parsed.is_ok());
        if let Ok(rows) = parsed {
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0].row, 1);
            assert_eq!(rows[0].unit_price.as_deref(), Some("1290"));
            assert_eq!(rows[1].unit_price.as_deref(), Some(""));
            assert_eq!(rows[1].supplier, None);
        }
    }

    #[test]
    fn parses_json_numbers_and_nulls() {
        let body = r#"[{"category_key": "42131606", "unit_price": 1290.5, "quantity": 3,
            "municipality": "Osorno", "region": "Los Lagos", "supplier": null}]"#;
        let parsed = parse_source(body);
        assert!(parsed.is_ok());
        if let Ok(rows) = parsed {
            assert_eq!(rows[0].unit_price.as_deref(), Some("1290.5"));
            assert_eq!(rows[0].quantity.as_deref(), Some("3"));
            assert_eq!(rows[0].supplier, None);
        }
    }

    #[test]
    fn rejects_unknown_csv_headers() {
        let body = "category_key,unit_price,quantity,municipality,region,rut\n1,2,3,a,b,c\n";
        let parsed = parse_source(body);
        assert!(parsed.is_err());
        if let Err(error) = parsed {
            assert_eq!(error.code, "import_schema_mismatch");
        }
    }

    #[test]
    fn rejects_csv_missing_required_headers() {
        let parsed = parse_source("category_key,unit_price\n1,2\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn rejects_ndjson_and_json_objects() {
        let ndjson = "{\"category_key\": \"1\"}\n{\"category_key\": \"2\"}\n";
        let ndjson_result = parse_source(ndjson);
        assert!(ndjson_result.is_err());
        if let Err(error) = ndjson_result {
            assert_eq!(error.code, "invalid_argument");
        }

        assert!(parse_source("{\"rows\": []}").is_err());
        assert!(parse_source("   ").is_err());
    }
}

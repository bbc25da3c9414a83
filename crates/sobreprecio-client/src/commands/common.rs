use chrono::NaiveDate;

use crate::{ClientError, ClientResult};

/// Inclusive `purchased_at` bounds, already validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct DateFilter {
    pub(crate) from: Option<String>,
    pub(crate) to: Option<String>,
}

pub(crate) fn build_date_filter(
    from: Option<&str>,
    to: Option<&str>,
    command: &str,
) -> ClientResult<DateFilter> {
    let parsed_from = match from {
        Some(value) => Some(parse_iso_date_strict(value, "from", command)?),
        None => None,
    };
    let parsed_to = match to {
        Some(value) => Some(parse_iso_date_strict(value, "to", command)?),
        None => None,
    };

    if let (Some(start), Some(end)) = (parsed_from, parsed_to)
        && start > end
    {
        return Err(ClientError::invalid_argument_for_command(
            "Invalid date range: `from` must be on or before `to`.",
            Some(command),
        ));
    }

    Ok(DateFilter {
        from: parsed_from.map(|date| date.format("%Y-%m-%d").to_string()),
        to: parsed_to.map(|date| date.format("%Y-%m-%d").to_string()),
    })
}

/// Trims a text filter; blank input means no filter.
pub(crate) fn normalize_filter(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_string)
}

fn parse_iso_date_strict(value: &str, field: &str, command: &str) -> ClientResult<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.len() == 10
        && let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
    {
        return Ok(date);
    }
    Err(ClientError::invalid_argument_for_command(
        &format!("Invalid `{field}` date `{value}`. Use YYYY-MM-DD."),
        Some(command),
    ))
}

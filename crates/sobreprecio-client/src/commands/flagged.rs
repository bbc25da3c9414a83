use std::path::{Path, PathBuf};

use crate::analysis::query::{FlaggedQuery, count_flagged, load_flagged_rows};
use crate::commands::common::{build_date_filter, normalize_filter};
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::FlaggedData;
use crate::setup::load_setup;
use crate::state::open_connection;
use crate::{ClientError, ClientResult};

#[derive(Debug, Default)]
pub struct FlaggedRunOptions<'a> {
    pub category: Option<String>,
    pub municipality: Option<String>,
    pub region: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<i64>,
    pub home_override: Option<&'a Path>,
}

#[derive(Debug, Default)]
pub struct FlaggedFilters<'a> {
    pub category: Option<&'a str>,
    pub municipality: Option<&'a str>,
    pub region: Option<&'a str>,
    pub from: Option<&'a str>,
    pub to: Option<&'a str>,
    pub limit: Option<i64>,
}

pub fn run(filters: FlaggedFilters<'_>) -> ClientResult<SuccessEnvelope> {
    run_with_options(FlaggedRunOptions {
        category: filters.category.map(str::to_string),
        municipality: filters.municipality.map(str::to_string),
        region: filters.region.map(str::to_string),
        from: filters.from.map(str::to_string),
        to: filters.to.map(str::to_string),
        limit: filters.limit,
        home_override: None,
    })
}

/// Lists flagged purchases, largest total excess first.
#[doc(hidden)]
pub fn run_with_options(options: FlaggedRunOptions<'_>) -> ClientResult<SuccessEnvelope> {
    if let Some(limit) = options.limit
        && limit <= 0
    {
        return Err(ClientError::invalid_argument_for_command(
            "`--limit` must be a positive number.",
            Some("flagged"),
        ));
    }
    let dates = build_date_filter(options.from.as_deref(), options.to.as_deref(), "flagged")?;

    let setup = load_setup(options.home_override)?;
    let db_path = PathBuf::from(&setup.db_path);
    let connection = open_connection(&db_path)?;

    let query = FlaggedQuery {
        category_key: normalize_filter(options.category.as_deref()),
        municipality: normalize_filter(options.municipality.as_deref()),
        region: normalize_filter(options.region.as_deref()),
        from: dates.from,
        to: dates.to,
        limit: options.limit,
    };
    let total = count_flagged(&connection, &db_path, &query)?;
    let rows = load_flagged_rows(&connection, &db_path, &query)?;

    let data = FlaggedData {
        category: query.category_key,
        municipality: query.municipality,
        region: query.region,
        from: query.from,
        to: query.to,
        total,
        rows,
        data_range: setup.data_range,
    };

    success("flagged", data)
}

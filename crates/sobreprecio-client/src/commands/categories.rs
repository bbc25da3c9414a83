use std::path::{Path, PathBuf};

use crate::analysis::query::{CategoryQuery, load_category_rows};
use crate::commands::common::normalize_filter;
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::CategoriesData;
use crate::setup::load_setup;
use crate::state::open_connection;
use crate::{ClientError, ClientResult};

#[derive(Debug, Default)]
pub struct CategoriesRunOptions<'a> {
    pub category: Option<String>,
    pub sufficient_only: bool,
    pub home_override: Option<&'a Path>,
}

pub fn run(category: Option<&str>, sufficient_only: bool) -> ClientResult<SuccessEnvelope> {
    run_with_options(CategoriesRunOptions {
        category: category.map(str::to_string),
        sufficient_only,
        home_override: None,
    })
}

#[doc(hidden)]
pub fn run_with_options(options: CategoriesRunOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let setup = load_setup(options.home_override)?;
    let db_path = PathBuf::from(&setup.db_path);
    let connection = open_connection(&db_path)?;

    let category = normalize_filter(options.category.as_deref());
    let query = CategoryQuery {
        category_key: category.clone(),
        sufficient_only: options.sufficient_only,
    };
    let rows = load_category_rows(&connection, &db_path, &query)?;

    if let Some(key) = &category
        && rows.is_empty()
        && !options.sufficient_only
    {
        return Err(ClientError::category_not_found(key));
    }

    success(
        "categories",
        CategoriesData {
            category,
            sufficient_only: options.sufficient_only,
            rows,
        },
    )
}

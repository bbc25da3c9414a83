use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension};

use crate::analysis::query::{load_classifications, load_purchase_records};
use crate::analysis::rollup::{RollupLevel, rollup_by_jurisdiction};
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::RollupData;
use crate::setup::load_setup;
use crate::state::{map_sqlite_error, open_connection};
use crate::{ClientError, ClientResult};

#[derive(Debug, Default)]
pub struct RollupRunOptions<'a> {
    pub level: Option<String>,
    pub home_override: Option<&'a Path>,
}

pub fn run(level: Option<&str>) -> ClientResult<SuccessEnvelope> {
    run_with_options(RollupRunOptions {
        level: level.map(str::to_string),
        home_override: None,
    })
}

#[doc(hidden)]
pub fn run_with_options(options: RollupRunOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let level = match options.level.as_deref().map(str::trim) {
        None => RollupLevel::Municipality,
        Some(value) => RollupLevel::parse(value).ok_or_else(|| {
            ClientError::invalid_argument_for_command(
                &format!(
                    "Unknown rollup level `{value}`. Use municipality, region or country."
                ),
                Some("rollup"),
            )
        })?,
    };

    let setup = load_setup(options.home_override)?;
    let db_path = PathBuf::from(&setup.db_path);
    let connection = open_connection(&db_path)?;

    let records = load_purchase_records(&connection, &db_path)?;
    let classifications = load_classifications(&connection, &db_path)?;
    let policy_version = classifications_policy_version(&connection, &db_path)?
        .unwrap_or_else(|| setup.policy.version.to_string());

    let rows = rollup_by_jurisdiction(&records, &classifications, level);

    success(
        "rollup",
        RollupData {
            level: level.as_str().to_string(),
            policy_version,
            rows,
        },
    )
}

fn classifications_policy_version(
    connection: &Connection,
    db_path: &Path,
) -> ClientResult<Option<String>> {
    connection
        .query_row(
            "SELECT policy_version FROM internal_purchase_classifications LIMIT 1",
            [],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|error| map_sqlite_error(db_path, &error))
}

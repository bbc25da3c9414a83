use std::path::{Path, PathBuf};

use crate::ClientResult;
use crate::analysis::refresh::refresh_all;
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::setup::load_setup;
use crate::state::open_connection;

#[derive(Debug, Default)]
pub struct AnalysisRefreshOptions<'a> {
    pub home_override: Option<&'a Path>,
}

pub fn refresh() -> ClientResult<SuccessEnvelope> {
    refresh_with_options(AnalysisRefreshOptions {
        home_override: None,
    })
}

/// Recomputes reference ranges and classifications under the effective policy.
#[doc(hidden)]
pub fn refresh_with_options(options: AnalysisRefreshOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let setup = load_setup(options.home_override)?;
    let db_path = PathBuf::from(&setup.db_path);
    let mut connection = open_connection(&db_path)?;
    let data = refresh_all(&mut connection, &db_path, &setup.policy)?;
    success("analysis refresh", data)
}

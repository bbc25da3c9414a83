use std::path::Path;

use crate::ClientResult;
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::PolicyData;
use crate::setup::load_setup;
use crate::state::policy_config_path;

pub const QUANTILE_METHOD: &str = "linear interpolation between closest ranks (type 7)";

#[derive(Debug, Default)]
pub struct PolicyRunOptions<'a> {
    pub home_override: Option<&'a Path>,
}

pub fn run() -> ClientResult<SuccessEnvelope> {
    run_with_options(PolicyRunOptions {
        home_override: None,
    })
}

#[doc(hidden)]
pub fn run_with_options(options: PolicyRunOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let setup = load_setup(options.home_override)?;
    let config_path = policy_config_path(&setup.home);

    success(
        "policy",
        PolicyData {
            effective: setup.policy,
            config_path: config_path.display().to_string(),
            config_present: config_path.is_file(),
            quantile_method: QUANTILE_METHOD.to_string(),
        },
    )
}

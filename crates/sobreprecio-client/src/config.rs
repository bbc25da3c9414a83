use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::policy::{
    CUSTOM_POLICY_VERSION, OVERPRICING_POLICY_V1, OVERPRICING_POLICY_VERSION, OverpricingPolicy,
};
use crate::state::map_io_error;
use crate::{ClientError, ClientResult};

/// Optional overrides read from `<home>/policy.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PolicyOverrides {
    iqr_multiplier: Option<f64>,
    history_floor: Option<f64>,
    excess_floor: Option<f64>,
    order_total_floor: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EffectivePolicy {
    pub version: &'static str,
    #[serde(flatten)]
    pub policy: OverpricingPolicy,
}

impl Default for EffectivePolicy {
    fn default() -> Self {
        Self {
            version: OVERPRICING_POLICY_VERSION,
            policy: OVERPRICING_POLICY_V1,
        }
    }
}

pub fn load_policy(path: &Path) -> ClientResult<EffectivePolicy> {
    let body = match fs::read_to_string(path) {
        Ok(body) => body,
        Err(error) if error.kind() == ErrorKind::NotFound => {
            return Ok(EffectivePolicy::default());
        }
        Err(error) => return Err(map_io_error(path, &error)),
    };

    let overrides = serde_json::from_str::<PolicyOverrides>(&body)
        .map_err(|error| ClientError::invalid_policy_config(path, &error.to_string()))?;
    let effective = apply_overrides(overrides)
        .map_err(|detail| ClientError::invalid_policy_config(path, &detail))?;
    if effective.version == CUSTOM_POLICY_VERSION {
        info!(
            path = %path.display(),
            iqr_multiplier = effective.policy.iqr_multiplier,
            history_floor = effective.policy.history_floor,
            excess_floor = effective.policy.excess_floor,
            order_total_floor = effective.policy.order_total_floor,
            "using custom overpricing policy"
        );
    }
    Ok(effective)
}

fn apply_overrides(overrides: PolicyOverrides) -> Result<EffectivePolicy, String> {
    let mut policy = OVERPRICING_POLICY_V1;
    let mut customized = false;

    if let Some(value) = overrides.iqr_multiplier {
        policy.iqr_multiplier = non_negative("iqr_multiplier", value)?;
        customized = true;
    }
    if let Some(value) = overrides.history_floor {
        let floor = non_negative("history_floor", value)?;
        if floor.fract() != 0.0 {
            return Err("history_floor must be a whole number".to_string());
        }
        policy.history_floor = floor as usize;
        customized = true;
    }
    if let Some(value) = overrides.excess_floor {
        policy.excess_floor = non_negative("excess_floor", value)?;
        customized = true;
    }
    if let Some(value) = overrides.order_total_floor {
        policy.order_total_floor = non_negative("order_total_floor", value)?;
        customized = true;
    }

    let version = if customized && policy != OVERPRICING_POLICY_V1 {
        CUSTOM_POLICY_VERSION
    } else {
        OVERPRICING_POLICY_VERSION
    };
    Ok(EffectivePolicy { version, policy })
}

fn non_negative(field: &str, value: f64) -> Result<f64, String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("{field} must be a finite, non-negative number"));
    }
    Ok(value)
}

use std::collections::BTreeMap;

use serde::Serialize;

use crate::analysis::types::{ClassificationResult, PurchaseRecord};

pub const COUNTRY_KEY: &str = "CL";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RollupLevel {
    Municipality,
    Region,
    Country,
}

impl RollupLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Municipality => "municipality",
            Self::Region => "region",
            Self::Country => "country",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "municipality" => Some(Self::Municipality),
            "region" => Some(Self::Region),
            "country" => Some(Self::Country),
            _ => None,
        }
    }

    /// Grouping key plus the display key and label of a jurisdiction.
    /// Municipalities group on the `(region, municipality)` pair, so names
    /// containing `|` never merge across regions.
    fn key_for(self, record: &PurchaseRecord) -> ((String, String), String, String) {
        match self {
            Self::Municipality => (
                (record.region.clone(), record.municipality.clone()),
                format!("{}|{}", record.region, record.municipality),
                record.municipality.clone(),
            ),
            Self::Region => (
                (record.region.clone(), String::new()),
                record.region.clone(),
                record.region.clone(),
            ),
            Self::Country => (
                (COUNTRY_KEY.to_string(), String::new()),
                COUNTRY_KEY.to_string(),
                "Chile".to_string(),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JurisdictionRollup {
    pub jurisdiction_key: String,
    pub label: String,
    pub purchases: i64,
    pub flagged: i64,
    pub overpricing_rate: f64,
    pub flagged_total_amount: f64,
    pub flagged_excess_amount: f64,
}

/// Overpricing rate per jurisdiction: `flagged / purchases * 100`.
///
/// `classifications` must be aligned with `records` by `purchase_id`;
/// purchases without a classification count toward the denominator only.
pub fn rollup_by_jurisdiction(
    records: &[PurchaseRecord],
    classifications: &[ClassificationResult],
    level: RollupLevel,
) -> Vec<JurisdictionRollup> {
    let by_id = classifications
        .iter()
        .map(|result| (result.purchase_id.as_str(), result))
        .collect::<BTreeMap<&str, &ClassificationResult>>();

    let mut groups: BTreeMap<(String, String), JurisdictionRollup> = BTreeMap::new();
    for record in records {
        let (group, key, label) = level.key_for(record);
        let entry = groups
            .entry(group)
            .or_insert_with(|| JurisdictionRollup {
                jurisdiction_key: key,
                label,
                purchases: 0,
                flagged: 0,
                overpricing_rate: 0.0,
                flagged_total_amount: 0.0,
                flagged_excess_amount: 0.0,
            });
        entry.purchases += 1;

        let Some(result) = by_id.get(record.purchase_id.as_str()) else {
            continue;
        };
        if result.is_expensive {
            entry.flagged += 1;
            entry.flagged_total_amount += record.total_amount().unwrap_or(0.0);
            entry.flagged_excess_amount += result.price_excess_amount.unwrap_or(0.0);
        }
    }

    let mut rows = groups
        .into_values()
        .map(|mut row| {
            row.overpricing_rate = overpricing_rate(row.flagged, row.purchases);
            row
        })
        .collect::<Vec<JurisdictionRollup>>();
    rows.sort_by(|left, right| {
        right
            .overpricing_rate
            .total_cmp(&left.overpricing_rate)
            .then_with(|| left.jurisdiction_key.cmp(&right.jurisdiction_key))
            .then_with(|| left.label.cmp(&right.label))
    });
    rows
}

pub fn overpricing_rate(flagged: i64, purchases: i64) -> f64 {
    if purchases <= 0 {
        return 0.0;
    }
    flagged as f64 / purchases as f64 * 100.0
}

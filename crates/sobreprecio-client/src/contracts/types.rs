use serde::Serialize;

use crate::analysis::rollup::JurisdictionRollup;
use crate::analysis::types::FlagGate;
use crate::config::EffectivePolicy;

#[derive(Debug, Clone, Serialize)]
pub struct DataRange {
    pub earliest: Option<String>,
    pub latest: Option<String>,
    pub purchases: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportIssue {
    pub row: i64,
    pub field: String,
    pub code: String,
    pub description: String,
    pub expected: Option<String>,
    pub received: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub rows_read: i64,
    pub rows_valid: i64,
    pub rows_invalid: i64,
    pub inserted: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportData {
    pub dry_run: bool,
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_id: Option<String>,
    pub message: String,
    pub summary: ImportSummary,
    pub source_used: String,
    pub categories_in_batch: i64,
    pub rows_without_usable_price: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh: Option<AnalysisRefreshData>,
    pub data_range: DataRange,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportListItem {
    pub import_id: String,
    pub status: String,
    pub created_at: String,
    pub committed_at: Option<String>,
    pub rows_read: i64,
    pub rows_valid: i64,
    pub rows_invalid: i64,
    pub inserted: i64,
    pub source_kind: Option<String>,
    pub source_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportListData {
    pub rows: Vec<ImportListItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRefreshData {
    pub policy_version: String,
    pub purchases: i64,
    pub categories: i64,
    pub sufficient_categories: i64,
    pub flagged: i64,
    pub completed_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryRow {
    pub category_key: String,
    pub category_label: Option<String>,
    pub sample_count: i64,
    pub q1: Option<f64>,
    pub q3: Option<f64>,
    pub iqr: Option<f64>,
    pub expected_min_range: Option<f64>,
    pub expected_max_range: Option<f64>,
    pub max_acceptable_price: Option<f64>,
    pub has_sufficient_data: bool,
    pub policy_version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoriesData {
    pub category: Option<String>,
    pub sufficient_only: bool,
    pub rows: Vec<CategoryRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlaggedRow {
    pub purchase_id: String,
    pub external_id: Option<String>,
    pub category_key: String,
    pub category_label: Option<String>,
    pub municipality: String,
    pub region: String,
    pub supplier: Option<String>,
    pub item_description: Option<String>,
    pub purchased_at: Option<String>,
    pub unit_price: f64,
    pub quantity: f64,
    pub total_amount: f64,
    pub max_acceptable_price: Option<f64>,
    pub price_excess_amount: Option<f64>,
    pub price_excess_percentage: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlaggedData {
    pub category: Option<String>,
    pub municipality: Option<String>,
    pub region: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub total: i64,
    pub rows: Vec<FlaggedRow>,
    pub data_range: DataRange,
}

#[derive(Debug, Clone, Serialize)]
pub struct RollupData {
    pub level: String,
    pub policy_version: String,
    pub rows: Vec<JurisdictionRollup>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckData {
    pub category_key: String,
    pub policy_version: String,
    pub unit_price: f64,
    pub quantity: f64,
    pub total_amount: f64,
    pub statistics: CategoryRow,
    pub is_expensive: bool,
    pub price_excess_amount: Option<f64>,
    pub price_excess_percentage: Option<f64>,
    pub failed_gates: Vec<FlagGate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PolicyData {
    #[serde(flatten)]
    pub effective: EffectivePolicy,
    pub config_path: String,
    pub config_present: bool,
    pub quantile_method: String,
}

use serde::Serialize;

/// Deterministic overpricing policy identifier.
///
/// Persisted next to every materialized statistics and classification row so
/// threshold changes stay auditable across refreshes.
pub const OVERPRICING_POLICY_VERSION: &str = "overpricing/v1";

/// Version reported when `policy.json` overrides any v1 constant.
pub const CUSTOM_POLICY_VERSION: &str = "overpricing/v1+custom";

/// Overpricing classifier policy.
///
/// Every gate uses a strict comparison:
/// - a category is reliable only when `sample_count > history_floor`;
/// - a purchase triggers when `unit_price > q3 + iqr_multiplier * iqr`;
/// - the excess must be `> excess_floor` and the order total `> order_total_floor`.
///
/// Amounts are Chilean pesos.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverpricingPolicy {
    pub iqr_multiplier: f64,
    pub history_floor: usize,
    pub excess_floor: f64,
    pub order_total_floor: f64,
}

impl OverpricingPolicy {
    pub fn max_acceptable_price(self, q3: f64, iqr: f64) -> f64 {
        q3 + (self.iqr_multiplier * iqr)
    }

    pub fn has_sufficient_history(self, sample_count: usize) -> bool {
        sample_count > self.history_floor
    }

    pub fn is_material_excess(self, excess: f64) -> bool {
        excess > self.excess_floor
    }

    pub fn is_significant_order(self, total_amount: f64) -> bool {
        total_amount > self.order_total_floor
    }
}

pub const OVERPRICING_POLICY_V1: OverpricingPolicy = OverpricingPolicy {
    iqr_multiplier: 2.0,
    history_floor: 10,
    excess_floor: 10_000.0,
    order_total_floor: 100_000.0,
};

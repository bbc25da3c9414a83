use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseRecord {
    pub purchase_id: String,
    pub category_key: String,
    pub unit_price: Option<f64>,
    pub quantity: f64,
    pub municipality: String,
    pub region: String,
}

impl PurchaseRecord {
    /// Unit price when it can carry market signal: present, finite and positive.
    pub fn usable_unit_price(&self) -> Option<f64> {
        self.unit_price.filter(|price| price.is_finite() && *price > 0.0)
    }

    pub fn total_amount(&self) -> Option<f64> {
        self.unit_price
            .filter(|price| price.is_finite())
            .map(|price| price * self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStatistics {
    pub category_key: String,
    pub sample_count: usize,
    pub q1: Option<f64>,
    pub q3: Option<f64>,
    pub iqr: Option<f64>,
    pub expected_min_range: Option<f64>,
    pub expected_max_range: Option<f64>,
    pub max_acceptable_price: Option<f64>,
    pub has_sufficient_data: bool,
}

impl CategoryStatistics {
    pub fn empty(category_key: &str) -> Self {
        Self {
            category_key: category_key.to_string(),
            sample_count: 0,
            q1: None,
            q3: None,
            iqr: None,
            expected_min_range: None,
            expected_max_range: None,
            max_acceptable_price: None,
            has_sufficient_data: false,
        }
    }
}

/// Conditions a purchase must clear to be flagged, in evaluation order.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagGate {
    NoUsablePrice,
    NoReferenceData,
    WithinThreshold,
    InsufficientHistory,
    ExcessNotMaterial,
    OrderBelowMinimum,
}

impl FlagGate {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoUsablePrice => "no_usable_price",
            Self::NoReferenceData => "no_reference_data",
            Self::WithinThreshold => "within_threshold",
            Self::InsufficientHistory => "insufficient_history",
            Self::ExcessNotMaterial => "excess_not_material",
            Self::OrderBelowMinimum => "order_below_minimum",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "no_usable_price" => Some(Self::NoUsablePrice),
            "no_reference_data" => Some(Self::NoReferenceData),
            "within_threshold" => Some(Self::WithinThreshold),
            "insufficient_history" => Some(Self::InsufficientHistory),
            "excess_not_material" => Some(Self::ExcessNotMaterial),
            "order_below_minimum" => Some(Self::OrderBelowMinimum),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub purchase_id: String,
    pub category_key: String,
    pub is_expensive: bool,
    pub price_excess_amount: Option<f64>,
    pub price_excess_percentage: Option<f64>,
    pub failed_gates: Vec<FlagGate>,
}

#[cfg(test)]
mod tests {
    use super::{FlagGate, PurchaseRecord};

    fn record(unit_price: Option<f64>, quantity: f64) -> PurchaseRecord {
        PurchaseRecord {
            purchase_id: "pur_1".to_string(),
            category_key: "42131606".to_string(),
            unit_price,
            quantity,
            municipality: "Valparaíso".to_string(),
            region: "Valparaíso".to_string(),
        }
    }

    #[test]
    fn usable_price_rejects_zero_negative_and_missing() {
        assert_eq!(record(Some(0.0), 1.0).usable_unit_price(), None);
        assert_eq!(record(Some(-5.0), 1.0).usable_unit_price(), None);
        assert_eq!(record(None, 1.0).usable_unit_price(), None);
        assert_eq!(record(Some(f64::NAN), 1.0).usable_unit_price(), None);
        assert_eq!(record(Some(12.5), 1.0).usable_unit_price(), Some(12.5));
    }

    #[test]
    fn total_amount_multiplies_price_by_quantity() {
        assert_eq!(record(Some(2500.0), 4.0).total_amount(), Some(10_000.0));
        assert_eq!(record(None, 4.0).total_amount(), None);
    }

    #[test]
    fn gate_codes_round_trip_through_storage_strings() {
        for gate in [
            FlagGate::NoUsablePrice,
            FlagGate::NoReferenceData,
            FlagGate::WithinThreshold,
            FlagGate::InsufficientHistory,
            FlagGate::ExcessNotMaterial,
            FlagGate::OrderBelowMinimum,
        ] {
            assert_eq!(FlagGate::parse(gate.as_str()), Some(gate));
        }
        assert_eq!(FlagGate::parse("unknown"), None);
    }
}

use crate::analysis::policy::OverpricingPolicy;
use crate::analysis::types::{CategoryStatistics, ClassificationResult, FlagGate, PurchaseRecord};

/// Classifies one purchase against its category's reference statistics.
///
/// A purchase is flagged only when it clears every gate: price above the
/// maximum acceptable price, more than `history_floor` samples, a material
/// excess and a significant order total. Failing any single gate leaves it
/// unflagged; `failed_gates` lists each gate that failed.
pub fn classify_purchase(
    record: &PurchaseRecord,
    statistics: &CategoryStatistics,
    policy: OverpricingPolicy,
) -> ClassificationResult {
    let mut failed_gates = Vec::new();

    let unit_price = record.usable_unit_price();
    let max_acceptable_price = statistics.max_acceptable_price;

    let (price_excess_amount, price_excess_percentage) = match (unit_price, max_acceptable_price)
    {
        (Some(price), Some(max)) => (
            Some((price - max).max(0.0)),
            excess_percentage(price, max),
        ),
        _ => (None, None),
    };

    match (unit_price, max_acceptable_price) {
        (None, _) => failed_gates.push(FlagGate::NoUsablePrice),
        (Some(_), None) => failed_gates.push(FlagGate::NoReferenceData),
        (Some(price), Some(max)) => {
            if price <= max {
                failed_gates.push(FlagGate::WithinThreshold);
            }
            if !policy.has_sufficient_history(statistics.sample_count) {
                failed_gates.push(FlagGate::InsufficientHistory);
            }
            if !policy.is_material_excess(price - max) {
                failed_gates.push(FlagGate::ExcessNotMaterial);
            }
            if !policy.is_significant_order(price * record.quantity) {
                failed_gates.push(FlagGate::OrderBelowMinimum);
            }
        }
    }

    ClassificationResult {
        purchase_id: record.purchase_id.clone(),
        category_key: record.category_key.clone(),
        is_expensive: failed_gates.is_empty(),
        price_excess_amount,
        price_excess_percentage,
        failed_gates,
    }
}

fn excess_percentage(unit_price: f64, max_acceptable_price: f64) -> Option<f64> {
    if max_acceptable_price <= 0.0 {
        return None;
    }
    let percentage = (unit_price - max_acceptable_price) / max_acceptable_price * 100.0;
    percentage.is_finite().then_some(percentage)
}

#[cfg(test)]
mod tests {
    use super::classify_purchase;
    use crate::analysis::policy::OVERPRICING_POLICY_V1;
    use crate::analysis::reference::compute_category_statistics;
    use crate::analysis::types::{CategoryStatistics, FlagGate, PurchaseRecord};

    fn purchase(unit_price: Option<f64>, quantity: f64) -> PurchaseRecord {
        PurchaseRecord {
            purchase_id: "pur_test".to_string(),
            category_key: "42131606".to_string(),
            unit_price,
            quantity,
            municipality: "Arica".to_string(),
            region: "Arica y Parinacota".to_string(),
        }
    }

    fn stable_history(sample_count: usize) -> CategoryStatistics {
        let prices = vec![100.0; sample_count];
        compute_category_statistics("42131606", &prices, OVERPRICING_POLICY_V1)
    }

    #[test]
    fn flags_when_every_gate_passes() {
        let result = classify_purchase(
            &purchase(Some(15_000.0), 7.0),
            &stable_history(12),
            OVERPRICING_POLICY_V1,
        );
        assert!(result.is_expensive);
        assert!(result.failed_gates.is_empty());
        assert_eq!(result.price_excess_amount, Some(14_900.0));
        assert_eq!(result.price_excess_percentage, Some(14_900.0));
    }

    #[test]
    fn small_order_is_not_flagged_even_when_price_is_extreme() {
        let result = classify_purchase(
            &purchase(Some(50_000.0), 1.0),
            &stable_history(40),
            OVERPRICING_POLICY_V1,
        );
        assert!(!result.is_expensive);
        assert_eq!(result.failed_gates, vec![FlagGate::OrderBelowMinimum]);
        assert_eq!(result.price_excess_amount, Some(49_900.0));
    }

    #[test]
    fn immaterial_excess_is_not_flagged() {
        let result = classify_purchase(
            &purchase(Some(500.0), 10_000.0),
            &stable_history(12),
            OVERPRICING_POLICY_V1,
        );
        assert!(!result.is_expensive);
        assert_eq!(result.failed_gates, vec![FlagGate::ExcessNotMaterial]);
    }

    #[test]
    fn insufficient_history_suppresses_absurd_prices() {
        let stats = compute_category_statistics(
            "42131606",
            &[100.0, 110.0, 95.0, 105.0, 2_000_000.0],
            OVERPRICING_POLICY_V1,
        );
        let result = classify_purchase(
            &purchase(Some(5_000_000.0), 100.0),
            &stats,
            OVERPRICING_POLICY_V1,
        );
        assert!(!result.is_expensive);
        assert_eq!(result.failed_gates, vec![FlagGate::InsufficientHistory]);
    }

    #[test]
    fn price_at_threshold_is_within_range() {
        let result = classify_purchase(
            &purchase(Some(100.0), 5_000.0),
            &stable_history(30),
            OVERPRICING_POLICY_V1,
        );
        assert!(!result.is_expensive);
        assert!(result.failed_gates.contains(&FlagGate::WithinThreshold));
        assert_eq!(result.price_excess_amount, Some(0.0));
        assert_eq!(result.price_excess_percentage, Some(0.0));
    }

    #[test]
    fn cheaper_purchase_reports_negative_percentage_and_zero_excess() {
        let result = classify_purchase(
            &purchase(Some(50.0), 1.0),
            &stable_history(30),
            OVERPRICING_POLICY_V1,
        );
        assert_eq!(result.price_excess_amount, Some(0.0));
        assert_eq!(result.price_excess_percentage, Some(-50.0));
    }

    #[test]
    fn purchase_without_price_is_never_flagged() {
        let result = classify_purchase(
            &purchase(None, 10.0),
            &stable_history(30),
            OVERPRICING_POLICY_V1,
        );
        assert!(!result.is_expensive);
        assert_eq!(result.failed_gates, vec![FlagGate::NoUsablePrice]);
        assert_eq!(result.price_excess_amount, None);
        assert_eq!(result.price_excess_percentage, None);
    }

    #[test]
    fn empty_category_reports_missing_reference_data() {
        let stats = CategoryStatistics::empty("42131606");
        let result = classify_purchase(
            &purchase(Some(900_000.0), 10.0),
            &stats,
            OVERPRICING_POLICY_V1,
        );
        assert!(!result.is_expensive);
        assert_eq!(result.failed_gates, vec![FlagGate::NoReferenceData]);
        assert_eq!(result.price_excess_amount, None);
    }

    #[test]
    fn zero_threshold_never_produces_percentage() {
        let mut stats = stable_history(30);
        stats.max_acceptable_price = Some(0.0);
        let result = classify_purchase(
            &purchase(Some(20_000.0), 10.0),
            &stats,
            OVERPRICING_POLICY_V1,
        );
        assert_eq!(result.price_excess_percentage, None);
        assert_eq!(result.price_excess_amount, Some(20_000.0));
    }

    #[test]
    fn zero_variance_category_cannot_trigger_at_its_own_price() {
        let stats = stable_history(50);
        let result = classify_purchase(
            &purchase(Some(100.0), 1_000_000.0),
            &stats,
            OVERPRICING_POLICY_V1,
        );
        assert!(!result.is_expensive);
        assert!(result.failed_gates.contains(&FlagGate::WithinThreshold));
    }
}

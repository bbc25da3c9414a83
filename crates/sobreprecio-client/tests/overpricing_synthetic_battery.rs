mod support;

use std::path::Path;

use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;
use support::purchase_testkit::{import_rows, purchase, temp_home};

struct Scenario {
    category_key: &'static str,
    baseline_count: usize,
    candidate_price: f64,
    candidate_quantity: f64,
    expected_gates: &'static str,
}

const SCENARIOS: [Scenario; 5] = [
    Scenario {
        category_key: "gate-all-pass",
        baseline_count: 10,
        candidate_price: 12_000.0,
        candidate_quantity: 10.0,
        expected_gates: "",
    },
    Scenario {
        category_key: "gate-excess-exactly-floor",
        baseline_count: 10,
        candidate_price: 11_000.0,
        candidate_quantity: 100.0,
        expected_gates: "excess_not_material",
    },
    Scenario {
        category_key: "gate-total-exactly-floor",
        baseline_count: 10,
        candidate_price: 20_000.0,
        candidate_quantity: 5.0,
        expected_gates: "order_below_minimum",
    },
    Scenario {
        category_key: "gate-ten-samples",
        baseline_count: 9,
        candidate_price: 20_000.0,
        candidate_quantity: 10.0,
        expected_gates: "insufficient_history",
    },
    Scenario {
        category_key: "gate-at-maximum",
        baseline_count: 10,
        candidate_price: 1_000.0,
        candidate_quantity: 500.0,
        expected_gates: "within_threshold,excess_not_material",
    },
];

fn scenario_rows() -> Vec<Value> {
    let mut rows = Vec::new();
    for scenario in &SCENARIOS {
        for _ in 0..scenario.baseline_count {
            rows.push(purchase(
                scenario.category_key,
                Some(1_000.0),
                1.0,
                "Temuco",
                "La Araucanía",
            ));
        }
        rows.push(purchase(
            scenario.category_key,
            Some(scenario.candidate_price),
            scenario.candidate_quantity,
            "Angol",
            "La Araucanía",
        ));
    }
    rows
}

fn candidate_outcome(db_path: &Path, category_key: &str) -> Option<(i64, String)> {
    let connection = Connection::open(db_path).ok()?;
    connection
        .query_row(
            "SELECT is_expensive, failed_gates
             FROM v1_classifications
             WHERE category_key = ?1 AND municipality = 'Angol'",
            [category_key],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()
        .ok()
        .flatten()
}

#[test]
fn each_gate_is_strict_and_independent() {
    let temp = temp_home();
    assert!(temp.is_ok());
    if let Ok((_temp, home)) = temp {
        let data = import_rows(&home, &scenario_rows());
        assert_eq!(data["refresh"]["flagged"], serde_json::json!(1));

        let db_path = home.join("store.db");
        for scenario in &SCENARIOS {
            let outcome = candidate_outcome(&db_path, scenario.category_key);
            assert!(outcome.is_some(), "missing {}", scenario.category_key);
            if let Some((is_expensive, failed_gates)) = outcome {
                assert_eq!(
                    failed_gates, scenario.expected_gates,
                    "gates for {}",
                    scenario.category_key
                );
                assert_eq!(
                    is_expensive == 1,
                    scenario.expected_gates.is_empty(),
                    "flag for {}",
                    scenario.category_key
                );
            }
        }
    }
}

#[test]
fn baseline_purchases_are_never_flagged() {
    let temp = temp_home();
    assert!(temp.is_ok());
    if let Ok((_temp, home)) = temp {
        import_rows(&home, &scenario_rows());
        let connection = Connection::open(home.join("store.db"));
        assert!(connection.is_ok());
        if let Ok(conn) = connection {
            let flagged_baseline = conn.query_row(
                "SELECT COUNT(*) FROM v1_classifications
                 WHERE municipality = 'Temuco' AND is_expensive = 1",
                [],
                |row| row.get::<_, i64>(0),
            );
            assert_eq!(flagged_baseline.ok(), Some(0));
        }
    }
}

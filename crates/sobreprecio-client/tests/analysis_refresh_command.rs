mod support;

use std::fs;
use std::path::Path;

use rusqlite::Connection;
use serde_json::json;
use sobreprecio_client::commands::analysis::{self, AnalysisRefreshOptions};
use sobreprecio_client::commands::policy::{self, PolicyRunOptions};
use support::purchase_testkit::{
    import_rows, query_count, steady_category_with_spikes, temp_home,
};

fn refresh(home: &Path) -> sobreprecio_client::ClientResult<sobreprecio_client::SuccessEnvelope> {
    analysis::refresh_with_options(AnalysisRefreshOptions {
        home_override: Some(home),
    })
}

fn statistics_snapshot(db_path: &Path) -> Vec<String> {
    let connection = Connection::open(db_path);
    assert!(connection.is_ok());
    let mut snapshot = Vec::new();
    if let Ok(conn) = connection {
        let statement = conn.prepare(
            "SELECT category_key || '|' || sample_count || '|' || IFNULL(q1, '') || '|' ||
                    IFNULL(q3, '') || '|' || IFNULL(max_acceptable_price, '') || '|' ||
                    policy_version
             FROM internal_category_statistics
             UNION ALL
             SELECT purchase_id || '|' || is_expensive || '|' || failed_gates || '|' ||
                    IFNULL(price_excess_amount, '')
             FROM internal_purchase_classifications
             ORDER BY 1",
        );
        assert!(statement.is_ok());
        if let Ok(mut statement) = statement {
            let rows = statement.query_map([], |row| row.get::<_, String>(0));
            assert!(rows.is_ok());
            if let Ok(rows) = rows {
                snapshot = rows.filter_map(Result::ok).collect();
            }
        }
    }
    snapshot
}

#[test]
fn refresh_is_idempotent() {
    let temp = temp_home();
    assert!(temp.is_ok());
    if let Ok((_temp, home)) = temp {
        import_rows(&home, &steady_category_with_spikes());
        let db_path = home.join("store.db");
        let before = statistics_snapshot(&db_path);
        assert_eq!(before.len(), 14);

        let first = refresh(&home);
        assert!(first.is_ok());
        let second = refresh(&home);
        assert!(second.is_ok());
        if let Ok(success) = second {
            assert_eq!(success.command, "analysis refresh");
            assert_eq!(success.data["purchases"], json!(13));
            assert_eq!(success.data["categories"], json!(1));
            assert_eq!(success.data["sufficient_categories"], json!(1));
            assert_eq!(success.data["flagged"], json!(1));
        }

        assert_eq!(statistics_snapshot(&db_path), before);
        assert_eq!(
            query_count(
                &db_path,
                "SELECT COUNT(*) FROM internal_meta WHERE key = 'last_refresh_at'"
            ),
            1
        );
    }
}

#[test]
fn refresh_is_atomic_on_failure() {
    let temp = temp_home();
    assert!(temp.is_ok());
    if let Ok((_temp, home)) = temp {
        import_rows(&home, &steady_category_with_spikes());
        let db_path = home.join("store.db");
        let before = statistics_snapshot(&db_path);

        let connection = Connection::open(&db_path);
        assert!(connection.is_ok());
        if let Ok(conn) = connection {
            let trigger = conn.execute_batch(
                "CREATE TRIGGER fail_classification_insert
                 BEFORE INSERT ON internal_purchase_classifications
                 BEGIN
                   SELECT RAISE(ABORT, 'forced_refresh_failure');
                 END;",
            );
            assert!(trigger.is_ok());
        }

        let result = refresh(&home);
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "store_init_failed");
            assert!(error.message.contains("forced_refresh_failure"));
        }

        assert_eq!(statistics_snapshot(&db_path), before);
    }
}

#[test]
fn policy_file_overrides_thresholds_and_version() {
    let temp = temp_home();
    assert!(temp.is_ok());
    if let Ok((_temp, home)) = temp {
        import_rows(&home, &steady_category_with_spikes());
        let write = fs::write(
            home.join("policy.json"),
            r#"{"excess_floor": 100, "order_total_floor": 1000}"#,
        );
        assert!(write.is_ok());

        let result = refresh(&home);
        assert!(result.is_ok());
        if let Ok(success) = result {
            assert_eq!(success.data["policy_version"], json!("overpricing/v1+custom"));
            assert_eq!(success.data["flagged"], json!(2));
        }

        let shown = policy::run_with_options(PolicyRunOptions {
            home_override: Some(&home),
        });
        assert!(shown.is_ok());
        if let Ok(success) = shown {
            assert_eq!(success.data["version"], json!("overpricing/v1+custom"));
            assert_eq!(success.data["iqr_multiplier"], json!(2.0));
            assert_eq!(success.data["history_floor"], json!(10));
            assert_eq!(success.data["excess_floor"], json!(100.0));
            assert_eq!(success.data["config_present"], json!(true));
        }

        assert_eq!(
            query_count(
                &home.join("store.db"),
                "SELECT COUNT(*) FROM internal_category_statistics
                 WHERE policy_version = 'overpricing/v1+custom'"
            ),
            1
        );
    }
}

#[test]
fn malformed_policy_file_is_reported() {
    let temp = temp_home();
    assert!(temp.is_ok());
    if let Ok((_temp, home)) = temp {
        let write = fs::write(home.join("policy.json"), r#"{"lambda": 3}"#);
        assert!(write.is_ok());
        let result = refresh(&home);
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "invalid_policy_config");
        }
    }
}

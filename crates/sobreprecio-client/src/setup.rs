use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, warn};

use crate::config::{EffectivePolicy, load_policy};
use crate::contracts::types::DataRange;
use crate::migrations::{
    REQUIRED_INDEX_NAMES, REQUIRED_TABLE_NAMES, REQUIRED_VIEW_NAMES, run_pending,
    safe_repair_statement,
};
use crate::state::{
    ensure_store_directory, map_sqlite_error, open_connection, policy_config_path,
    resolve_store_home, store_db_path,
};
use crate::{ClientError, ClientResult};

#[derive(Debug, Clone)]
pub struct SetupContext {
    pub home: PathBuf,
    pub db_path: PathBuf,
    pub schema_version: String,
    pub policy: EffectivePolicy,
    pub data_range: DataRange,
}

/// Resolves setup from an optional home override, the way every command does.
pub fn load_setup(home_override: Option<&Path>) -> ClientResult<SetupContext> {
    ensure_initialized_with_home_override(home_override)
}

fn ensure_initialized_with_home_override(
    home_override: Option<&Path>,
) -> ClientResult<SetupContext> {
    let store_home = resolve_store_home(home_override)?;
    ensure_store_directory(&store_home)?;

    let db_path = store_db_path(&store_home);
    let mut connection = open_connection(&db_path)?;

    run_pending(&mut connection)
        .map_err(|error| ClientError::migration_failed(&db_path, &error.to_string()))?;

    verify_core_tables(&connection, &db_path)?;
    repair_safe_objects(&connection, &db_path)?;

    let schema_version = read_schema_version(&connection, &db_path)?;
    let data_range = read_data_range(&connection, &db_path)?;
    let policy = load_policy(&policy_config_path(&store_home))?;

    debug!(db_path = %db_path.display(), policy_version = policy.version, "store ready");
    Ok(SetupContext {
        home: store_home,
        db_path,
        schema_version,
        policy,
        data_range,
    })
}

fn verify_core_tables(connection: &Connection, db_path: &Path) -> ClientResult<()> {
    for table_name in REQUIRED_TABLE_NAMES {
        if !sqlite_object_exists(connection, "table", table_name, db_path)? {
            return Err(ClientError::store_corrupt(db_path));
        }
    }
    Ok(())
}

fn repair_safe_objects(connection: &Connection, db_path: &Path) -> ClientResult<()> {
    let objects = REQUIRED_VIEW_NAMES
        .iter()
        .map(|name| ("view", *name))
        .chain(REQUIRED_INDEX_NAMES.iter().map(|name| ("index", *name)));

    for (object_type, object_name) in objects {
        if sqlite_object_exists(connection, object_type, object_name, db_path)? {
            continue;
        }
        let Some(statement) = safe_repair_statement(object_name) else {
            return Err(ClientError::store_init_failed(
                db_path,
                "Missing canonical SQL for schema repair.",
            ));
        };
        warn!(object_type, object_name, "recreating missing store object");
        connection
            .execute_batch(&statement)
            .map_err(|error| map_sqlite_error(db_path, &error))?;
    }

    Ok(())
}

fn sqlite_object_exists(
    connection: &Connection,
    object_type: &str,
    object_name: &str,
    db_path: &Path,
) -> ClientResult<bool> {
    let exists = connection
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2 LIMIT 1",
            params![object_type, object_name],
            |_row| Ok(true),
        )
        .optional()
        .map_err(|error| map_sqlite_error(db_path, &error))?
        .unwrap_or(false);

    Ok(exists)
}

fn read_schema_version(connection: &Connection, db_path: &Path) -> ClientResult<String> {
    let value = connection
        .query_row(
            "SELECT value FROM internal_meta WHERE key = 'schema_version' LIMIT 1",
            [],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    Ok(value.unwrap_or_else(|| "v1".to_string()))
}

fn read_data_range(connection: &Connection, db_path: &Path) -> ClientResult<DataRange> {
    connection
        .query_row(
            "SELECT MIN(purchased_at), MAX(purchased_at), COUNT(*) FROM internal_purchases",
            [],
            |row| {
                Ok(DataRange {
                    earliest: row.get::<_, Option<String>>(0)?,
                    latest: row.get::<_, Option<String>>(1)?,
                    purchases: row.get::<_, i64>(2)?,
                })
            },
        )
        .map_err(|error| map_sqlite_error(db_path, &error))
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use tempfile::tempdir;

    use super::load_setup;

    #[test]
    fn initializes_fresh_home_and_is_rerunnable() {
        let dir = tempdir();
        assert!(dir.is_ok());
        if let Ok(dir) = dir {
            let home = dir.path().join("store-home");
            let first = load_setup(Some(&home));
            assert!(first.is_ok());
            let second = load_setup(Some(&home));
            assert!(second.is_ok());
            if let Ok(context) = second {
                assert_eq!(context.schema_version, "v1");
                assert_eq!(context.data_range.purchases, 0);
                assert!(context.db_path.ends_with("store.db"));
            }
        }
    }

    #[test]
    fn dropped_view_is_repaired() {
        let dir = tempdir();
        assert!(dir.is_ok());
        if let Ok(dir) = dir {
            let home = dir.path().join("store-home");
            let setup = load_setup(Some(&home));
            assert!(setup.is_ok());
            if let Ok(context) = setup {
                let connection = Connection::open(&context.db_path);
                assert!(connection.is_ok());
                if let Ok(conn) = connection {
                    assert!(conn.execute_batch("DROP VIEW v1_classifications;").is_ok());
                }
            }

            let repaired = load_setup(Some(&home));
            assert!(repaired.is_ok());
            if let Ok(context) = repaired {
                let connection = Connection::open(&context.db_path);
                assert!(connection.is_ok());
                if let Ok(conn) = connection {
                    let count = conn.query_row(
                        "SELECT COUNT(*) FROM v1_classifications",
                        [],
                        |row| row.get::<_, i64>(0),
                    );
                    assert_eq!(count.ok(), Some(0));
                }
            }
        }
    }
}

use std::path::Path;

use serde_json::{Value, json};
use thiserror::Error;

use crate::contracts::types::{ImportIssue, ImportSummary};

pub(crate) const IMPORT_HELP_COMMAND: &str = "sobreprecio import create --help";

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClientError {
    pub code: String,
    pub message: String,
    pub recovery_steps: Vec<String>,
    pub data: Option<Value>,
}

impl ClientError {
    pub fn new(code: &str, message: &str, recovery_steps: Vec<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            recovery_steps,
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_import_help_data(self, data: Value) -> Self {
        self.with_data(merge_import_help_data(data))
    }

    pub fn invalid_argument(message: &str) -> Self {
        Self::invalid_argument_for_command(message, None)
    }

    pub fn invalid_argument_for_command(message: &str, command: Option<&str>) -> Self {
        let help_hint = match command {
            Some(cmd) => format!("Run `sobreprecio {cmd} --help` for usage."),
            None => "Run `sobreprecio --help` for usage.".to_string(),
        };
        let error = Self::new("invalid_argument", message, vec![help_hint]);
        if let Some(cmd) = command {
            return error.with_data(json!({
                "command_hint": cmd,
            }));
        }
        error
    }

    pub fn invalid_argument_with_recovery(message: &str, recovery_steps: Vec<String>) -> Self {
        Self::new("invalid_argument", message, recovery_steps)
    }

    pub fn invalid_import_format(message: &str, received_format: &str) -> Self {
        Self::invalid_argument_with_recovery(
            message,
            vec![
                "Provide a supported import format (JSON array or CSV).".to_string(),
                "Run `sobreprecio import create --help` to confirm field requirements."
                    .to_string(),
            ],
        )
        .with_import_help_data(json!({
            "received_format": received_format,
            "supported_formats": ["json_array", "csv"],
        }))
    }

    pub fn import_schema_mismatch(expected_headers: Vec<String>, actual_headers: Vec<String>) -> Self {
        Self::new(
            "import_schema_mismatch",
            "CSV headers do not satisfy the purchase import schema.",
            vec![
                "Include all required headers; optional headers may be omitted.".to_string(),
                "Do not include unknown headers.".to_string(),
                "Rerun `sobreprecio import create --dry-run <path>`.".to_string(),
            ],
        )
        .with_import_help_data(json!({
            "expected_headers": expected_headers,
            "actual_headers": actual_headers,
        }))
    }

    pub fn import_validation_failed(summary: ImportSummary, issues: Vec<ImportIssue>) -> Self {
        let issue_count = summary.rows_invalid;
        Self::new(
            "import_validation_failed",
            &format!(
                "Import failed validation: {issue_count} rows need fixes. No purchases were written."
            ),
            vec![
                "Fix the listed issues in your source file.".to_string(),
                "Rerun sobreprecio import create --dry-run <path>.".to_string(),
                "Then rerun sobreprecio import create <path>.".to_string(),
            ],
        )
        .with_import_help_data(json!({
            "summary": summary,
            "issues": issues,
        }))
    }

    pub fn invalid_policy_config(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "invalid_policy_config",
            &format!("Policy configuration at `{location}` is invalid: {detail}"),
            vec![
                "Use only iqr_multiplier, history_floor, excess_floor and order_total_floor."
                    .to_string(),
                "Every value must be a finite, non-negative number.".to_string(),
                format!("Remove `{location}` to fall back to the default policy."),
            ],
        )
        .with_data(json!({
            "policy_path": location,
        }))
    }

    pub fn category_not_found(category_key: &str) -> Self {
        Self::new(
            "category_not_found",
            &format!("Category `{category_key}` has no reference statistics."),
            vec![
                "Run `sobreprecio categories` to list known categories.".to_string(),
                "Import purchases for this category, then run `sobreprecio analysis refresh`."
                    .to_string(),
            ],
        )
        .with_data(json!({
            "category_key": category_key,
        }))
    }

    pub fn internal_serialization(message: &str) -> Self {
        Self::new("internal_serialization_error", message, Vec::new())
    }

    pub fn store_init_permission_denied(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "store_init_permission_denied",
            &format!("Cannot initialize purchase store at `{location}`: {detail}"),
            vec![format!(
                "Grant write access to `{location}` or set `SOBREPRECIO_HOME` to a writable directory."
            )],
        )
    }

    pub fn store_locked(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "store_locked",
            &format!("Purchase store is locked at `{location}`."),
            vec![format!(
                "Close other processes using `{location}` so the lock is released."
            )],
        )
    }

    pub fn store_corrupt(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "store_corrupt",
            &format!("Purchase store appears corrupt at `{location}`."),
            vec![format!(
                "Replace `{location}` with a valid SQLite store or re-import your purchases."
            )],
        )
    }

    pub fn migration_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "migration_failed",
            &format!("Store migration failed at `{location}`: {detail}"),
            vec!["Resolve conflicting schema objects referenced in the error details.".to_string()],
        )
    }

    pub fn store_init_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "store_init_failed",
            &format!("Store operation failed at `{location}`: {detail}"),
            Vec::new(),
        )
    }
}

fn merge_import_help_data(mut data: Value) -> Value {
    if !data.is_object() {
        data = json!({});
    }

    if let Some(object) = data.as_object_mut() {
        object.insert(
            "help_command".to_string(),
            Value::String(IMPORT_HELP_COMMAND.to_string()),
        );
    }

    data
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::ClientError;

    #[test]
    fn command_hint_is_attached_to_invalid_argument() {
        let error = ClientError::invalid_argument_for_command("bad flag", Some("flagged"));
        assert_eq!(error.code, "invalid_argument");
        assert_eq!(
            error.recovery_steps,
            vec!["Run `sobreprecio flagged --help` for usage.".to_string()]
        );
        assert_eq!(
            error.data.and_then(|data| data.get("command_hint").cloned()),
            Some(serde_json::Value::String("flagged".to_string()))
        );
    }

    #[test]
    fn import_format_errors_carry_help_command() {
        let error = ClientError::invalid_import_format("nope", "ndjson");
        let help = error
            .data
            .as_ref()
            .and_then(|data| data.get("help_command"))
            .and_then(serde_json::Value::as_str);
        assert_eq!(help, Some("sobreprecio import create --help"));
    }

    #[test]
    fn policy_errors_name_the_file() {
        let error = ClientError::invalid_policy_config(Path::new("/tmp/policy.json"), "bad");
        assert_eq!(error.code, "invalid_policy_config");
        assert!(error.message.contains("/tmp/policy.json"));
    }
}

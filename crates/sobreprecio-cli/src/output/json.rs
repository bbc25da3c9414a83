use std::io;

use serde::Serialize;
use serde_json::{Value, json};
use sobreprecio_client::{ClientError, SuccessEnvelope};

const JSON_VERSION: &str = "v1";

const JSON_COMMANDS: [&str; 8] = [
    "import",
    "import list",
    "analysis refresh",
    "categories",
    "flagged",
    "rollup",
    "check",
    "policy",
];

pub fn render_success_json(success: &SuccessEnvelope) -> io::Result<String> {
    if !JSON_COMMANDS.contains(&success.command.as_str()) {
        return Err(io::Error::other(format!(
            "JSON output is not supported for command `{}`",
            success.command
        )));
    }

    serialize_json_pretty(&wrap_data(&success.data))
}

pub fn render_error_json(error: &ClientError) -> io::Result<String> {
    let mut payload = json!({
        "error": {
            "code": error.code,
            "message": error.message,
            "recovery_steps": error.recovery_steps,
        }
    });
    if let Some(data) = &error.data {
        payload["error"]["data"] = data.clone();
    }
    serialize_json_pretty(&payload)
}

fn wrap_data(data: &Value) -> Value {
    json!({
        "ok": true,
        "version": JSON_VERSION,
        "data": data.clone()
    })
}

fn serialize_json_pretty<T>(value: &T) -> io::Result<String>
where
    T: Serialize,
{
    serde_json::to_string_pretty(value).map_err(io::Error::other)
}

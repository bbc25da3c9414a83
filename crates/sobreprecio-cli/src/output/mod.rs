mod analysis_text;
mod error_text;
mod format;
mod import_text;
mod json;
mod mode;

use std::io;

use sobreprecio_client::{ClientError, SuccessEnvelope};

use crate::stdout_io::write_stdout_line;

pub use mode::{OutputMode, mode_for_command};

pub fn print_success(success: &SuccessEnvelope, mode: OutputMode) -> io::Result<()> {
    let body = match mode {
        OutputMode::Text => render_text_success(success)?,
        OutputMode::Json => json::render_success_json(success)?,
    };
    write_stdout_line(&body)
}

pub fn print_failure(error: &ClientError, mode: OutputMode) -> io::Result<()> {
    let body = match mode {
        OutputMode::Json => json::render_error_json(error)?,
        OutputMode::Text => error_text::render_error(error),
    };
    write_stdout_line(&body)
}

fn render_text_success(success: &SuccessEnvelope) -> io::Result<String> {
    match success.command.as_str() {
        "import" => import_text::render_import_run(&success.data),
        "import list" => import_text::render_import_list(&success.data),
        "analysis refresh" => analysis_text::render_refresh(&success.data),
        "categories" => analysis_text::render_categories(&success.data),
        "flagged" => analysis_text::render_flagged(&success.data),
        "rollup" => analysis_text::render_rollup(&success.data),
        "check" => analysis_text::render_check(&success.data),
        "policy" => analysis_text::render_policy(&success.data),
        _ => Err(io::Error::other(format!(
            "unsupported text output command `{}`",
            success.command
        ))),
    }
}

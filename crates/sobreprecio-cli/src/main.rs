mod cli;
mod dispatch;
mod output;
mod stdout_io;

use std::process::ExitCode;

use clap::{Parser, error::ErrorKind};
use sobreprecio_client::ClientError;
use stdout_io::write_stdout_text;
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "SOBREPRECIO_LOG";

const ROOT_HELP: &str = "Sobreprecio - overpricing detection for public procurement

Usage:
  sobreprecio <command>

Start here:
  sobreprecio import create --help
  sobreprecio categories
  sobreprecio flagged
";

const TOP_LEVEL_HELP: &str = "Sobreprecio - overpricing detection for public procurement

USAGE: sobreprecio <command>

Load purchases:
  1. sobreprecio import create --help                     Read the purchase schema
  2. sobreprecio import create --dry-run <path>           Validate without writing
  3. sobreprecio import create <path>                     Import and refresh the analysis

Review the analysis (refreshed on each import):
  sobreprecio categories                                  Reference price ranges per category
  sobreprecio flagged                                     Purchases flagged as overpriced
  sobreprecio rollup --level region                       Overpricing rate per jurisdiction
  sobreprecio check --category <key> --unit-price <p> --quantity <q>
                                                          Test a hypothetical purchase

Other commands:
  sobreprecio import list                                 List past imports
  sobreprecio analysis refresh                            Recompute statistics and flags
  sobreprecio policy                                      Show the effective thresholds

Logs go to stderr; set SOBREPRECIO_LOG=info (or debug) for detail.
";

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(code) => code,
        Err(code) => code,
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> Result<ExitCode, ExitCode> {
    let raw_args = std::env::args().collect::<Vec<String>>();
    if raw_args.len() == 1 {
        if write_stdout_text(ROOT_HELP).is_err() {
            return Err(ExitCode::from(2));
        }
        return Ok(ExitCode::SUCCESS);
    }
    let parsed = cli::Cli::try_parse();
    let cli = match parsed {
        Ok(value) => value,
        Err(err) => {
            if matches!(
                err.kind(),
                ErrorKind::DisplayHelp
                    | ErrorKind::DisplayVersion
                    | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            ) {
                let text = if err.kind() != ErrorKind::DisplayVersion
                    && is_top_level_help_request(&raw_args)
                {
                    TOP_LEVEL_HELP.to_string()
                } else {
                    err.to_string()
                };
                if write_stdout_text(&text).is_err() {
                    return Err(ExitCode::from(2));
                }
                return Ok(ExitCode::SUCCESS);
            }
            let command_hint = if matches!(
                err.kind(),
                ErrorKind::MissingRequiredArgument
                    | ErrorKind::InvalidValue
                    | ErrorKind::ValueValidation
                    | ErrorKind::WrongNumberOfValues
                    | ErrorKind::UnknownArgument
                    | ErrorKind::InvalidSubcommand
            ) {
                command_path_from_args(&raw_args)
            } else {
                None
            };
            let clean_message = strip_clap_boilerplate(&err.to_string());
            let parse_error =
                ClientError::invalid_argument_for_command(&clean_message, command_hint.as_deref());
            let mode = infer_requested_output_mode(&raw_args);
            if output::print_failure(&parse_error, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            return Err(ExitCode::from(1));
        }
    };
    let mode = output::mode_for_command(&cli.command);

    match dispatch::dispatch(&cli) {
        Ok(success) => {
            if output::print_success(&success, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            tracing::debug!(code = %error.code, "command failed");
            if output::print_failure(&error, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            Err(exit_code_for_error(&error))
        }
    }
}

fn is_top_level_help_request(raw_args: &[String]) -> bool {
    raw_args.len() == 2 && matches!(raw_args[1].as_str(), "--help" | "-h")
}

/// Drops clap's trailing usage and "For more information" lines; the
/// "What to do next" section carries the guidance instead.
fn strip_clap_boilerplate(message: &str) -> String {
    let trimmed = if let Some(pos) = message.find("\n\nUsage:") {
        &message[..pos]
    } else if let Some(pos) = message.find("\nFor more information") {
        &message[..pos]
    } else {
        message
    };
    trimmed.trim_end().to_string()
}

/// Subcommand path (e.g. "import create") for help hints, from raw args.
fn command_path_from_args(raw_args: &[String]) -> Option<String> {
    let non_flags: Vec<&str> = raw_args
        .iter()
        .skip(1)
        .filter(|value| !value.starts_with('-'))
        .map(String::as_str)
        .collect();

    let hint = match non_flags.as_slice() {
        ["import", "create", ..] => Some("import create"),
        ["import", "list", ..] => Some("import list"),
        ["import", ..] => Some("import"),
        ["analysis", "refresh", ..] => Some("analysis refresh"),
        ["analysis", ..] => Some("analysis"),
        ["categories", ..] => Some("categories"),
        ["flagged", ..] => Some("flagged"),
        ["rollup", ..] => Some("rollup"),
        ["check", ..] => Some("check"),
        ["policy", ..] => Some("policy"),
        _ => None,
    };
    hint.map(str::to_string)
}

fn exit_code_for_error(error: &ClientError) -> ExitCode {
    if is_internal_error(error) {
        ExitCode::from(2)
    } else {
        ExitCode::from(1)
    }
}

fn infer_requested_output_mode(raw_args: &[String]) -> output::OutputMode {
    if raw_args.iter().skip(1).any(|value| value == "--json") {
        return output::OutputMode::Json;
    }
    output::OutputMode::Text
}

fn is_internal_error(error: &ClientError) -> bool {
    error.code.starts_with("internal_")
        || matches!(
            error.code.as_str(),
            "store_init_permission_denied"
                | "store_locked"
                | "store_corrupt"
                | "migration_failed"
                | "store_init_failed"
        )
}

use std::fs;
use std::io::{IsTerminal, Read};

use crate::import::invalid_input_error;
use crate::{ClientError, ClientResult};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum SourceKind {
    File,
    Stdin,
}

impl SourceKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Stdin => "stdin",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ResolvedSource {
    pub(crate) source_kind: SourceKind,
    pub(crate) source_ref: Option<String>,
    pub(crate) content: String,
}

/// Resolves exactly one import source: a file path, or stdin via `-` or a pipe.
pub(crate) fn resolve_source(
    path: Option<String>,
    stdin_override: Option<String>,
) -> ClientResult<ResolvedSource> {
    match path {
        Some(path_value) if path_value == "-" => {
            let Some(stdin_value) = read_stdin(stdin_override)? else {
                return Err(invalid_input_error(
                    "Path `-` means stdin input, but stdin was empty. Pipe JSON/CSV input or pass a file path.",
                ));
            };
            Ok(ResolvedSource {
                source_kind: SourceKind::Stdin,
                source_ref: None,
                content: stdin_value,
            })
        }
        Some(path_value) => {
            if stdin_override
                .as_ref()
                .is_some_and(|value| !value.trim().is_empty())
            {
                return Err(invalid_input_error(
                    "Both stdin and file input were provided. Pass exactly one source: either a file path or piped stdin.",
                ));
            }
            let file_body = fs::read_to_string(&path_value).map_err(|error| {
                ClientError::invalid_argument_with_recovery(
                    &format!("Could not read import file `{path_value}`: {error}"),
                    vec![
                        "Verify the path exists and is readable.".to_string(),
                        "Rerun sobreprecio import create <path>.".to_string(),
                    ],
                )
            })?;
            Ok(ResolvedSource {
                source_kind: SourceKind::File,
                source_ref: Some(path_value),
                content: file_body,
            })
        }
        None => {
            let Some(stdin_value) = read_stdin(stdin_override)? else {
                return Err(invalid_input_error(
                    "No import source provided. Pass a file path or pipe input via stdin.",
                ));
            };
            Ok(ResolvedSource {
                source_kind: SourceKind::Stdin,
                source_ref: None,
                content: stdin_value,
            })
        }
    }
}

fn read_stdin(stdin_override: Option<String>) -> ClientResult<Option<String>> {
    if let Some(value) = stdin_override {
        return Ok(Some(value).filter(|body| !body.trim().is_empty()));
    }

    if std::io::stdin().is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|error| {
            ClientError::invalid_argument_with_recovery(
                &format!("Could not read stdin: {error}"),
                vec![
                    "Retry with an explicit file path argument.".to_string(),
                    "Or rerun with valid stdin content.".to_string(),
                ],
            )
        })?;

    if buffer.trim().is_empty() {
        return Ok(None);
    }

    Ok(Some(buffer))
}

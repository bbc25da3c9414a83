use sobreprecio_client::ClientError;

pub fn render_error(error: &ClientError) -> String {
    let mut lines = vec![
        "Something went wrong, but it's easy to fix.".to_string(),
        String::new(),
        format!("  Error:    {}", error.code),
        format!("  Details:  {}", error.message),
    ];

    let issues = import_issue_lines(error);
    if !issues.is_empty() {
        lines.push(String::new());
        lines.push("Invalid rows:".to_string());
        lines.extend(issues);
    }

    lines.push(String::new());
    lines.push("What to do next:".to_string());
    if error.recovery_steps.is_empty() {
        lines.push("  1. Retry the command.".to_string());
    } else {
        for (index, step) in error.recovery_steps.iter().enumerate() {
            lines.push(format!("  {}. {step}", index + 1));
        }
    }

    lines.join("\n")
}

const MAX_ISSUE_LINES: usize = 10;

/// First few row issues from an `import_validation_failed` payload.
fn import_issue_lines(error: &ClientError) -> Vec<String> {
    let Some(issues) = error
        .data
        .as_ref()
        .and_then(|data| data.get("issues"))
        .and_then(|value| value.as_array())
    else {
        return Vec::new();
    };

    let mut lines = issues
        .iter()
        .take(MAX_ISSUE_LINES)
        .map(|issue| {
            let row = issue.get("row").and_then(|value| value.as_i64()).unwrap_or(0);
            let field = issue.get("field").and_then(|value| value.as_str()).unwrap_or("");
            let description = issue
                .get("description")
                .and_then(|value| value.as_str())
                .unwrap_or("");
            format!("  Row {row} ({field}): {description}")
        })
        .collect::<Vec<String>>();

    if issues.len() > MAX_ISSUE_LINES {
        lines.push(format!(
            "  ...and {} more (use --json for the full list).",
            issues.len() - MAX_ISSUE_LINES
        ));
    }
    lines
}

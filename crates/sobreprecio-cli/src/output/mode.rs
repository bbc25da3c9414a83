use crate::cli::{AnalysisCommand, Commands, ImportCommand};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OutputMode {
    Text,
    Json,
}

pub fn mode_for_command(command: &Commands) -> OutputMode {
    let json = match command {
        Commands::Import { command } => match command {
            ImportCommand::Create { json, .. } | ImportCommand::List { json } => *json,
        },
        Commands::Analysis { command } => match command {
            AnalysisCommand::Refresh { json } => *json,
        },
        Commands::Categories { json, .. }
        | Commands::Flagged { json, .. }
        | Commands::Rollup { json, .. }
        | Commands::Check { json, .. }
        | Commands::Policy { json } => *json,
    };

    if json {
        OutputMode::Json
    } else {
        OutputMode::Text
    }
}

#[cfg(test)]
mod tests {
    use super::{OutputMode, mode_for_command};
    use crate::cli::parse_from;

    fn mode_of(args: &[&str]) -> Option<OutputMode> {
        parse_from(args.iter().copied())
            .ok()
            .map(|cli| mode_for_command(&cli.command))
    }

    #[test]
    fn json_flag_selects_json_for_every_command() {
        let cases: [&[&str]; 7] = [
            &["sobreprecio", "import", "create", "--dry-run", "rows.csv", "--json"],
            &["sobreprecio", "import", "list", "--json"],
            &["sobreprecio", "analysis", "refresh", "--json"],
            &["sobreprecio", "categories", "--json"],
            &["sobreprecio", "flagged", "--limit", "3", "--json"],
            &["sobreprecio", "rollup", "--level", "region", "--json"],
            &["sobreprecio", "policy", "--json"],
        ];
        for case in cases {
            assert_eq!(mode_of(case), Some(OutputMode::Json), "case: {case:?}");
        }
    }

    #[test]
    fn check_with_json_flag_uses_json() {
        let mode = mode_of(&[
            "sobreprecio",
            "check",
            "--category",
            "42131606",
            "--unit-price",
            "100",
            "--quantity",
            "1",
            "--json",
        ]);
        assert_eq!(mode, Some(OutputMode::Json));
    }

    #[test]
    fn text_is_the_default() {
        assert_eq!(
            mode_of(&["sobreprecio", "import", "create", "rows.csv"]),
            Some(OutputMode::Text)
        );
        assert_eq!(mode_of(&["sobreprecio", "flagged"]), Some(OutputMode::Text));
        assert_eq!(mode_of(&["sobreprecio", "policy"]), Some(OutputMode::Text));
    }
}

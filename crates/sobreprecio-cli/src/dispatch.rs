use sobreprecio_client::commands;
use sobreprecio_client::commands::flagged::FlaggedFilters;
use sobreprecio_client::{ClientResult, SuccessEnvelope};

use crate::cli::{AnalysisCommand, Cli, Commands, ImportCommand};

pub fn dispatch(cli: &Cli) -> ClientResult<SuccessEnvelope> {
    match &cli.command {
        Commands::Import { command } => match command {
            ImportCommand::Create { dry_run, path, .. } => {
                commands::import::run(path.clone(), *dry_run)
            }
            ImportCommand::List { .. } => commands::import::list(),
        },
        Commands::Analysis { command } => match command {
            AnalysisCommand::Refresh { .. } => commands::analysis::refresh(),
        },
        Commands::Categories {
            category,
            sufficient_only,
            ..
        } => commands::categories::run(category.as_deref(), *sufficient_only),
        Commands::Flagged {
            category,
            municipality,
            region,
            from,
            to,
            limit,
            ..
        } => commands::flagged::run(FlaggedFilters {
            category: category.as_deref(),
            municipality: municipality.as_deref(),
            region: region.as_deref(),
            from: from.as_ref().map(|value| value.as_str()),
            to: to.as_ref().map(|value| value.as_str()),
            limit: *limit,
        }),
        Commands::Rollup { level, .. } => commands::rollup::run(level.as_deref()),
        Commands::Check {
            category,
            unit_price,
            quantity,
            ..
        } => commands::check::run(category, *unit_price, *quantity),
        Commands::Policy { .. } => commands::policy::run(),
    }
}

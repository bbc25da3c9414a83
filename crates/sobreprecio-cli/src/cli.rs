use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsoDate(pub String);

impl IsoDate {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub fn parse_iso_date(value: &str) -> Result<IsoDate, String> {
    if value.len() != 10 {
        return Err("date must use YYYY-MM-DD format".to_string());
    }

    let bytes = value.as_bytes();
    if bytes[4] != b'-' || bytes[7] != b'-' {
        return Err("date must use YYYY-MM-DD format".to_string());
    }

    if NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() {
        return Err("date must use valid calendar values".to_string());
    }

    Ok(IsoDate(value.to_string()))
}

pub fn parse_rollup_level(value: &str) -> Result<String, String> {
    match value {
        "municipality" | "region" | "country" => Ok(value.to_string()),
        _ => Err("level must be one of: municipality, region, country".to_string()),
    }
}

pub fn parse_finite_number(value: &str) -> Result<f64, String> {
    match value.parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(number),
        _ => Err("value must be a finite number".to_string()),
    }
}

/// Extended help shown after `sobreprecio import create --help`.
pub const IMPORT_CREATE_AFTER_HELP: &str = "\
How import works:
  Each row is one purchase order line from the public procurement system.
  Every import recomputes the reference price ranges and the overpricing
  flags for all stored purchases.

  Accepted formats:
    JSON: one top-level array of purchase objects
    CSV:  one header row with schema field names

  <path> is a local file path. Use `-` to read stdin.
  Example: cat purchases.csv | sobreprecio import create --dry-run -

  A single invalid row rejects the whole file; nothing is written.

Import schema:
  JSON example:
  [
    {
      \"category_key\": \"42131606\",
      \"category_label\": \"Guantes quirúrgicos\",
      \"unit_price\": 1290,
      \"quantity\": 200,
      \"municipality\": \"Valdivia\",
      \"region\": \"Los Ríos\",
      \"supplier\": \"Comercial Sur Ltda\",
      \"item_description\": \"Guante nitrilo talla M\",
      \"purchased_at\": \"2024-03-15\",
      \"external_id\": \"2341-55-SE24\"
    }
  ]

  CSV example:
  category_key,unit_price,quantity,municipality,region,purchased_at
  42131606,1290,200,Valdivia,Los Ríos,2024-03-15

Field rules:
  category_key (required): product category code; purchases are compared
    only within the same category.
  quantity (required): number >= 0.
  municipality, region (required): buying jurisdiction.
  unit_price (optional): CLP per unit. Empty, zero or negative prices are
    stored but do not count toward reference ranges and are never flagged.
  purchased_at (optional): date, exactly `YYYY-MM-DD`.
  external_id, category_label, supplier, item_description (optional): text.

What to do next:
  1. Run `sobreprecio import create --dry-run <path>` and fix any reported issues.
  2. Run `sobreprecio import create <path>` once the dry run passes.
  3. Run `sobreprecio flagged` to review overpriced purchases.
";

#[derive(Debug, Parser)]
#[command(
    name = "sobreprecio",
    version,
    about = "overpricing detection for public procurement",
    disable_help_subcommand = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage purchase imports
    #[command(arg_required_else_help = true)]
    Import {
        #[command(subcommand)]
        command: ImportCommand,
    },
    /// Maintain the stored overpricing analysis
    #[command(arg_required_else_help = true)]
    Analysis {
        #[command(subcommand)]
        command: AnalysisCommand,
    },
    /// Show reference price ranges per product category
    Categories {
        /// Only show this category key
        #[arg(long)]
        category: Option<String>,
        /// Only show categories with enough history to flag purchases
        #[arg(long)]
        sufficient_only: bool,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// List purchases flagged as overpriced, largest excess first
    Flagged {
        /// Category key filter
        #[arg(long)]
        category: Option<String>,
        /// Municipality filter
        #[arg(long)]
        municipality: Option<String>,
        /// Region filter
        #[arg(long)]
        region: Option<String>,
        /// Start date filter on purchased_at (YYYY-MM-DD)
        #[arg(long, value_parser = parse_iso_date)]
        from: Option<IsoDate>,
        /// End date filter on purchased_at (YYYY-MM-DD)
        #[arg(long, value_parser = parse_iso_date)]
        to: Option<IsoDate>,
        /// Maximum number of rows to show
        #[arg(long)]
        limit: Option<i64>,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Show overpricing rates per municipality, region or country
    Rollup {
        /// Aggregation level: municipality, region or country
        #[arg(long, value_parser = parse_rollup_level)]
        level: Option<String>,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Classify a hypothetical purchase against stored reference ranges
    Check {
        /// Category key of the purchase
        #[arg(long)]
        category: String,
        /// Unit price in CLP
        #[arg(long, value_parser = parse_finite_number, allow_negative_numbers = true)]
        unit_price: f64,
        /// Number of units
        #[arg(long, value_parser = parse_finite_number)]
        quantity: f64,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Show the effective overpricing policy
    Policy {
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ImportCommand {
    /// Import purchase data and refresh the overpricing analysis
    #[command(after_long_help = IMPORT_CREATE_AFTER_HELP)]
    Create {
        /// Validate import data without writing to the store
        #[arg(long)]
        dry_run: bool,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
        /// Path to a JSON or CSV file (use `-` for stdin)
        path: Option<String>,
    },
    /// List past imports with their row counts
    List {
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum AnalysisCommand {
    /// Recompute every reference range and classification
    Refresh {
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
pub fn parse_from<I, T>(itr: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(itr)
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::{AnalysisCommand, Commands, ImportCommand, parse_from};

    #[test]
    fn parse_command_paths() {
        let cases: [Vec<&str>; 14] = [
            vec!["sobreprecio", "import", "create"],
            vec!["sobreprecio", "import", "create", "--dry-run", "./compras.csv"],
            vec!["sobreprecio", "import", "create", "-", "--json"],
            vec!["sobreprecio", "import", "list", "--json"],
            vec!["sobreprecio", "analysis", "refresh"],
            vec!["sobreprecio", "categories", "--sufficient-only"],
            vec!["sobreprecio", "categories", "--category", "42131606", "--json"],
            vec!["sobreprecio", "flagged"],
            vec![
                "sobreprecio",
                "flagged",
                "--region",
                "Los Ríos",
                "--from",
                "2024-01-01",
                "--to",
                "2024-12-31",
                "--limit",
                "20",
            ],
            vec!["sobreprecio", "rollup"],
            vec!["sobreprecio", "rollup", "--level", "country", "--json"],
            vec![
                "sobreprecio",
                "check",
                "--category",
                "42131606",
                "--unit-price",
                "15000",
                "--quantity",
                "7",
            ],
            vec!["sobreprecio", "policy"],
            vec!["sobreprecio", "policy", "--json"],
        ];

        for case in cases {
            let parsed = parse_from(case.clone());
            assert!(parsed.is_ok(), "failed to parse: {case:?}");
        }
    }

    #[test]
    fn parse_import_json_flags() {
        let parsed = parse_from(["sobreprecio", "import", "create", "--dry-run", "rows.csv", "--json"]);
        assert!(parsed.is_ok());
        if let Ok(cli) = parsed {
            assert!(matches!(
                cli.command,
                Commands::Import {
                    command: ImportCommand::Create {
                        dry_run: true,
                        json: true,
                        path: Some(_),
                    },
                }
            ));
        }
    }

    #[test]
    fn parse_analysis_refresh() {
        let parsed = parse_from(["sobreprecio", "analysis", "refresh", "--json"]);
        assert!(parsed.is_ok());
        if let Ok(cli) = parsed {
            assert!(matches!(
                cli.command,
                Commands::Analysis {
                    command: AnalysisCommand::Refresh { json: true }
                }
            ));
        }
    }

    #[test]
    fn check_accepts_negative_prices_but_not_text() {
        let negative = parse_from([
            "sobreprecio",
            "check",
            "--category",
            "1",
            "--unit-price",
            "-5",
            "--quantity",
            "1",
        ]);
        assert!(negative.is_ok());

        let text = parse_from([
            "sobreprecio",
            "check",
            "--category",
            "1",
            "--unit-price",
            "caro",
            "--quantity",
            "1",
        ]);
        assert!(text.is_err());

        let missing = parse_from(["sobreprecio", "check", "--category", "1"]);
        assert!(missing.is_err());
        if let Err(err) = missing {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(parse_from(["sobreprecio", "flagged", "--from", "2024-13-01"]).is_err());
        assert!(parse_from(["sobreprecio", "rollup", "--level", "province"]).is_err());
        assert!(parse_from(["sobreprecio", "flagged", "--limit", "many"]).is_err());
    }

    #[test]
    fn bare_groups_show_help() {
        for group in ["import", "analysis"] {
            let parsed = parse_from(["sobreprecio", group]);
            assert!(parsed.is_err());
            if let Err(err) = parsed {
                assert_eq!(
                    err.kind(),
                    ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                );
            }
        }
    }

    #[test]
    fn help_subcommand_is_rejected() {
        assert!(parse_from(["sobreprecio", "help"]).is_err());
    }
}

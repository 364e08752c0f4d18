use anyhow::Result;
use btcbook::log::init_logging;
use chrono::{DateTime, Utc};
use clap::{CommandFactory, Parser, Subcommand};
use rust_decimal::Decimal;
use std::time::Duration;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display balance, bitcoin rate and recent transactions
    Dashboard {
        /// Number of transaction pages to load
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Record a transaction; negative amounts are spends
    Add {
        /// Signed BTC amount, e.g. -0.05
        #[arg(long, allow_hyphen_values = true)]
        amount: String,
        #[arg(long)]
        category: String,
        /// RFC 3339 timestamp, defaults to now
        #[arg(long)]
        date: Option<String>,
    },
    /// Top up the balance
    Topup {
        /// BTC amount, must be positive
        #[arg(long)]
        amount: String,
    },
    /// Poll the bitcoin rate and print live updates
    Watch {
        /// Override the polling interval, in seconds
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Populate an empty ledger with demo transactions
    Seed,
}

impl TryFrom<Commands> for btcbook::AppCommand {
    type Error = anyhow::Error;

    fn try_from(cmd: Commands) -> Result<btcbook::AppCommand> {
        Ok(match cmd {
            Commands::Dashboard { pages } => btcbook::AppCommand::Dashboard { pages },
            Commands::Add {
                amount,
                category,
                date,
            } => btcbook::AppCommand::Add {
                amount: parse_amount(&amount)?,
                category,
                date: date.as_deref().map(parse_date).transpose()?,
            },
            Commands::Topup { amount } => btcbook::AppCommand::TopUp {
                amount: parse_amount(&amount)?,
            },
            Commands::Watch { interval } => btcbook::AppCommand::Watch {
                interval: interval.map(Duration::from_secs),
            },
            Commands::Seed => btcbook::AppCommand::Seed,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        })
    }
}

fn parse_amount(raw: &str) -> Result<Decimal> {
    raw.parse()
        .map_err(|e| anyhow::anyhow!("Invalid BTC amount '{raw}': {e}"))
}

fn parse_date(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .map_err(|e| anyhow::anyhow!("Invalid RFC 3339 date '{raw}': {e}"))?
        .with_timezone(&Utc))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => btcbook::cli::setup::setup(),
        Some(cmd) => btcbook::run_command(cmd.try_into()?, cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_accepts_signed_decimals() {
        assert_eq!(parse_amount("-0.05").unwrap(), "-0.05".parse().unwrap());
        assert_eq!(parse_amount("1.5").unwrap(), "1.5".parse().unwrap());
        assert!(parse_amount("ten").is_err());
    }

    #[test]
    fn test_parse_date_requires_rfc3339() {
        assert!(parse_date("2025-02-04T12:00:00Z").is_ok());
        assert!(parse_date("yesterday").is_err());
    }
}

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use cotiza::core::convert::Field;
use cotiza::core::log::init_logging;

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
    /// Refresh and display today's indicators
    Show,
    /// Convert an amount between CLP, UF, USD, EUR and UTM
    Convert {
        /// Currency of the amount: clp, uf, usd, eur or utm
        #[arg(value_parser = parse_field)]
        field: Field,
        /// Amount to convert
        #[arg(allow_negative_numbers = true)]
        amount: f64,
    },
    /// Display today's query quota and gold blocks
    Quota,
}

fn parse_field(s: &str) -> Result<Field, String> {
    s.parse().map_err(|e: cotiza::core::IndicatorError| e.to_string())
}

impl Commands {
    fn into_app_command(self) -> Option<cotiza::AppCommand> {
        match self {
            Commands::Setup => None,
            Commands::Show => Some(cotiza::AppCommand::Show),
            Commands::Convert { field, amount } => {
                Some(cotiza::AppCommand::Convert { field, amount })
            }
            Commands::Quota => Some(cotiza::AppCommand::Quota),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command.map(Commands::into_app_command) {
        Some(None) => cotiza::cli::setup::setup(),
        Some(Some(cmd)) => cotiza::run_command(cmd, cli.config_path.as_deref()).await,
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

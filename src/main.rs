use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use pricewatch::core::log::init_logging;

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

impl From<Commands> for pricewatch::AppCommand {
    fn from(cmd: Commands) -> pricewatch::AppCommand {
        match cmd {
            Commands::Show { groups } => pricewatch::AppCommand::Show { groups },
            Commands::Watch { groups, interval } => pricewatch::AppCommand::Watch {
                groups,
                interval_secs: interval,
            },
            Commands::List => pricewatch::AppCommand::List,
            Commands::Config => pricewatch::AppCommand::Config,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Show current prices once
    Show {
        /// Groups to show (stocks, hkstocks, gold, crypto); all when omitted
        groups: Vec<String>,
    },
    /// Refresh prices on an interval until Ctrl-C
    Watch {
        /// Groups to show (stocks, hkstocks, gold, crypto); all when omitted
        groups: Vec<String>,

        /// Seconds between refreshes, overrides the configured interval
        #[arg(short, long)]
        interval: Option<u64>,
    },
    /// List the configured watchlist
    List,
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => pricewatch::cli::setup::setup_at_path(path),
            None => pricewatch::cli::setup::setup(),
        },
        Some(cmd) => pricewatch::run_command(cmd.into(), cli.config_path.as_deref()).await,
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

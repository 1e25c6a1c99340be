pub mod cli;
pub mod core;
pub mod providers;

use crate::core::{AppConfig, FetchOptions, Sources};
use anyhow::Result;
use std::time::Duration;
use tracing::{debug, info};

pub enum AppCommand {
    /// Fetch and print one snapshot, optionally limited to some groups
    Show { groups: Vec<String> },
    /// Keep refreshing the snapshot
    Watch {
        groups: Vec<String>,
        interval_secs: Option<u64>,
    },
    /// Print the watchlist without fetching
    List,
    /// Print the effective configuration
    Config,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("pricewatch starting...");

    let config = AppConfig::load_or_default(config_path);
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Show { groups } => {
            config.watchlist.validate()?;
            let watchlist = config.watchlist.select(&groups)?;
            let sources = Sources::from_config(&config.providers)?;
            let options = FetchOptions::from(config.fetch);
            cli::show::run(&watchlist, &sources, &options).await
        }
        AppCommand::Watch {
            groups,
            interval_secs,
        } => {
            config.watchlist.validate()?;
            let watchlist = config.watchlist.select(&groups)?;
            let sources = Sources::from_config(&config.providers)?;
            let options = FetchOptions::from(config.fetch);
            let interval = Duration::from_secs(interval_secs.unwrap_or(config.interval_secs).max(1));
            cli::watch::run(&watchlist, &sources, &options, interval).await
        }
        AppCommand::List => {
            cli::list::run(&config.watchlist);
            Ok(())
        }
        AppCommand::Config => cli::config::run(&config, config_path),
    }
}

use super::{report, show, ui};
use crate::core::{FetchOptions, Sources, Watchlist};
use anyhow::{Context, Result};
use chrono::Local;
use console::Term;
use std::time::Duration;
use tracing::{debug, info};

/// Re-renders the watchlist every `interval` until Ctrl-C.
pub async fn run(
    watchlist: &Watchlist,
    sources: &Sources,
    options: &FetchOptions,
    interval: Duration,
) -> Result<()> {
    if watchlist.is_empty() {
        println!("No symbols configured in the watchlist.");
        return Ok(());
    }

    let term = Term::stdout();
    info!(?interval, "Watching prices");

    loop {
        let report = tokio::select! {
            result = show::fetch_report(watchlist, sources, options) => result?,
            _ = tokio::signal::ctrl_c() => break,
        };

        term.clear_screen()
            .context("Failed to clear the terminal")?;
        println!(
            "{}",
            report::render_report(&report, Local::now().naive_local())
        );
        ui::print_separator();
        println!(
            "{}",
            ui::style_text(
                &format!("Refreshing every {}s, press Ctrl-C to stop", interval.as_secs()),
                ui::StyleType::Subtle
            )
        );

        tokio::select! {
            _ = tokio::time::sleep(interval) => debug!("Refreshing"),
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    info!("Stopped watching");
    Ok(())
}

use super::{report, ui};
use crate::core::{FetchOptions, Report, Sources, Watchlist, aggregate};
use anyhow::Result;
use chrono::Local;

/// Runs one aggregation pass behind a progress bar.
pub async fn fetch_report(
    watchlist: &Watchlist,
    sources: &Sources,
    options: &FetchOptions,
) -> Result<Report> {
    let pb = ui::new_progress_bar(watchlist.symbol_count() as u64);
    pb.set_message("Fetching quotes...");

    let result = aggregate(watchlist, sources, options, &|| pb.inc(1)).await;
    pb.finish_and_clear();
    result
}

pub async fn run(watchlist: &Watchlist, sources: &Sources, options: &FetchOptions) -> Result<()> {
    let report = fetch_report(watchlist, sources, options).await?;
    println!(
        "{}",
        report::render_report(&report, Local::now().naive_local())
    );
    Ok(())
}

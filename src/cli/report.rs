//! Renders an aggregation report as grouped, colorized tables.

use super::ui;
use crate::core::{FetchOutcome, GroupKey, GroupReport, Report};
use chrono::NaiveDateTime;
use comfy_table::Cell;

fn group_title(group: &GroupReport) -> String {
    let title = ui::style_text(&group.display_name, ui::StyleType::Title);
    match group.key {
        // Metals quotes are synthesized locally, never fetched.
        GroupKey::Gold => format!(
            "{} {}",
            title,
            ui::style_text("(simulated)", ui::StyleType::Subtle)
        ),
        _ => title,
    }
}

pub fn render_group(group: &GroupReport) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Name"),
        ui::header_cell("Symbol"),
        ui::header_cell("Price"),
        ui::header_cell("Change"),
    ]);

    for row in &group.rows {
        let (price, change) = match row.outcome {
            FetchOutcome::Success(quote) => (
                ui::price_cell(quote.price),
                ui::change_cell(quote.percent_change),
            ),
            FetchOutcome::Unavailable => (ui::na_cell(true), ui::na_cell(true)),
        };
        table.add_row(vec![
            Cell::new(&row.entry.display_name),
            Cell::new(&row.entry.symbol),
            price,
            change,
        ]);
    }

    format!("{}\n{}", group_title(group), table)
}

pub fn render_report(report: &Report, taken_at: NaiveDateTime) -> String {
    if report.is_empty() {
        return "No symbols configured in the watchlist.".to_string();
    }

    let mut output = format!(
        "Market snapshot {}\n",
        ui::style_text(
            &taken_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ui::StyleType::Subtle
        )
    );

    for group in &report.groups {
        output.push('\n');
        output.push_str(&render_group(group));
        output.push('\n');
    }

    let unavailable = report.unavailable_count();
    if unavailable > 0 {
        output.push_str(&format!(
            "\n{}\n",
            ui::style_text(
                &format!("{} of {} quotes unavailable", unavailable, report.len()),
                ui::StyleType::Error
            )
        ));
    }
    output
}

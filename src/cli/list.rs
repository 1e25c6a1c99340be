use super::ui;
use crate::core::Watchlist;
use comfy_table::Cell;

/// Lists configured groups and symbols without fetching anything.
pub fn render_watchlist(watchlist: &Watchlist) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Group"),
        ui::header_cell("Name"),
        ui::header_cell("Symbol"),
    ]);

    for group in watchlist.groups() {
        if group.entries.is_empty() {
            table.add_row(vec![
                Cell::new(format!("{} ({})", group.display_name, group.key)),
                ui::na_cell(false),
                ui::na_cell(false),
            ]);
            continue;
        }
        for (i, entry) in group.entries.iter().enumerate() {
            // Group label only on its first row
            let label = if i == 0 {
                format!("{} ({})", group.display_name, group.key)
            } else {
                String::new()
            };
            table.add_row(vec![
                Cell::new(label),
                Cell::new(&entry.display_name),
                Cell::new(&entry.symbol),
            ]);
        }
    }

    table.to_string()
}

pub fn run(watchlist: &Watchlist) {
    println!("{}", render_watchlist(watchlist));
    println!(
        "{}",
        ui::style_text(
            &format!(
                "{} groups, {} symbols",
                watchlist.groups().len(),
                watchlist.symbol_count()
            ),
            ui::StyleType::Subtle
        )
    );
}

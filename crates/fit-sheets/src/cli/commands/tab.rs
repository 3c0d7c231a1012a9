//! Inspect stored tabs

use crate::cli::OutputFormat;
use crate::config::Settings;
use crate::error::Result;
use crate::storage::{JsonTabStore, Tab, TabStore};
use crate::table::Table;

/// Widest a column is printed in table mode
const MAX_COLUMN_WIDTH: usize = 24;

/// Print a stored tab
pub async fn show(settings: &Settings, tab: Tab, format: OutputFormat) -> Result<()> {
    let store = JsonTabStore::open(&settings.store_dir)?;
    let table = store.read_tab(tab)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&table)?),
        OutputFormat::Table => {
            if table.is_empty() {
                println!("No rows in {}.", tab);
                return Ok(());
            }
            print!("{}", render_table(&table));
            println!("\nShowing {} rows", table.len());
        }
    }

    Ok(())
}

/// Fixed-width rendering with a header rule; blank cells print as `-`
pub fn render_table(table: &Table) -> String {
    let widths: Vec<usize> = table
        .columns()
        .iter()
        .map(|c| {
            table
                .rows()
                .iter()
                .map(|r| display_cell(&r.get(c).to_string()).chars().count())
                .chain(std::iter::once(c.chars().count()))
                .max()
                .unwrap_or(1)
                .min(MAX_COLUMN_WIDTH)
        })
        .collect();

    let mut out = String::new();
    let header: Vec<String> = table
        .columns()
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:<w$}", truncate(c, *w), w = w))
        .collect();
    out.push_str(header.join(" ").trim_end());
    out.push('\n');
    out.push_str(&"-".repeat(widths.iter().sum::<usize>() + widths.len().saturating_sub(1)));
    out.push('\n');

    for row in table.rows() {
        let line: Vec<String> = table
            .columns()
            .iter()
            .zip(&widths)
            .map(|(c, w)| {
                let text = row.get(c).to_string();
                format!("{:<w$}", truncate(display_cell(&text), *w), w = w)
            })
            .collect();
        out.push_str(line.join(" ").trim_end());
        out.push('\n');
    }
    out
}

fn display_cell(text: &str) -> &str {
    if text.is_empty() {
        "-"
    } else {
        text
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

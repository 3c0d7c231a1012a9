//! Offline merge of two stored table files

use std::fs;
use std::path::Path;

use crate::error::{FitError, Result};
use crate::merge::merge_with_report;
use crate::table::Table;

/// Merge `new` into `existing` and print the merged table as JSON.
/// The merge report goes to stderr.
pub async fn run(existing: &Path, new: &Path) -> Result<()> {
    let existing = read_table(existing)?;
    let new = read_table(new)?;

    let (merged, report) = merge_with_report(&existing, &new);
    println!("{}", serde_json::to_string_pretty(&merged)?);
    eprintln!("{}", report);
    for skipped in &report.skipped_columns {
        eprintln!("  skipped: {}", skipped);
    }

    Ok(())
}

/// Read a `{"columns": [...], "rows": [[...]]}` table file
pub fn read_table(path: &Path) -> Result<Table> {
    let json = fs::read_to_string(path)
        .map_err(|e| FitError::storage(format!("Failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&json)
        .map_err(|e| FitError::storage(format!("Failed to parse {}: {}", path.display(), e)))
}

//! JSON file per tab, rewritten atomically

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{FitError, Result};
use crate::table::{canonical_date, Cell, Table, DATE_COLUMN};

use super::{Tab, TabStore};

/// Tab store keeping one `<Tab>.json` file per tab under a base directory
#[derive(Debug, Clone)]
pub struct JsonTabStore {
    base_path: PathBuf,
}

impl JsonTabStore {
    /// Create a store rooted at `base_path`, creating the directory if needed
    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).map_err(|e| {
            FitError::storage(format!("Failed to create directory {:?}: {}", base_path, e))
        })?;
        Ok(Self { base_path })
    }

    /// Path of the file backing a tab
    pub fn tab_path(&self, tab: Tab) -> PathBuf {
        self.base_path.join(format!("{}.json", tab.name()))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Write to a temp file first, then rename over the target
    fn write_atomic(&self, path: &Path, contents: &str) -> Result<()> {
        let temp_path = path.with_extension("json.tmp");

        fs::write(&temp_path, contents)
            .map_err(|e| FitError::storage(format!("Failed to write temp file: {}", e)))?;

        fs::rename(&temp_path, path)
            .map_err(|e| FitError::storage(format!("Failed to rename temp file: {}", e)))?;

        Ok(())
    }
}

impl TabStore for JsonTabStore {
    fn read_tab(&self, tab: Tab) -> Result<Table> {
        let path = self.tab_path(tab);
        if !path.exists() {
            return Ok(Table::default());
        }

        let json = fs::read_to_string(&path)?;
        serde_json::from_str(&json)
            .map_err(|e| FitError::storage(format!("Failed to parse {:?}: {}", path, e)))
    }

    fn write_tab(&self, tab: Tab, table: &Table) -> Result<()> {
        let table = with_text_dates(table);
        let json = serde_json::to_string_pretty(&table)?;
        self.write_atomic(&self.tab_path(tab), &json)?;
        debug!(tab = %tab, rows = table.len(), "wrote tab");
        Ok(())
    }
}

/// Render every parsable `date` as literal `YYYY-MM-DD` text so readers never
/// reinterpret it
fn with_text_dates(table: &Table) -> Table {
    let mut table = table.clone();
    for row in table.rows_mut() {
        if let Some(date) = row.get(DATE_COLUMN).parse_date() {
            row.set(DATE_COLUMN, Cell::Text(canonical_date(date)));
        }
    }
    table
}

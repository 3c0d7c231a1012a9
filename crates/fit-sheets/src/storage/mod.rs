//! Storage layer for synced tabs
//!
//! Each logical tab ("Activity", "Sleep") is read back as a [`Table`] before a
//! merge and fully rewritten afterwards.
//!
//! ## Storage Layout
//!
//! ```text
//! ~/.local/share/fit-sheets/tabs/
//! ├── Activity.json
//! └── Sleep.json
//! ```
//!
//! Files are written atomically (temp file + rename), so readers always see a
//! complete tab. Concurrent writers to the same tab are not coordinated.

mod json_store;

pub use json_store::JsonTabStore;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{FitError, Result};
use crate::table::Table;

/// Logical tab of the destination spreadsheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    Activity,
    Sleep,
}

impl Tab {
    pub const ALL: [Tab; 2] = [Tab::Activity, Tab::Sleep];

    /// Tab title as shown in the spreadsheet
    pub fn name(&self) -> &'static str {
        match self {
            Tab::Activity => "Activity",
            Tab::Sleep => "Sleep",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tab {
    type Err = FitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "activity" => Ok(Tab::Activity),
            "sleep" => Ok(Tab::Sleep),
            other => Err(FitError::invalid_param(format!(
                "unknown tab '{}', expected 'activity' or 'sleep'",
                other
            ))),
        }
    }
}

/// Reads and rewrites whole tabs
pub trait TabStore {
    /// Current contents of the tab; a tab that was never written is empty
    fn read_tab(&self, tab: Tab) -> Result<Table>;

    /// Clear the tab and write `table` with its header
    fn write_tab(&self, tab: Tab, table: &Table) -> Result<()>;
}

/// Get the default storage path
pub fn default_storage_path() -> Result<PathBuf> {
    Ok(crate::config::data_dir()?.join("tabs"))
}

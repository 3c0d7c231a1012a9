mod settings;

pub use settings::{resolve_timezone, Settings, ACCESS_TOKEN_VAR, STORE_DIR_VAR};

use crate::error::{FitError, Result};
use std::path::PathBuf;

/// Application directory name
const APP_DIR_NAME: &str = "fit-sheets";

/// Get the data directory path for stored tabs
/// Returns ~/.local/share/fit-sheets on Unix, ~/Library/Application Support/fit-sheets on macOS
pub fn data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|p| p.join(APP_DIR_NAME))
        .ok_or_else(|| FitError::config("Could not determine data directory"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_exists() {
        let dir = data_dir();
        assert!(dir.is_ok());
        let path = dir.unwrap();
        assert!(path.ends_with("fit-sheets"));
    }
}

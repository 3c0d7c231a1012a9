//! Runtime settings resolved from the environment

use std::path::PathBuf;

use chrono_tz::Tz;
use tracing::warn;

use crate::client::AccessToken;
use crate::error::{FitError, Result};

/// Environment variable holding the bearer token for the fitness API
pub const ACCESS_TOKEN_VAR: &str = "FIT_ACCESS_TOKEN";

/// Environment variable overriding the tab store directory
pub const STORE_DIR_VAR: &str = "FIT_SHEETS_STORE";

/// Resolved settings for one run
#[derive(Debug, Clone)]
pub struct Settings {
    /// Zone used for day boundaries and local times
    pub timezone: Tz,
    /// Directory holding the stored tabs
    pub store_dir: PathBuf,
    pub access_token: Option<AccessToken>,
}

impl Settings {
    /// Resolve settings from the process environment.
    ///
    /// `store_dir` takes precedence over `FIT_SHEETS_STORE` and the default
    /// data directory.
    pub fn from_env(store_dir: Option<PathBuf>) -> Result<Self> {
        Self::from_lookup(store_dir, |key| std::env::var(key).ok())
    }

    /// Resolve settings through an arbitrary variable lookup
    pub fn from_lookup<F>(store_dir: Option<PathBuf>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timezone = resolve_timezone(lookup("TZ").as_deref());

        let store_dir = match store_dir {
            Some(dir) => dir,
            None => match lookup(STORE_DIR_VAR).filter(|v| !v.trim().is_empty()) {
                Some(dir) => PathBuf::from(dir.trim()),
                None => crate::storage::default_storage_path()?,
            },
        };

        let access_token = lookup(ACCESS_TOKEN_VAR).and_then(AccessToken::new);

        Ok(Self {
            timezone,
            store_dir,
            access_token,
        })
    }

    /// The access token, or a config error naming the variable to set
    pub fn require_token(&self) -> Result<&AccessToken> {
        self.access_token.as_ref().ok_or_else(|| {
            FitError::config(format!("{} is not set; cannot reach the fitness API", ACCESS_TOKEN_VAR))
        })
    }
}

/// Parse an IANA zone name. Empty means UTC; unknown names fall back to UTC
/// with a warning.
pub fn resolve_timezone(raw: Option<&str>) -> Tz {
    let name = raw.map(str::trim).unwrap_or_default();
    // POSIX allows a leading ':' before a zone name
    let name = name.strip_prefix(':').unwrap_or(name);
    if name.is_empty() {
        return Tz::UTC;
    }

    match name.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            warn!(tz = name, "unknown timezone, defaulting to UTC");
            Tz::UTC
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_resolve_timezone() {
        assert_eq!(resolve_timezone(Some("America/New_York")), chrono_tz::America::New_York);
        assert_eq!(resolve_timezone(Some(":Europe/Madrid")), chrono_tz::Europe::Madrid);
        assert_eq!(resolve_timezone(Some("  ")), Tz::UTC);
        assert_eq!(resolve_timezone(None), Tz::UTC);
        assert_eq!(resolve_timezone(Some("Mars/Olympus_Mons")), Tz::UTC);
    }

    #[test]
    fn test_from_lookup() {
        let settings = Settings::from_lookup(
            None,
            lookup(&[
                ("TZ", "America/New_York"),
                ("FIT_SHEETS_STORE", "/tmp/tabs"),
                ("FIT_ACCESS_TOKEN", "abc"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.timezone, chrono_tz::America::New_York);
        assert_eq!(settings.store_dir, PathBuf::from("/tmp/tabs"));
        assert_eq!(
            settings.require_token().unwrap().authorization_header(),
            "Bearer abc"
        );
    }

    #[test]
    fn test_explicit_store_wins() {
        let settings = Settings::from_lookup(
            Some(PathBuf::from("/data/x")),
            lookup(&[("FIT_SHEETS_STORE", "/tmp/tabs")]),
        )
        .unwrap();
        assert_eq!(settings.store_dir, PathBuf::from("/data/x"));
    }

    #[test]
    fn test_missing_token_is_config_error() {
        let settings = Settings::from_lookup(
            Some(PathBuf::from("/data/x")),
            lookup(&[("FIT_ACCESS_TOKEN", "   ")]),
        )
        .unwrap();
        assert!(settings.access_token.is_none());
        assert!(matches!(settings.require_token(), Err(FitError::Config(_))));
    }
}

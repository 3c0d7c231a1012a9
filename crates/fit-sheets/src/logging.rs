//! Structured logging setup
//!
//! - `RUST_LOG` filter, default `fit_sheets=info`
//! - JSON lines when `RUST_LOG_FORMAT=json`, human-readable otherwise
//! - Always written to stderr so stdout stays clean for table output

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "fit_sheets=info";

/// Selects the log line format
pub const LOG_FORMAT_VAR: &str = "RUST_LOG_FORMAT";

/// Output format of log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// `json` in any case selects JSON; anything else, or unset, is text
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Filter from a `RUST_LOG` value, falling back to the crate default when
/// the value is unset, blank or unparseable
fn filter_from(value: Option<&str>) -> EnvFilter {
    value
        .filter(|v| !v.trim().is_empty())
        .and_then(|v| EnvFilter::try_new(v).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init() {
    let filter = filter_from(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref());
    let format = LogFormat::from_env_value(std::env::var(LOG_FORMAT_VAR).ok().as_deref());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Json => {
            let _ = subscriber.json().try_init();
        }
        LogFormat::Text => {
            let _ = subscriber.try_init();
        }
    }
}

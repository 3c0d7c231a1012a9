//! A single spreadsheet cell and the lenient conversions the merge relies on

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Canonical date rendering used for keys and output
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Date-only layouts accepted when reading a `date` cell
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Date-time layouts accepted when reading a `date` cell (time is discarded)
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Value of one cell in a [`Table`](super::Table)
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Cell {
    /// Missing value
    #[default]
    Blank,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Free text, including `HH:MM:SS` time-of-day strings
    Text(String),
    /// Calendar day without a time component
    Date(NaiveDate),
}

impl Cell {
    /// Create a text cell
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Blank means missing, NaN, or text that is empty after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Blank => true,
            Cell::Float(f) => f.is_nan(),
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Bool(_) | Cell::Int(_) | Cell::Date(_) => false,
        }
    }

    /// Numeric reading of the cell.
    ///
    /// Numbers are returned as-is and text is parsed after trimming, so the
    /// result may be non-finite (`"inf"`). Booleans, dates and blanks have no
    /// numeric reading.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Float(f) if !f.is_nan() => Some(*f),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Coerce to a numeric cell; anything unparsable becomes blank.
    pub fn to_numeric(&self) -> Cell {
        match self {
            Cell::Int(i) => Cell::Int(*i),
            Cell::Float(f) if f.is_finite() => Cell::Float(*f),
            Cell::Bool(b) => Cell::Int(i64::from(*b)),
            Cell::Text(s) => {
                let trimmed = s.trim();
                if let Ok(i) = trimmed.parse::<i64>() {
                    Cell::Int(i)
                } else {
                    match trimmed.parse::<f64>() {
                        Ok(f) if f.is_finite() => Cell::Float(f),
                        _ => Cell::Blank,
                    }
                }
            }
            Cell::Float(_) | Cell::Blank | Cell::Date(_) => Cell::Blank,
        }
    }

    /// Parse the cell as a calendar date, if it holds one.
    pub fn parse_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            Cell::Text(s) => parse_date_str(s),
            _ => None,
        }
    }

    /// Build a cell from a JSON value as read back from storage
    pub fn from_json(value: &Value) -> Cell {
        match value {
            Value::Null => Cell::Blank,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Cell::Int(i),
                None => n.as_f64().map(Cell::Float).unwrap_or(Cell::Blank),
            },
            Value::String(s) => Cell::Text(s.clone()),
            // Nested values are kept as their JSON text
            other => Cell::Text(other.to_string()),
        }
    }

    /// Convert the cell to JSON for storage; NaN becomes null.
    pub fn to_json(&self) -> Value {
        match self {
            Cell::Blank => Value::Null,
            Cell::Bool(b) => Value::Bool(*b),
            Cell::Int(i) => Value::from(*i),
            Cell::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Cell::Text(s) => Value::String(s.clone()),
            Cell::Date(d) => Value::String(d.format(CANONICAL_DATE_FORMAT).to_string()),
        }
    }
}

/// Parse a date string leniently.
///
/// Spreadsheet readers sometimes hand back the leading apostrophe used to
/// force literal text, so it is stripped first.
pub fn parse_date_str(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    let s = s.strip_prefix('\'').unwrap_or(s).trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Render a date in canonical `YYYY-MM-DD` form
pub fn canonical_date(date: NaiveDate) -> String {
    date.format(CANONICAL_DATE_FORMAT).to_string()
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Blank => Ok(()),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Float(v) if v.is_nan() => Ok(()),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Date(d) => write!(f, "{}", d.format(CANONICAL_DATE_FORMAT)),
        }
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<NaiveDate> for Cell {
    fn from(value: NaiveDate) -> Self {
        Cell::Date(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Blank)
    }
}

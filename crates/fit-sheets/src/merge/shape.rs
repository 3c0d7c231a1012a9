//! Recognized tab layouts and their column normalization rules

use std::collections::HashSet;
use std::fmt;

use crate::table::{Table, DATE_COLUMN};

/// Sleep tab columns, in output order
pub const SLEEP_COLUMNS: [&str; 7] = [
    "date",
    "sleep_total_min",
    "start_time",
    "end_time",
    "wake_up_count",
    "time_awake_min",
    "Sleep_consistency",
];

/// Activity tab columns, in output order. Extra columns follow these.
pub const ACTIVITY_COLUMNS: [&str; 8] = [
    "date",
    "steps",
    "Working hours",
    "workout",
    "primary_focus",
    "secondary_focus",
    "volume_kg",
    "prs",
];

const SLEEP_NUMERIC: [&str; 4] = [
    "sleep_total_min",
    "time_awake_min",
    "wake_up_count",
    "Sleep_consistency",
];

const ACTIVITY_NUMERIC: [&str; 4] = ["steps", "Working hours", "volume_kg", "prs"];

/// Layout of a merged table, decided by its column set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shape {
    /// Exactly the sleep columns
    Sleep,
    /// At least the activity columns
    Activity,
    #[default]
    Unknown,
}

impl Shape {
    /// Classify a column set. Sleep requires an exact match, Activity a superset.
    pub fn detect(columns: &[String]) -> Shape {
        let set: HashSet<&str> = columns.iter().map(String::as_str).collect();
        let sleep: HashSet<&str> = SLEEP_COLUMNS.into_iter().collect();

        if set == sleep {
            Shape::Sleep
        } else if ACTIVITY_COLUMNS.iter().all(|c| set.contains(c)) {
            Shape::Activity
        } else {
            Shape::Unknown
        }
    }

    /// Columns coerced to numbers for this shape
    pub fn numeric_columns(&self) -> &'static [&'static str] {
        match self {
            Shape::Sleep => &SLEEP_NUMERIC,
            Shape::Activity => &ACTIVITY_NUMERIC,
            Shape::Unknown => &[],
        }
    }

    /// Output column order for the given column set
    pub fn order_columns(&self, columns: &[String]) -> Vec<String> {
        match self {
            Shape::Sleep => SLEEP_COLUMNS.iter().map(|c| c.to_string()).collect(),
            Shape::Activity => {
                let mut ordered: Vec<String> =
                    ACTIVITY_COLUMNS.iter().map(|c| c.to_string()).collect();
                ordered.extend(
                    columns
                        .iter()
                        .filter(|c| !ACTIVITY_COLUMNS.contains(&c.as_str()))
                        .cloned(),
                );
                ordered
            }
            Shape::Unknown => {
                let mut rest: Vec<String> = columns
                    .iter()
                    .filter(|c| c.as_str() != DATE_COLUMN)
                    .cloned()
                    .collect();
                rest.sort();
                let mut ordered = vec![DATE_COLUMN.to_string()];
                ordered.extend(rest);
                ordered
            }
        }
    }

    /// Reorder columns and coerce numeric columns in place
    pub(crate) fn normalize(&self, table: &mut Table) {
        let order = self.order_columns(table.columns());
        table.set_columns(order);

        for column in self.numeric_columns() {
            for row in table.rows_mut() {
                let coerced = row.get(column).to_numeric();
                row.set(*column, coerced);
            }
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Sleep => write!(f, "sleep"),
            Shape::Activity => write!(f, "activity"),
            Shape::Unknown => write!(f, "unknown"),
        }
    }
}

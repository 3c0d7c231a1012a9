//! Flatten upstream payloads into per-day tables
//!
//! Buckets are assigned to the local calendar day they start on, so the
//! aggregate request must be aligned to local midnight (see
//! [`crate::time::day_bounds_local`]).

mod sleep;

pub use sleep::extract_sleep;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use chrono_tz::Tz;
use tracing::debug;

use crate::models::AggregateResponse;
use crate::table::{Cell, Row, Table, DATE_COLUMN};

/// Column holding the daily step total
pub const STEPS_COLUMN: &str = "steps";

/// Column holding the daily mean heart rate
pub const HR_AVG_COLUMN: &str = "hr_avg";

/// One row per bucket with the summed step count.
///
/// A bucket without points is kept with blank steps; the day may still be
/// in progress.
pub fn extract_steps(response: &AggregateResponse, tz: Tz) -> Table {
    let mut table = Table::new([DATE_COLUMN, STEPS_COLUMN]);
    for bucket in &response.bucket {
        let Some(start) = bucket.start() else {
            debug!(millis = bucket.start_time_millis, "skipping bucket with invalid start");
            continue;
        };
        let values: Vec<i64> = bucket.points().filter_map(|p| p.int_value()).collect();
        let steps = if values.is_empty() {
            Cell::Blank
        } else {
            Cell::Int(values.iter().sum())
        };

        let mut row = Row::new();
        row.set(DATE_COLUMN, Cell::Date(start.with_timezone(&tz).date_naive()));
        row.set(STEPS_COLUMN, steps);
        table.push_row(row);
    }
    table
}

/// One row per bucket with the mean of the per-point average heart rate
pub fn extract_heart_rate(response: &AggregateResponse, tz: Tz) -> Table {
    let mut table = Table::new([DATE_COLUMN, HR_AVG_COLUMN]);
    for bucket in &response.bucket {
        let Some(start) = bucket.start() else {
            continue;
        };
        let values: Vec<f64> = bucket.points().filter_map(|p| p.fp_value()).collect();
        let avg = if values.is_empty() {
            Cell::Blank
        } else {
            Cell::Float(values.iter().sum::<f64>() / values.len() as f64)
        };

        let mut row = Row::new();
        row.set(DATE_COLUMN, Cell::Date(start.with_timezone(&tz).date_naive()));
        row.set(HR_AVG_COLUMN, avg);
        table.push_row(row);
    }
    table
}

/// Outer join of two per-day tables on `date`.
///
/// For a date present in both, non-blank cells of `right` are layered over
/// `left`. Rows without a parsable date are skipped.
pub fn join_on_date(left: &Table, right: &Table) -> Table {
    let mut table = Table::new([DATE_COLUMN]);
    for c in left.columns().iter().chain(right.columns()) {
        table.add_column(c.as_str());
    }

    let mut by_date: BTreeMap<NaiveDate, Row> = BTreeMap::new();
    for row in left.rows().iter().chain(right.rows()) {
        let Some(date) = row.get(DATE_COLUMN).parse_date() else {
            continue;
        };
        let joined = by_date.entry(date).or_default();
        for key in row.keys() {
            let cell = row.get(key);
            if !cell.is_blank() {
                joined.set(key, cell.clone());
            }
        }
        joined.set(DATE_COLUMN, Cell::Date(date));
    }

    for row in by_date.into_values() {
        table.push_row(row);
    }
    table
}

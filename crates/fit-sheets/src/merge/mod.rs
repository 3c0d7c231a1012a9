//! Merge engine for spreadsheet tabs
//!
//! Reconciles freshly extracted rows with the rows already stored for a tab:
//!
//! - `date` is the merge key; rows whose date cannot be parsed are dropped
//! - for a date present in both inputs the new row replaces the stored row
//! - stored cells that look like manual edits (non-blank, non-zero) are then
//!   restored over the merged values
//! - the result is sorted by date and normalized to its [`Shape`]
//!
//! The merge never fails. Bad cells degrade to blank, bad dates drop their
//! row, and a column that cannot be restored is skipped and reported.

mod preserve;
mod shape;

pub use preserve::{should_preserve, PreserveError};
pub use shape::{Shape, ACTIVITY_COLUMNS, SLEEP_COLUMNS};

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::table::{canonical_date, Cell, Row, Table, DATE_COLUMN};

use preserve::{plan_column, Lookback};

/// What happened during a merge
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    /// Shape the output was normalized to
    pub shape: Shape,
    /// Rows in the output
    pub rows_out: usize,
    /// Rows dropped because their date was blank or unparsable
    pub dropped_rows: usize,
    /// Rows replaced by a later row with the same date
    pub collapsed_duplicates: usize,
    /// Cells whose stored value was restored over the merged value
    pub cells_preserved: usize,
    /// Columns left out of preservation
    pub skipped_columns: Vec<PreserveError>,
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rows: {} ({}), Preserved cells: {}, Duplicates collapsed: {}",
            self.rows_out, self.shape, self.cells_preserved, self.collapsed_duplicates
        )?;
        if self.dropped_rows > 0 {
            write!(f, ", Dropped (bad date): {}", self.dropped_rows)?;
        }
        if !self.skipped_columns.is_empty() {
            write!(f, ", Skipped columns: {}", self.skipped_columns.len())?;
        }
        Ok(())
    }
}

/// Merge `new` into `existing` and return the normalized table.
pub fn merge(existing: &Table, new: &Table) -> Table {
    merge_with_report(existing, new).0
}

/// Merge `new` into `existing`, also returning what the merge did.
pub fn merge_with_report(existing: &Table, new: &Table) -> (Table, MergeReport) {
    let mut report = MergeReport::default();
    let lookback = build_lookback(existing);

    let mut combined = Table::new(union_columns(existing, new));

    let sources: Vec<&Row> = if existing.is_empty() {
        new.rows().iter().collect()
    } else {
        existing.rows().iter().chain(new.rows()).collect()
    };

    // Later rows overwrite earlier ones for the same date
    let mut by_date: BTreeMap<NaiveDate, &Row> = BTreeMap::new();
    for row in sources {
        match row.get(DATE_COLUMN).parse_date() {
            Some(date) => {
                if by_date.insert(date, row).is_some() {
                    report.collapsed_duplicates += 1;
                }
            }
            None => report.dropped_rows += 1,
        }
    }

    for (date, row) in by_date {
        let mut row = row.clone();
        row.set(DATE_COLUMN, Cell::Text(canonical_date(date)));
        combined.push_row(row);
    }

    if !lookback.is_empty() && !combined.is_empty() {
        report.cells_preserved = preserve_stored_cells(
            &lookback,
            existing,
            &mut combined,
            &mut report.skipped_columns,
        );
    }

    let shape = Shape::detect(combined.columns());
    shape.normalize(&mut combined);

    report.shape = shape;
    report.rows_out = combined.len();
    debug!(
        shape = %shape,
        rows = report.rows_out,
        dropped = report.dropped_rows,
        preserved = report.cells_preserved,
        "merged tab"
    );

    (combined, report)
}

/// Stored rows keyed by canonical date. Empty unless `existing` has rows and a
/// `date` column.
fn build_lookback(existing: &Table) -> Lookback {
    let mut lookback = Lookback::new();
    if existing.is_empty() || !existing.has_column(DATE_COLUMN) {
        return lookback;
    }
    for row in existing.rows() {
        if let Some(date) = row.get(DATE_COLUMN).parse_date() {
            lookback.entry(canonical_date(date)).or_insert_with(|| row.clone());
        }
    }
    lookback
}

/// `date`, then existing columns, then columns only `new` has
fn union_columns(existing: &Table, new: &Table) -> Vec<String> {
    let mut columns = vec![DATE_COLUMN.to_string()];
    for c in existing.columns().iter().chain(new.columns()) {
        if !columns.contains(c) {
            columns.push(c.clone());
        }
    }
    columns
}

fn preserve_stored_cells(
    lookback: &Lookback,
    existing: &Table,
    combined: &mut Table,
    skipped: &mut Vec<PreserveError>,
) -> usize {
    let shared: Vec<String> = combined
        .columns()
        .iter()
        .filter(|c| c.as_str() != DATE_COLUMN && existing.has_column(c))
        .cloned()
        .collect();

    let mut preserved = 0;
    for column in shared {
        match plan_column(lookback, combined, &column) {
            Ok(plan) => preserved += plan.apply(combined),
            Err(e) => {
                warn!(error = %e, "skipping preservation for column");
                skipped.push(e);
            }
        }
    }
    preserved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sleep_table(rows: Vec<Vec<Cell>>) -> Table {
        Table::from_rows(SLEEP_COLUMNS, rows)
    }

    fn sleep_row(date: &str, total: i64, consistency: f64) -> Vec<Cell> {
        vec![
            Cell::text(date),
            Cell::Int(total),
            Cell::text("22:00:00"),
            Cell::text("06:00:00"),
            Cell::Int(1),
            Cell::Int(12),
            Cell::Float(consistency),
        ]
    }

    fn dates(table: &Table) -> Vec<String> {
        table
            .column_values(DATE_COLUMN)
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    #[test]
    fn test_new_sleep_row_is_added() {
        let existing = sleep_table(vec![sleep_row("2025-10-05", 480, 0.8)]);
        let new = sleep_table(vec![sleep_row("2025-11-07", 450, 0.7)]);

        let merged = merge(&existing, &new);
        assert_eq!(dates(&merged), vec!["2025-10-05", "2025-11-07"]);
        assert_eq!(merged.columns(), &SLEEP_COLUMNS.map(String::from)[..]);
    }

    #[test]
    fn test_in_progress_session_is_kept() {
        let new = sleep_table(vec![vec![
            Cell::text("2025-11-08"),
            Cell::Blank,
            Cell::text("23:30:00"),
        ]]);

        let merged = merge(&Table::default(), &new);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.get(0, "date"), &Cell::text("2025-11-08"));
        assert_eq!(merged.get(0, "start_time"), &Cell::text("23:30:00"));
        assert!(merged.get(0, "end_time").is_blank());
    }

    #[test]
    fn test_existing_without_date_column() {
        let existing = Table::new(Vec::<String>::new());
        let new = Table::from_rows(["date", "steps"], vec![vec![Cell::text("2025-10-01"), Cell::Int(10)]]);
        let merged = merge(&existing, &new);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.get(0, "steps"), &Cell::Int(10));
    }

    #[test]
    fn test_manual_edit_survives_blank_update() {
        let existing = Table::from_rows(["date", "steps"], vec![vec![Cell::text("2025-10-01"), Cell::Int(5)]]);
        let new = Table::from_rows(["date", "steps"], vec![vec![Cell::text("2025-10-01"), Cell::Blank]]);

        let (merged, report) = merge_with_report(&existing, &new);
        assert_eq!(merged.get(0, "steps"), &Cell::Int(5));
        assert_eq!(report.cells_preserved, 1);
        assert_eq!(report.collapsed_duplicates, 1);
    }

    #[test]
    fn test_zero_is_not_protected() {
        let existing = Table::from_rows(["date", "steps"], vec![vec![Cell::text("2025-10-01"), Cell::Int(0)]]);
        let new = Table::from_rows(["date", "steps"], vec![vec![Cell::text("2025-10-01"), Cell::Blank]]);

        let merged = merge(&existing, &new);
        assert!(merged.get(0, "steps").is_blank());
    }

    #[test]
    fn test_stored_value_wins_over_new_value() {
        // Stored 400 is non-zero, so it is treated as a manual edit
        let existing = Table::from_rows(
            ["date", "sleep_total_min", "Sleep_consistency"],
            vec![vec![Cell::text("2025-10-15"), Cell::Int(400), Cell::text("")]],
        );
        let new = sleep_table(vec![vec![
            Cell::text("2025-10-15"),
            Cell::Int(420),
            Cell::text("22:00:00"),
            Cell::text("06:30:00"),
            Cell::Int(1),
            Cell::Int(15),
            Cell::Float(88.5),
        ]]);

        let merged = merge(&existing, &new);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.get(0, "sleep_total_min"), &Cell::Int(400));
        assert_eq!(merged.get(0, "Sleep_consistency"), &Cell::Float(88.5));
    }

    #[test]
    fn test_first_stored_duplicate_is_the_lookback() {
        let existing = Table::from_rows(
            ["date", "steps"],
            vec![
                vec![Cell::text("2025-10-01"), Cell::Int(111)],
                vec![Cell::text("2025-10-01"), Cell::Int(222)],
            ],
        );
        let new = Table::from_rows(["date", "steps"], vec![vec![Cell::text("2025-10-01")]]);

        let merged = merge(&existing, &new);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.get(0, "steps"), &Cell::Int(111));
    }

    #[test]
    fn test_existing_only_column_restored_from_stored_row() {
        let existing = Table::from_rows(
            ["date", "steps", "workout"],
            vec![vec![Cell::text("2025-10-01"), Cell::Int(100), Cell::text("legs")]],
        );
        let new = Table::from_rows(["date", "steps"], vec![vec![Cell::text("2025-10-01"), Cell::Int(200)]]);

        let merged = merge(&existing, &new);
        assert_eq!(merged.get(0, "workout"), &Cell::text("legs"));
    }

    #[test]
    fn test_bad_dates_are_dropped_and_counted() {
        let existing = Table::from_rows(
            ["date", "steps"],
            vec![
                vec![Cell::text("not-a-date"), Cell::Int(1)],
                vec![Cell::text("2025-10-01"), Cell::Int(2)],
            ],
        );
        let new = Table::from_rows(
            ["date", "steps"],
            vec![vec![Cell::Blank, Cell::Int(3)], vec![Cell::text("2025-10-02"), Cell::Int(4)]],
        );

        let (merged, report) = merge_with_report(&existing, &new);
        assert_eq!(dates(&merged), vec!["2025-10-01", "2025-10-02"]);
        assert_eq!(report.dropped_rows, 2);
    }

    #[test]
    fn test_non_finite_text_does_not_block_other_dates() {
        let existing = Table::from_rows(
            ["date", "steps", "note"],
            vec![
                vec![Cell::text("2025-10-01"), Cell::Int(5), Cell::text("7")],
                vec![Cell::text("2025-10-02"), Cell::text("inf"), Cell::text("NaN")],
            ],
        );
        let new = Table::from_rows(
            ["date", "steps", "note"],
            vec![vec![Cell::text("2025-10-01")], vec![Cell::text("2025-10-02")]],
        );

        let (merged, report) = merge_with_report(&existing, &new);
        assert!(report.skipped_columns.is_empty());
        assert_eq!(merged.get(0, "steps"), &Cell::Int(5));
        assert_eq!(merged.get(0, "note"), &Cell::text("7"));
        // Unknown shape: no coercion, the stored text comes back as-is
        assert_eq!(merged.get(1, "steps"), &Cell::text("inf"));
        assert_eq!(merged.get(1, "note"), &Cell::text("NaN"));
    }

    #[test]
    fn test_non_finite_numeric_cell_coerced_to_blank() {
        let existing = Table::from_rows(
            ACTIVITY_COLUMNS,
            vec![
                vec![Cell::text("2025-10-01"), Cell::Int(5)],
                vec![Cell::text("2025-10-02"), Cell::text("infinity")],
            ],
        );
        let new = Table::from_rows(
            ACTIVITY_COLUMNS,
            vec![vec![Cell::text("2025-10-01")], vec![Cell::text("2025-10-02")]],
        );

        let (merged, report) = merge_with_report(&existing, &new);
        assert_eq!(report.shape, Shape::Activity);
        assert!(report.skipped_columns.is_empty());
        assert_eq!(merged.get(0, "steps"), &Cell::Int(5));
        assert!(merged.get(1, "steps").is_blank());
    }

    #[test]
    fn test_sleep_numeric_coercion() {
        let new = sleep_table(vec![vec![
            Cell::text("2025-10-01"),
            Cell::text("430"),
            Cell::text("23:00:00"),
            Cell::text("06:00:00"),
            Cell::text("2"),
            Cell::text("n/a"),
            Cell::text("91.5"),
        ]]);

        let (merged, report) = merge_with_report(&Table::default(), &new);
        assert_eq!(report.shape, Shape::Sleep);
        assert_eq!(merged.get(0, "sleep_total_min"), &Cell::Int(430));
        assert_eq!(merged.get(0, "wake_up_count"), &Cell::Int(2));
        assert_eq!(merged.get(0, "time_awake_min"), &Cell::Blank);
        assert_eq!(merged.get(0, "Sleep_consistency"), &Cell::Float(91.5));
        assert_eq!(merged.get(0, "start_time"), &Cell::text("23:00:00"));
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let existing = Table::from_rows(["date", "steps"], vec![vec![Cell::text("10/01/2025"), Cell::Int(5)]]);
        let new = Table::from_rows(["steps", "date"], vec![vec![Cell::Blank, Cell::text("2025-10-01")]]);
        let (existing_before, new_before) = (existing.clone(), new.clone());

        let _ = merge(&existing, &new);
        assert_eq!(existing, existing_before);
        assert_eq!(new, new_before);
    }

    #[test]
    fn test_report_display() {
        let report = MergeReport {
            shape: Shape::Sleep,
            rows_out: 3,
            dropped_rows: 1,
            ..Default::default()
        };
        let text = report.to_string();
        assert!(text.contains("Rows: 3 (sleep)"));
        assert!(text.contains("Dropped (bad date): 1"));
    }
}

//! Cell-level protection of values already present in the stored tab
//!
//! Every column shared by the stored rows and the merged table is planned on
//! its own. A plan either lists the cells to restore or reports why the
//! column cannot be restored; the caller applies or skips it.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::table::{Cell, Row, Table, DATE_COLUMN};

/// Stored rows keyed by canonical date, first occurrence wins
pub(crate) type Lookback = BTreeMap<String, Row>;

/// Whether an existing cell should override the merged value for its date.
///
/// Blanks never win. Booleans and free text always win. Numbers, including
/// numeric text, win only when non-zero.
pub fn should_preserve(existing: &Cell) -> bool {
    if existing.is_blank() {
        return false;
    }
    match existing {
        Cell::Bool(_) => true,
        _ => match existing.as_number() {
            Some(n) => n != 0.0,
            None => true,
        },
    }
}

/// Reason a column was left out of preservation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PreserveError {
    #[error("column '{column}' is not in the merged table")]
    MissingColumn { column: String },
}

impl PreserveError {
    pub fn column(&self) -> &str {
        match self {
            PreserveError::MissingColumn { column } => column,
        }
    }
}

/// Cells to restore for one column
#[derive(Debug)]
pub(crate) struct ColumnPlan {
    column: String,
    restores: Vec<(usize, Cell)>,
}

impl ColumnPlan {
    /// Write the planned cells; returns how many cells actually changed.
    pub(crate) fn apply(self, table: &mut Table) -> usize {
        let mut changed = 0;
        let rows = table.rows_mut();
        for (idx, cell) in self.restores {
            if let Some(row) = rows.get_mut(idx) {
                if row.get(&self.column) != &cell {
                    changed += 1;
                }
                row.set(self.column.as_str(), cell);
            }
        }
        changed
    }
}

/// Plan restoration of `column` from the stored rows into `combined`.
///
/// Expects `combined` dates already rendered canonically.
pub(crate) fn plan_column(
    lookback: &Lookback,
    combined: &Table,
    column: &str,
) -> Result<ColumnPlan, PreserveError> {
    if !combined.has_column(column) {
        return Err(PreserveError::MissingColumn {
            column: column.to_string(),
        });
    }

    let mut restores = Vec::new();
    for (idx, row) in combined.rows().iter().enumerate() {
        let Cell::Text(date) = row.get(DATE_COLUMN) else {
            continue;
        };
        let Some(stored) = lookback.get(date) else {
            continue;
        };

        let existing = stored.get(column);
        if should_preserve(existing) {
            restores.push((idx, existing.clone()));
        }
    }

    Ok(ColumnPlan {
        column: column.to_string(),
        restores,
    })
}

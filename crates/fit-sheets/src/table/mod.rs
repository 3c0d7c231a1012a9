//! In-memory tabular records exchanged between extractor, merge and storage
//!
//! A [`Table`] is an ordered list of column names plus ordered rows. Rows are
//! keyed by column name, so a column missing from a row simply reads as
//! [`Cell::Blank`].

mod cell;

pub use cell::{canonical_date, parse_date_str, Cell, CANONICAL_DATE_FORMAT};

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FitError;

/// Name of the merge key column
pub const DATE_COLUMN: &str = "date";

static BLANK: Cell = Cell::Blank;

/// One record, mapping column name to cell
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: BTreeMap<String, Cell>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from `(column, value)` pairs
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Cell>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut row = Row::new();
        for (k, v) in pairs {
            row.set(k, v);
        }
        row
    }

    /// Get a cell; absent columns read as blank
    pub fn get(&self, column: &str) -> &Cell {
        self.cells.get(column).unwrap_or(&BLANK)
    }

    /// Set a cell. Storing `Cell::Blank` removes the entry.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Cell>) {
        let column = column.into();
        match value.into() {
            Cell::Blank => {
                self.cells.remove(&column);
            }
            cell => {
                self.cells.insert(column, cell);
            }
        }
    }

    /// Columns that hold a value in this row
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }
}

/// Ordered columns and rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableWire", into = "TableWire")]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Create an empty table with the given columns
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        let mut table = Table::default();
        for c in columns {
            table.add_column(c);
        }
        table
    }

    /// Build a table from positional rows.
    ///
    /// Rows shorter than the header are padded with blanks; extra values are
    /// ignored.
    pub fn from_rows<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Cell>>,
    ) -> Self {
        let mut table = Table::new(columns);
        for values in rows {
            let row = Row::from_pairs(table.columns.iter().cloned().zip(values));
            table.rows.push(row);
        }
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Row> {
        &mut self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// A table is empty when it has no rows, whatever its columns
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Append a column if it is not already present
    pub fn add_column(&mut self, column: impl Into<String>) {
        let column = column.into();
        if !self.has_column(&column) {
            self.columns.push(column);
        }
    }

    /// Append a row, registering any columns the table has not seen yet
    pub fn push_row(&mut self, row: Row) {
        let unseen: Vec<String> = row
            .keys()
            .filter(|k| !self.has_column(k))
            .map(str::to_string)
            .collect();
        for c in unseen {
            self.columns.push(c);
        }
        self.rows.push(row);
    }

    /// Replace the column order. Cells are keyed by name so rows are untouched.
    pub(crate) fn set_columns(&mut self, columns: Vec<String>) {
        self.columns = columns;
    }

    /// Cell at `row` / `column`; out-of-range rows read as blank
    pub fn get(&self, row: usize, column: &str) -> &Cell {
        self.rows.get(row).map(|r| r.get(column)).unwrap_or(&BLANK)
    }

    /// All values of one column, in row order
    pub fn column_values(&self, column: &str) -> Vec<&Cell> {
        self.rows.iter().map(|r| r.get(column)).collect()
    }

    /// Find the first row whose `date` renders as the given canonical string
    pub fn row_for_date(&self, date: &str) -> Option<&Row> {
        self.rows.iter().find(|r| {
            r.get(DATE_COLUMN)
                .parse_date()
                .map(|d| canonical_date(d) == date)
                .unwrap_or(false)
        })
    }
}

/// Header-plus-values layout used on disk, mirroring how a sheet is read back
#[derive(Serialize, Deserialize)]
struct TableWire {
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

impl TryFrom<TableWire> for Table {
    type Error = FitError;

    fn try_from(wire: TableWire) -> Result<Self, Self::Error> {
        {
            let mut seen = HashSet::new();
            if let Some(dup) = wire.columns.iter().find(|c| !seen.insert(c.as_str())) {
                return Err(FitError::storage(format!("duplicate column '{}'", dup)));
            }
        }
        if let Some((i, row)) = wire
            .rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() > wire.columns.len())
        {
            return Err(FitError::storage(format!(
                "row {} has {} values but only {} columns",
                i,
                row.len(),
                wire.columns.len()
            )));
        }
        let rows = wire
            .rows
            .iter()
            .map(|r| r.iter().map(Cell::from_json).collect())
            .collect();
        Ok(Table::from_rows(wire.columns, rows))
    }
}

impl From<Table> for TableWire {
    fn from(table: Table) -> Self {
        let rows = table
            .rows
            .iter()
            .map(|r| table.columns.iter().map(|c| r.get(c).to_json()).collect())
            .collect();
        TableWire {
            columns: table.columns,
            rows,
        }
    }
}

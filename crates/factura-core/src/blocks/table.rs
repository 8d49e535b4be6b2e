//! Dense table grids materialized from TABLE/CELL blocks.

use serde::{Deserialize, Serialize};

/// A table as a dense rectangular grid of cell texts.
///
/// Cells absent from the graph are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Rows of cell texts, header first.
    pub rows: Vec<Vec<String>>,
    /// Number of rows (highest RowIndex seen).
    pub row_count: usize,
    /// Number of columns (highest ColumnIndex seen).
    pub col_count: usize,
}

impl Table {
    /// Build a dense grid from sparse 1-based `(row, col, text)` cells.
    ///
    /// Cells with a zero index are ignored. When the same position appears more
    /// than once the last cell wins.
    pub fn from_cells<I>(cells: I) -> Self
    where
        I: IntoIterator<Item = (usize, usize, String)>,
    {
        let cells: Vec<(usize, usize, String)> = cells
            .into_iter()
            .filter(|(r, c, _)| *r > 0 && *c > 0)
            .collect();

        let row_count = cells.iter().map(|(r, _, _)| *r).max().unwrap_or(0);
        let col_count = cells.iter().map(|(_, c, _)| *c).max().unwrap_or(0);

        let mut rows = vec![vec![String::new(); col_count]; row_count];
        for (r, c, text) in cells {
            rows[r - 1][c - 1] = text;
        }

        Self {
            rows,
            row_count,
            col_count,
        }
    }

    /// Check whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Header row (first row), if any.
    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Data rows (all rows except the header) with their 1-based data position.
    pub fn data_rows(&self) -> impl Iterator<Item = (usize, &[String])> {
        self.rows.iter().skip(1).enumerate().map(|(i, r)| (i + 1, r.as_slice()))
    }

    /// Cell text at a 0-based position.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(col)).map(String::as_str)
    }
}

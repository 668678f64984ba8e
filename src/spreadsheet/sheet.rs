use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::reference::parse_reference;
use crate::spreadsheet::reference::ReferenceError;
use crate::spreadsheet::CellGrid;
use std::collections::HashMap;

/// A fully materialized worksheet held in memory.
///
/// Cells are stored sparsely by zero-based (row, col). The populated extent is
/// tracked as one-based ordinals so an empty sheet reports zero rows and columns.
#[derive(Clone, Debug, Default)]
pub struct Sheet {
    /// Sheet name
    name: String,
    /// Non-empty cells keyed by (row, col)
    cells: HashMap<(usize, usize), CellValue>,
    /// One-based ordinal of the last populated row
    highest_row: usize,
    /// One-based ordinal of the last populated column
    highest_column: usize,
}

impl Sheet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Self::default()
        }
    }

    /// Builds a sheet from row-major values starting at A1.
    pub fn from_rows<R, C, V>(name: &str, rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let mut sheet = Self::new(name);
        for (row, values) in rows.into_iter().enumerate() {
            for (col, value) in values.into_iter().enumerate() {
                sheet.set(row, col, value);
            }
        }
        sheet
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of non-empty cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Gets the cell at zero-based (row, col), `None` when unpopulated.
    pub fn get(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.cells.get(&(row, col))
    }

    /// Stores a value at zero-based (row, col). Storing `Empty` or `""` clears the cell.
    pub fn set(&mut self, row: usize, col: usize, value: impl Into<CellValue>) -> &mut Self {
        let value = value.into();
        if value.is_empty() {
            if self.cells.remove(&(row, col)).is_some() {
                self.update_bounds();
            }
        } else {
            self.highest_row = self.highest_row.max(row + 1);
            self.highest_column = self.highest_column.max(col + 1);
            self.cells.insert((row, col), value);
        }
        self
    }

    /// Stores a value at an A1-style reference such as "B3".
    pub fn set_reference(&mut self, reference: &str, value: impl Into<CellValue>) -> Result<&mut Self, ReferenceError> {
        let (row, col) = parse_reference(reference)?;
        Ok(self.set(row, col, value))
    }

    /// Recomputes the populated extent after a cell was cleared.
    fn update_bounds(&mut self) {
        self.highest_row = self.cells.keys().map(|(row, _)| row + 1).max().unwrap_or(0);
        self.highest_column = self.cells.keys().map(|(_, col)| col + 1).max().unwrap_or(0);
    }
}

impl CellGrid for Sheet {
    fn value_at(&self, column: usize, row: usize) -> CellValue {
        self.get(row, column).cloned().unwrap_or_default()
    }

    fn highest_row(&self) -> usize {
        self.highest_row
    }

    fn highest_column(&self) -> usize {
        self.highest_column
    }
}

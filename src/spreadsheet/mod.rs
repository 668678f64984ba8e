//! # Spreadsheet Module
//!
//! Grid abstraction consumed by the table iterator, the cell value model, an
//! in-memory worksheet and a reader that materializes one `.xlsx` worksheet.
pub mod cell;
pub mod reference;
pub mod sheet;
pub mod xlsx;

pub use cell::CellValue;
pub use sheet::Sheet;
pub use xlsx::SheetSelector;

/// Read-only random access to a two-dimensional grid of cells.
///
/// Cells are addressed by zero-based (column, row). The extent queries return
/// one-based ordinals of the last populated row and column, which is also the
/// number of rows and columns spanned from A1 (0 for an empty grid).
/// Adapters over 1-based or letter-addressed sources translate before calling.
pub trait CellGrid {
    /// Value at zero-based (column, row); `CellValue::Empty` when unpopulated.
    fn value_at(&self, column: usize, row: usize) -> CellValue;

    /// One-based ordinal of the last populated row.
    fn highest_row(&self) -> usize;

    /// One-based ordinal of the last populated column.
    fn highest_column(&self) -> usize;
}

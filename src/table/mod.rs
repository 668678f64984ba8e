//! # Table Module
//!
//! Turns a [`CellGrid`](crate::spreadsheet::CellGrid) into keyed records: a
//! header row names the columns, callers select output columns and key
//! columns, and a synthetic row index column can stand in as the key.
use crate::spreadsheet::CellValue;
use indexmap::IndexMap;
use std::fmt::Display;
use thiserror::Error;

pub mod iterator;
pub mod source;

pub use iterator::Rows;
pub use iterator::TableIterator;
pub use source::SheetSource;
pub use source::SourceConfig;

/// Configuration and data faults raised by the table iterator.
#[derive(Error, Debug, PartialEq)]
pub enum TableError {
    /// A selected column or key is not present in the header row
    #[error("{role} '{name}' doesn't exist in the table header")]
    UnknownColumn { role: SelectionRole, name: String },

    /// Two header cells share the same text
    #[error("Table header '{0}' is duplicated")]
    DuplicateHeader(String),

    /// A grid-dependent operation ran before a grid was set
    #[error("No grid has been set")]
    MissingGrid,

    /// The row position must act as key but the row index column has no name
    #[error("Row index should act as key but no name has been provided, use set_row_index_column() to name it")]
    RowIndexKeyMisconfigured,
}

/// Which selection a name was resolved for, used in error messages.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SelectionRole {
    Column,
    Key,
}

impl Display for SelectionRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionRole::Column => write!(f, "Column"),
            SelectionRole::Key => write!(f, "Key"),
        }
    }
}

/// Where a field's value comes from.
///
/// `RowIndex` orders before every physical column so the row index field
/// always leads a record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColumnRef {
    /// The synthetic row index pseudo-column
    RowIndex,
    /// A zero-based grid column
    Physical(usize),
}

/// Header text to zero-based column index, in physical order.
pub type Headers = IndexMap<String, usize>;

/// Field name to value source, in selection order.
pub type Selection = IndexMap<String, ColumnRef>;

/// One row as field name to value, in physical column order.
pub type Record = IndexMap<String, CellValue>;

/// Key values in declared order.
pub type Key = Vec<CellValue>;

/// How rows are keyed.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum KeySelection {
    /// The row position relative to the first data row is the key
    #[default]
    RowPosition,
    /// The listed fields, in declared order, form the key
    Columns(Selection),
}

/// A materialized row: its key and its record.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    pub key: Key,
    pub record: Record,
}

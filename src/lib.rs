//! # Sheet Rows
//!
//! Reads a worksheet as a sequence of keyed records, the way a row-oriented
//! data import consumes a spreadsheet.
//!
//! ## Features
//!
//! - **Header-driven columns**: one row of the sheet names the columns, every row below it is data
//! - **Column selection**: pick output columns by header name, or take them all
//! - **Keys**: identify rows by one or more key columns, or by their position
//! - **Row index column**: expose the row position as a named field of every record
//! - **Grid abstraction**: iterate any [`CellGrid`](spreadsheet::CellGrid), an in-memory
//!   [`Sheet`](spreadsheet::Sheet) or an `.xlsx` worksheet loaded through [`SheetSource`]
//!
//! ## Example
//!
//! ```
//! use sheet_rows::spreadsheet::Sheet;
//! use sheet_rows::TableIterator;
//!
//! let sheet = Sheet::from_rows("Data", [["id", "name"], ["1", "one"], ["2", "two"]]);
//! let mut iterator = TableIterator::with_grid(&sheet);
//! iterator.set_keys(&["id"])?.set_columns(&["name"])?;
//!
//! for row in iterator.rows() {
//!     let row = row?;
//!     println!("{:?} => {:?}", row.key, row.record);
//! }
//! # Ok::<(), sheet_rows::TableError>(())
//! ```
pub mod error;
mod helpers;
pub mod spreadsheet;
pub mod table;

pub use error::SheetRowsError;
pub use spreadsheet::CellGrid;
pub use spreadsheet::CellValue;
pub use table::Row;
pub use table::SheetSource;
pub use table::SourceConfig;
pub use table::TableError;
pub use table::TableIterator;

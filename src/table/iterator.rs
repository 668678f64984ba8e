use crate::spreadsheet::CellGrid;
use crate::spreadsheet::CellValue;
use crate::table::ColumnRef;
use crate::table::Headers;
use crate::table::Key;
use crate::table::KeySelection;
use crate::table::Record;
use crate::table::Row;
use crate::table::Selection;
use crate::table::SelectionRole;
use crate::table::TableError;
use once_cell::unsync::OnceCell;
use tracing::debug;

/// Cursor over the data rows of a grid, projecting each row as a keyed record.
///
/// The header row is read lazily on first use and cached together with the
/// grid extent until [`set_grid`](Self::set_grid) replaces the grid. Changing
/// the header row afterwards does not refresh the cached headers, so configure
/// it before the first header access.
///
/// [`is_valid`](Self::is_valid), [`key`](Self::key) and [`current`](Self::current)
/// only read the cursor; [`advance`](Self::advance) and [`reset`](Self::reset)
/// move it. [`rows`](Self::rows) drives the same cursor as a standard iterator.
pub struct TableIterator<'g, G: CellGrid + ?Sized> {
    grid: Option<&'g G>,
    /// Zero-based grid row holding the header text
    header_row: usize,
    columns: Selection,
    keys: KeySelection,
    row_index_column: Option<String>,
    headers: OnceCell<Headers>,
    rows_count: OnceCell<usize>,
    columns_count: OnceCell<usize>,
    /// Row position relative to the first data row
    current_row: usize,
}

impl<'g, G: CellGrid + ?Sized> Default for TableIterator<'g, G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'g, G: CellGrid + ?Sized> TableIterator<'g, G> {
    pub fn new() -> Self {
        Self {
            grid: None,
            header_row: 0,
            columns: Selection::new(),
            keys: KeySelection::RowPosition,
            row_index_column: None,
            headers: OnceCell::new(),
            rows_count: OnceCell::new(),
            columns_count: OnceCell::new(),
            current_row: 0,
        }
    }

    pub fn with_grid(grid: &'g G) -> Self {
        let mut iterator = Self::new();
        iterator.set_grid(grid);
        iterator
    }

    /// Replaces the grid and drops every value derived from the previous one.
    /// The cursor is left where it is.
    pub fn set_grid(&mut self, grid: &'g G) -> &mut Self {
        self.grid = Some(grid);
        self.headers.take();
        self.rows_count.take();
        self.columns_count.take();
        self
    }

    pub fn grid(&self) -> Result<&'g G, TableError> {
        self.grid.ok_or(TableError::MissingGrid)
    }

    pub fn set_header_row(&mut self, header_row: usize) -> &mut Self {
        self.header_row = header_row;
        self
    }

    pub fn header_row(&self) -> usize {
        self.header_row
    }

    /// Names the synthetic column holding the row position.
    /// Set it before naming the column in [`set_keys`](Self::set_keys) or
    /// [`set_columns`](Self::set_columns).
    pub fn set_row_index_column(&mut self, name: impl Into<String>) -> &mut Self {
        self.row_index_column = Some(name.into());
        self
    }

    pub fn row_index_column(&self) -> Option<&str> {
        self.row_index_column.as_deref()
    }

    /// Selects the output columns in the given order. An empty list selects
    /// every header in physical order. On error the previous selection is kept.
    pub fn set_columns<S: AsRef<str>>(&mut self, names: &[S]) -> Result<&mut Self, TableError> {
        let columns = if names.is_empty() {
            self.headers()?
                .iter()
                .map(|(name, column)| (name.to_owned(), ColumnRef::Physical(*column)))
                .collect()
        } else {
            self.resolve(names, SelectionRole::Column)?
        };
        self.columns = columns;
        Ok(self)
    }

    pub fn columns(&self) -> &Selection {
        &self.columns
    }

    /// Selects the key columns in the given order. An empty list keys rows by
    /// their position. On error the previous selection is kept.
    pub fn set_keys<S: AsRef<str>>(&mut self, names: &[S]) -> Result<&mut Self, TableError> {
        self.keys = if names.is_empty() {
            KeySelection::RowPosition
        } else {
            KeySelection::Columns(self.resolve(names, SelectionRole::Key)?)
        };
        Ok(self)
    }

    pub fn keys(&self) -> &KeySelection {
        &self.keys
    }

    /// Header text to column index, read from the header row on first call.
    pub fn headers(&self) -> Result<&Headers, TableError> {
        self.headers.get_or_try_init(|| {
            let grid = self.grid()?;
            let columns_count = self.columns_count()?;
            let mut headers = Headers::with_capacity(columns_count);
            for column in 0..columns_count {
                let name = grid.value_at(column, self.header_row).to_string();
                if headers.contains_key(&name) {
                    return Err(TableError::DuplicateHeader(name));
                }
                headers.insert(name, column);
            }
            debug!(header_row = self.header_row, columns = headers.len(), "resolved table headers");
            Ok(headers)
        })
    }

    /// One-based ordinal of the grid's last populated row.
    pub fn rows_count(&self) -> Result<usize, TableError> {
        self.rows_count
            .get_or_try_init(|| self.grid().map(|grid| grid.highest_row()))
            .copied()
    }

    /// One-based ordinal of the grid's last populated column.
    pub fn columns_count(&self) -> Result<usize, TableError> {
        self.columns_count
            .get_or_try_init(|| self.grid().map(|grid| grid.highest_column()))
            .copied()
    }

    /// Row position relative to the first data row.
    pub fn position(&self) -> usize {
        self.current_row
    }

    pub fn reset(&mut self) {
        self.current_row = 0;
    }

    pub fn advance(&mut self) {
        self.current_row += 1;
    }

    /// Whether the cursor is on a data row, i.e. not past the last populated row.
    pub fn is_valid(&self) -> Result<bool, TableError> {
        let rows_count = self.rows_count()?;
        Ok(self.absolute_row().is_some_and(|row| row <= rows_count))
    }

    /// Key of the current row: the row position, or the key column values in declared order.
    pub fn key(&self) -> Result<Key, TableError> {
        match &self.keys {
            KeySelection::RowPosition => {
                self.row_index_name()?;
                Ok(vec![CellValue::from(self.current_row)])
            }
            KeySelection::Columns(keys) => {
                let grid = self.grid()?;
                Ok(keys.values().map(|column| self.read(grid, *column)).collect())
            }
        }
    }

    /// Record of the current row.
    ///
    /// Key fields and selected columns are merged by name, key entries first,
    /// then ordered by physical column with the row index field leading.
    pub fn current(&self) -> Result<Record, TableError> {
        let grid = self.grid()?;
        let mut fields = match &self.keys {
            KeySelection::RowPosition => {
                Selection::from([(self.row_index_name()?.to_owned(), ColumnRef::RowIndex)])
            }
            KeySelection::Columns(keys) => keys.clone(),
        };
        for (name, column) in &self.columns {
            fields.entry(name.to_owned()).or_insert(*column);
        }
        fields.sort_by(|_, left, _, right| left.cmp(right));
        Ok(fields
            .into_iter()
            .map(|(name, column)| (name, self.read(grid, column)))
            .collect())
    }

    /// Key and record of the current row.
    pub fn row(&self) -> Result<Row, TableError> {
        Ok(Row {
            key: self.key()?,
            record: self.current()?,
        })
    }

    /// Iterates the remaining rows from the cursor, advancing it.
    /// Call [`reset`](Self::reset) to start over.
    pub fn rows(&mut self) -> Rows<'_, 'g, G> {
        Rows {
            table: self,
            done: false,
        }
    }

    /// One-based ordinal of the current data row: header row plus cursor plus 2.
    /// `None` past `usize::MAX`.
    fn absolute_row(&self) -> Option<usize> {
        self.header_row.checked_add(self.current_row)?.checked_add(2)
    }

    fn row_index_name(&self) -> Result<&str, TableError> {
        self.row_index_column
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or(TableError::RowIndexKeyMisconfigured)
    }

    fn read(&self, grid: &G, column: ColumnRef) -> CellValue {
        match column {
            ColumnRef::RowIndex => CellValue::from(self.current_row),
            ColumnRef::Physical(column) => self
                .absolute_row()
                .map(|row| grid.value_at(column, row - 1))
                .unwrap_or_default(),
        }
    }

    fn resolve<S: AsRef<str>>(&self, names: &[S], role: SelectionRole) -> Result<Selection, TableError> {
        let headers = self.headers()?;
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                let column = match headers.get(name) {
                    Some(column) => ColumnRef::Physical(*column),
                    None if self.row_index_name().ok() == Some(name) => ColumnRef::RowIndex,
                    None => {
                        return Err(TableError::UnknownColumn {
                            role,
                            name: name.to_owned(),
                        })
                    }
                };
                Ok((name.to_owned(), column))
            })
            .collect()
    }
}

/// Iterator over the rows of a [`TableIterator`], from its cursor onwards.
///
/// A row that fails to project yields its error and iteration moves on to
/// the next row. A missing grid yields one error and ends the iteration.
pub struct Rows<'t, 'g, G: CellGrid + ?Sized> {
    table: &'t mut TableIterator<'g, G>,
    done: bool,
}

impl<'t, 'g, G: CellGrid + ?Sized> Iterator for Rows<'t, 'g, G> {
    type Item = Result<Row, TableError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.table.is_valid() {
            Ok(true) => (),
            Ok(false) => {
                self.done = true;
                return None;
            }
            Err(error) => {
                self.done = true;
                return Some(Err(error));
            }
        }
        let row = self.table.row();
        self.table.advance();
        Some(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::Sheet;

    const ALL: &[&str] = &[];

    /// Blank first row, header "a".."d" on row 1, three data rows
    fn worksheet() -> Sheet {
        Sheet::from_rows(
            "",
            [
                ["", "", "", ""],
                ["a", "b", "c", "d"],
                ["a0", "b0", "c0", "d0"],
                ["a1", "b1", "c1", "d1"],
                ["a2", "b2", "c2", "d2"],
            ],
        )
    }

    fn iterator(sheet: &Sheet) -> TableIterator<'_, Sheet> {
        let mut iterator = TableIterator::with_grid(sheet);
        iterator.set_header_row(1).set_columns(&["a", "c", "d"]).unwrap();
        iterator
    }

    fn record(fields: &[(&str, CellValue)]) -> Vec<(String, CellValue)> {
        fields.iter().map(|(name, value)| (name.to_string(), value.clone())).collect()
    }

    fn fields(record: Record) -> Vec<(String, CellValue)> {
        record.into_iter().collect()
    }

    #[test]
    fn rows_and_columns_count() {
        let sheet = worksheet();
        let iterator = iterator(&sheet);

        assert_eq!(iterator.rows_count(), Ok(5));
        assert_eq!(iterator.columns_count(), Ok(4));
    }

    #[test]
    fn get_headers() {
        let sheet = worksheet();
        let iterator = iterator(&sheet);
        let headers: Vec<(&str, usize)> = iterator
            .headers()
            .unwrap()
            .iter()
            .map(|(name, column)| (name.as_str(), *column))
            .collect();

        assert_eq!(headers, vec![("a", 0), ("b", 1), ("c", 2), ("d", 3)]);
    }

    #[test]
    fn iteration() {
        let sheet = worksheet();
        let mut iterator = iterator(&sheet);
        iterator.set_row_index_column("row");

        assert_eq!(iterator.is_valid(), Ok(true));
        assert_eq!(iterator.key(), Ok(vec![CellValue::Int(0)]));
        assert_eq!(
            fields(iterator.current().unwrap()),
            record(&[("row", 0usize.into()), ("a", "a0".into()), ("c", "c0".into()), ("d", "d0".into())])
        );

        iterator.advance();
        assert_eq!(iterator.is_valid(), Ok(true));
        assert_eq!(iterator.key(), Ok(vec![CellValue::Int(1)]));
        assert_eq!(
            fields(iterator.current().unwrap()),
            record(&[("row", 1usize.into()), ("a", "a1".into()), ("c", "c1".into()), ("d", "d1".into())])
        );

        iterator.advance();
        assert_eq!(iterator.is_valid(), Ok(true));
        assert_eq!(iterator.key(), Ok(vec![CellValue::Int(2)]));
        assert_eq!(
            fields(iterator.current().unwrap()),
            record(&[("row", 2usize.into()), ("a", "a2".into()), ("c", "c2".into()), ("d", "d2".into())])
        );

        // Runs out of rows
        iterator.advance();
        assert_eq!(iterator.is_valid(), Ok(false));

        iterator.reset();
        assert_eq!(iterator.is_valid(), Ok(true));
        assert_eq!(iterator.key(), Ok(vec![CellValue::Int(0)]));
        assert_eq!(
            fields(iterator.current().unwrap()),
            record(&[("row", 0usize.into()), ("a", "a0".into()), ("c", "c0".into()), ("d", "d0".into())])
        );

        // All columns
        iterator.set_columns(ALL).unwrap();
        assert_eq!(iterator.key(), Ok(vec![CellValue::Int(0)]));
        assert_eq!(
            fields(iterator.current().unwrap()),
            record(&[
                ("row", 0usize.into()),
                ("a", "a0".into()),
                ("b", "b0".into()),
                ("c", "c0".into()),
                ("d", "d0".into()),
            ])
        );

        // Key columns join the record in physical order
        iterator.set_columns(&["a", "d"]).unwrap().set_keys(&["b", "c"]).unwrap();
        assert_eq!(iterator.is_valid(), Ok(true));
        assert_eq!(iterator.key(), Ok(vec![CellValue::from("b0"), CellValue::from("c0")]));
        assert_eq!(
            fields(iterator.current().unwrap()),
            record(&[("a", "a0".into()), ("b", "b0".into()), ("c", "c0".into()), ("d", "d0".into())])
        );
    }

    #[test]
    fn boundary() {
        let sheet = worksheet();
        let mut iterator = iterator(&sheet);

        for position in 0..3 {
            assert_eq!(iterator.position(), position);
            assert_eq!(iterator.is_valid(), Ok(true));
            iterator.advance();
        }
        assert_eq!(iterator.is_valid(), Ok(false));
        iterator.advance();
        assert_eq!(iterator.is_valid(), Ok(false));
    }

    #[test]
    fn trailing_blank_row_is_not_yielded() {
        let sheet = Sheet::from_rows("", [["id", "name"], ["1", "one"], ["", ""]]);
        let mut iterator = TableIterator::with_grid(&sheet);
        iterator.set_row_index_column("row").set_columns(ALL).unwrap();

        assert_eq!(iterator.rows_count(), Ok(2));
        let rows: Vec<Row> = iterator.rows().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            fields(rows[0].record.clone()),
            record(&[("row", 0usize.into()), ("id", "1".into()), ("name", "one".into())])
        );
    }

    #[test]
    fn header_row_past_addressable_rows() {
        let sheet = worksheet();
        let mut iterator = iterator(&sheet);
        iterator.set_row_index_column("row").set_keys(&["a"]).unwrap();
        iterator.set_header_row(usize::MAX);

        assert_eq!(iterator.is_valid(), Ok(false));
        assert_eq!(iterator.key(), Ok(vec![CellValue::Empty]));
        assert_eq!(
            fields(iterator.current().unwrap()),
            record(&[("a", CellValue::Empty), ("c", CellValue::Empty), ("d", CellValue::Empty)])
        );
        assert_eq!(iterator.rows().count(), 0);

        iterator.set_header_row(usize::MAX - 2);
        assert_eq!(iterator.is_valid(), Ok(false));
    }

    #[test]
    fn header_on_first_row() {
        let sheet = Sheet::from_rows("", [["id", "name"], ["1", "one"], ["2", "two"]]);
        let mut iterator = TableIterator::with_grid(&sheet);
        iterator.set_row_index_column("delta").set_columns(ALL).unwrap();

        let rows: Vec<Row> = iterator.rows().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            fields(rows[1].record.clone()),
            record(&[("delta", 1usize.into()), ("id", "2".into()), ("name", "two".into())])
        );
    }

    #[test]
    fn keys_follow_declared_order() {
        let sheet = worksheet();
        let mut iterator = iterator(&sheet);
        iterator.set_keys(&["c", "b"]).unwrap();

        assert_eq!(iterator.key(), Ok(vec![CellValue::from("c0"), CellValue::from("b0")]));
        assert_eq!(
            fields(iterator.current().unwrap()),
            record(&[("a", "a0".into()), ("b", "b0".into()), ("c", "c0".into()), ("d", "d0".into())])
        );
    }

    #[test]
    fn empty_keys_fall_back_to_row_position() {
        let sheet = worksheet();
        let mut iterator = iterator(&sheet);
        iterator.set_row_index_column("row").set_keys(&["b"]).unwrap();
        assert!(matches!(iterator.keys(), KeySelection::Columns(_)));

        iterator.set_keys(ALL).unwrap();
        assert_eq!(iterator.keys(), &KeySelection::RowPosition);
        iterator.advance();
        assert_eq!(iterator.key(), Ok(vec![CellValue::Int(1)]));
    }

    #[test]
    fn row_index_as_key_column() {
        let sheet = worksheet();
        let mut iterator = iterator(&sheet);
        iterator.set_row_index_column("row").set_keys(&["row", "b"]).unwrap();
        iterator.advance();

        assert_eq!(iterator.key(), Ok(vec![CellValue::Int(1), CellValue::from("b1")]));
        assert_eq!(
            fields(iterator.current().unwrap()),
            record(&[
                ("row", 1usize.into()),
                ("a", "a1".into()),
                ("b", "b1".into()),
                ("c", "c1".into()),
                ("d", "d1".into()),
            ])
        );
    }

    #[test]
    fn unknown_column_keeps_selection() {
        let sheet = worksheet();
        let mut iterator = iterator(&sheet);
        let columns = iterator.columns().clone();

        assert_eq!(
            iterator.set_columns(&["a", "zz"]).err(),
            Some(TableError::UnknownColumn {
                role: SelectionRole::Column,
                name: "zz".to_owned()
            })
        );
        assert_eq!(iterator.columns(), &columns);

        iterator.set_keys(&["b"]).unwrap();
        assert_eq!(
            iterator.set_keys(&["zz"]).err(),
            Some(TableError::UnknownColumn {
                role: SelectionRole::Key,
                name: "zz".to_owned()
            })
        );
        assert_eq!(
            iterator.keys(),
            &KeySelection::Columns(Selection::from([("b".to_owned(), ColumnRef::Physical(1))]))
        );
    }

    #[test]
    fn row_index_name_is_not_a_header() {
        let sheet = worksheet();
        let mut iterator = iterator(&sheet);

        assert!(matches!(
            iterator.set_keys(&["row"]),
            Err(TableError::UnknownColumn { role: SelectionRole::Key, .. })
        ));
    }

    #[test]
    fn duplicate_header() {
        let sheet = Sheet::from_rows("", [["a", "b", "a"], ["1", "2", "3"]]);
        let mut iterator = TableIterator::with_grid(&sheet);

        assert_eq!(iterator.headers().err(), Some(TableError::DuplicateHeader("a".to_owned())));
        assert_eq!(
            iterator.set_columns(ALL).err(),
            Some(TableError::DuplicateHeader("a".to_owned()))
        );
    }

    #[test]
    fn missing_grid() {
        let mut iterator = TableIterator::<Sheet>::new();

        assert!(iterator.grid().is_err());
        assert_eq!(iterator.headers().err(), Some(TableError::MissingGrid));
        assert_eq!(iterator.rows_count(), Err(TableError::MissingGrid));
        assert_eq!(iterator.columns_count(), Err(TableError::MissingGrid));
        assert_eq!(iterator.is_valid(), Err(TableError::MissingGrid));
        assert_eq!(iterator.set_columns(&["a"]).err(), Some(TableError::MissingGrid));

        let mut rows = iterator.rows();
        assert_eq!(rows.next(), Some(Err(TableError::MissingGrid)));
        assert_eq!(rows.next(), None);
    }

    #[test]
    fn row_index_key_misconfigured() {
        let sheet = worksheet();
        let mut iterator = iterator(&sheet);

        assert_eq!(iterator.key(), Err(TableError::RowIndexKeyMisconfigured));
        assert_eq!(iterator.current().err(), Some(TableError::RowIndexKeyMisconfigured));

        iterator.set_row_index_column("");
        assert_eq!(iterator.key(), Err(TableError::RowIndexKeyMisconfigured));

        // Each row reports the fault and iteration continues
        let results: Vec<_> = iterator.rows().collect();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|result| result == &Err(TableError::RowIndexKeyMisconfigured)));
    }

    #[test]
    fn set_grid_invalidates_cache() {
        let small = worksheet();
        let large = Sheet::from_rows(
            "",
            [
                vec!["", "", "", "", ""],
                vec!["a", "b", "c", "d", "e"],
                vec!["x0", "y0", "z0", "w0", "v0"],
            ],
        );
        let mut iterator = iterator(&small);
        iterator.advance();
        assert_eq!(iterator.rows_count(), Ok(5));
        assert_eq!(iterator.headers().unwrap().len(), 4);

        iterator.set_grid(&large);
        assert_eq!(iterator.position(), 1);
        assert_eq!(iterator.rows_count(), Ok(3));
        assert_eq!(iterator.columns_count(), Ok(5));
        assert_eq!(iterator.headers().unwrap().len(), 5);
        assert_eq!(iterator.is_valid(), Ok(false));
    }

    #[test]
    fn header_row_change_keeps_cached_headers() {
        let sheet = worksheet();
        let mut iterator = iterator(&sheet);
        iterator.set_header_row(2);

        assert_eq!(iterator.header_row(), 2);
        assert!(iterator.headers().unwrap().contains_key("a"));
        assert_eq!(iterator.key().ok(), None);
        iterator.set_row_index_column("row");
        assert_eq!(
            fields(iterator.current().unwrap()),
            record(&[("row", 0usize.into()), ("a", "a1".into()), ("c", "c1".into()), ("d", "d1".into())])
        );
    }

    #[test]
    fn replay_after_reset() {
        let sheet = worksheet();
        let mut iterator = iterator(&sheet);
        iterator.set_row_index_column("row");

        let first: Vec<Row> = iterator.rows().collect::<Result<_, _>>().unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(first[2].key, vec![CellValue::Int(2)]);
        assert_eq!(iterator.rows().count(), 0);

        iterator.reset();
        let second: Vec<Row> = iterator.rows().collect::<Result<_, _>>().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rows_start_at_cursor() {
        let sheet = worksheet();
        let mut iterator = iterator(&sheet);
        iterator.set_row_index_column("row");
        iterator.advance();

        let keys: Vec<Key> = iterator.rows().map(|row| row.unwrap().key).collect();
        assert_eq!(keys, vec![vec![CellValue::Int(1)], vec![CellValue::Int(2)]]);
        assert_eq!(iterator.position(), 3);
    }

    #[test]
    fn sparse_cells_read_as_empty() {
        let mut sheet = worksheet();
        sheet.set(3, 2, CellValue::Empty);
        let mut iterator = iterator(&sheet);
        iterator.set_keys(&["a"]).unwrap();
        iterator.advance();

        assert_eq!(
            fields(iterator.current().unwrap()),
            record(&[("a", "a1".into()), ("c", CellValue::Empty), ("d", "d1".into())])
        );
    }
}

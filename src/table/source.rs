use crate::spreadsheet::xlsx;
use crate::spreadsheet::Sheet;
use crate::spreadsheet::SheetSelector;
use crate::table::TableError;
use crate::table::TableIterator;
use anyhow::Context;
use anyhow::Result;
use tracing::debug;

/// Where to read a table from and how to project its rows.
#[derive(Clone, Debug, Default)]
pub struct SourceConfig {
    /// Local path or `file://` URL of an `.xlsx` workbook
    pub path: String,
    pub worksheet: SheetSelector,
    /// Zero-based row holding the header text
    pub header_row: usize,
    /// Output columns; empty selects every header
    pub columns: Vec<String>,
    /// Key columns; empty keys rows by position
    pub keys: Vec<String>,
    pub row_index_column: Option<String>,
}

/// A worksheet loaded once and projected through [`TableIterator`]s.
pub struct SheetSource {
    config: SourceConfig,
    sheet: Sheet,
}

impl SheetSource {
    pub fn open(config: SourceConfig) -> Result<Self> {
        let sheet = xlsx::open_worksheet(&config.path, &config.worksheet)
            .with_context(|| format!("Failed to read worksheet {} from '{}'", config.worksheet, config.path))?;
        debug!(path = %config.path, sheet = %sheet.name(), "opened sheet source");
        Ok(Self::from_sheet(config, sheet))
    }

    /// Wraps an already loaded sheet; `config.path` and `config.worksheet` are not used.
    pub fn from_sheet(config: SourceConfig, sheet: Sheet) -> Self {
        Self { config, sheet }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub fn sheet(&self) -> &Sheet {
        &self.sheet
    }

    /// Builds an iterator over the sheet, configured from [`SourceConfig`].
    pub fn rows(&self) -> Result<TableIterator<'_, Sheet>, TableError> {
        let mut iterator = TableIterator::with_grid(&self.sheet);
        iterator.set_header_row(self.config.header_row);
        if let Some(name) = &self.config.row_index_column {
            iterator.set_row_index_column(name.as_str());
        }
        iterator.set_columns(self.config.columns.as_slice())?;
        iterator.set_keys(self.config.keys.as_slice())?;
        Ok(iterator)
    }
}

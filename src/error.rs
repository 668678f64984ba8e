use thiserror::Error;

/// Crate-level error type.
/// Aggregates errors from the standard library, the xlsx stack and the table iterator.
#[derive(Error, Debug)]
pub enum SheetRowsError {
    #[error("{0}")]
    WithContextError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    #[error("{0}")]
    LocationError(#[from] crate::helpers::reader::LocationError),

    // Spreadsheet module errors
    #[error("{0}")]
    ReferenceError(#[from] crate::spreadsheet::reference::ReferenceError),

    #[error("{0}")]
    WorkbookError(#[from] crate::spreadsheet::xlsx::WorkbookError),

    // Table module errors
    #[error("{0}")]
    TableError(#[from] crate::table::TableError),
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, SheetRowsError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| SheetRowsError::WithContextError(format!("{}: {}", message, e)))
    }
}

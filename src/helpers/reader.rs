use crate::error::SheetRowsError;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum LocationError {
    #[error("Remote workbook '{0}' is not supported, download it first")]
    RemoteLocationError(String),

    #[error("Invalid file URL '{0}'")]
    FileUrlError(String),
}

/// Resolves a workbook location to a local path.
///
/// Plain paths are returned as-is and `file://` URLs are converted. Any other
/// URL scheme is rejected since workbooks are read from the local filesystem only.
pub(crate) fn resolve_path(location: &str) -> Result<PathBuf, LocationError> {
    match Url::parse(location) {
        // Single letter schemes are Windows drive letters, not URLs
        Ok(url) if url.scheme().len() > 1 => {
            if url.scheme() == "file" {
                url.to_file_path()
                    .map_err(|_| LocationError::FileUrlError(location.to_owned()))
            } else {
                Err(LocationError::RemoteLocationError(location.to_owned()))
            }
        }
        _ => Ok(PathBuf::from(location)),
    }
}

/// Opens a local workbook for buffered reading
pub(crate) fn open(location: &str) -> Result<BufReader<File>, SheetRowsError> {
    let path = resolve_path(location)?;
    let file = File::open(path)?;
    Ok(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_local_paths() {
        assert_eq!(resolve_path("test.xlsx").unwrap(), PathBuf::from("test.xlsx"));
        assert_eq!(resolve_path("/path/to/test.xlsx").unwrap(), PathBuf::from("/path/to/test.xlsx"));
        assert_eq!(resolve_path("./relative/test.xlsx").unwrap(), PathBuf::from("./relative/test.xlsx"));
        assert_eq!(resolve_path("C:\\data\\test.xlsx").unwrap(), PathBuf::from("C:\\data\\test.xlsx"));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_file_url() {
        assert_eq!(resolve_path("file:///path/to/test.xlsx").unwrap(), PathBuf::from("/path/to/test.xlsx"));
    }

    #[test]
    fn test_reject_remote_urls() {
        for location in ["http://example.com/test.xlsx", "https://example.com/test.xlsx", "s3://bucket/test.xlsx"] {
            assert!(matches!(resolve_path(location), Err(LocationError::RemoteLocationError(_))));
        }
    }

    #[test]
    fn test_open_local_file() {
        assert!(open("Cargo.toml").is_ok(), "Failed to open local file");
        assert!(matches!(open("non_existent_file.xlsx"), Err(SheetRowsError::IoError(_))));
    }
}

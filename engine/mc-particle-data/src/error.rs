use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::version::GameVersion;

/// Errors that prevent a data set from loading at all
///
/// Problems confined to a single profile or rule are not errors; they are
/// collected as rejections in the [`LoadReport`](crate::LoadReport).
#[derive(Error, Debug)]
pub enum DataError {
    /// I/O error while reading a data set
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The document is not valid JSON for the data-set schema
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document is not valid YAML for the data-set schema
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// The file extension does not name a supported format
    #[error("Unsupported data-set format: {0}")]
    UnsupportedFormat(PathBuf),

    /// A version string that is not `major.minor[.patch]`
    #[error("Invalid game version: {0}")]
    InvalidVersion(String),

    /// A second data set for a version that is already loaded
    #[error("Data set for version {0} is already loaded")]
    DuplicateVersion(GameVersion),

    /// No data set is loaded for the requested version
    #[error("No data set loaded for version {0}")]
    UnknownVersion(GameVersion),
}

/// Result type using DataError
pub type Result<T> = std::result::Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = DataError::DuplicateVersion(GameVersion::new(1, 20, 4));
        assert_eq!(
            error.to_string(),
            "Data set for version 1.20.4 is already loaded"
        );

        let error = DataError::InvalidVersion("one.two".to_string());
        assert_eq!(error.to_string(), "Invalid game version: one.two");
    }
}

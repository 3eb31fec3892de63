use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while loading and splitting a dataset.
#[derive(Debug, Error)]
pub enum SplitError {
    /// The file is missing, unreadable or permission-denied.
    #[error("cannot access {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The content is not valid tabular data.
    #[error("cannot parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// The requested target column is not in the header.
    #[error("column '{column}' not found (available: {})", available.join(", "))]
    KeyNotFound {
        column: String,
        available: Vec<String>,
    },

    /// The file extension maps to no known loader.
    #[error("unsupported file extension: .{extension}")]
    UnsupportedFormat { extension: String },

    /// A cell has no numeric interpretation.
    #[error("row {row}, column {column}: value is not numeric")]
    NonNumeric { row: usize, column: usize },
}

impl SplitError {
    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        SplitError::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T, E = SplitError> = std::result::Result<T, E>;

//! Errors raised while loading work-log input.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal input-loading failure.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Input not found: {0}")]
    NotFound(PathBuf),

    #[error("No CSV files found under {0}")]
    NoInputFiles(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not decode {path} with any of: {tried}")]
    Encoding { path: PathBuf, tried: String },

    #[error("Missing column '{column}' (field {field}) in {path}")]
    MissingColumn {
        path: PathBuf,
        field: &'static str,
        column: String,
    },

    #[error("Malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

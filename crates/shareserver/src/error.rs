use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the share registry and its configuration
#[derive(Error, Debug)]
pub enum ShareError {
    /// Path was empty or does not point at an existing regular file
    #[error("File does not exist: {}", .0.display())]
    InvalidPath(PathBuf),

    /// Share id was never issued, was revoked, or its file is gone
    #[error("File not found")]
    NotFound,

    #[error("Invalid value for {key}: {value:?}")]
    Config { key: &'static str, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

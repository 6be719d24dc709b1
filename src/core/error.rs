//! Error types for fatal, run-ending conditions
//!
//! Everything recoverable (unreadable files, undecodable bytes, corrupt media
//! headers) is recorded on the walk result instead and never surfaces here.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = ContextError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Root directory '{}' not found or is not accessible", path.display())]
    RootNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Root path '{}' is not a directory", path.display())]
    RootNotDirectory { path: PathBuf },

    #[error("Invalid exclude pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Could not create output directory '{}': {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not write to output file '{}': {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ContextError {
    pub fn invalid_pattern(pattern: impl Into<String>, err: impl std::fmt::Display) -> Self {
        ContextError::InvalidPattern {
            pattern: pattern.into(),
            message: err.to_string(),
        }
    }
}

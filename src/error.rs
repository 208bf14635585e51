//! Error types for rust-sqlmigrate

use std::path::PathBuf;
use thiserror::Error;

/// Environment errors that abort a migration or split run
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Not a git repository: {path}")]
    NotARepository { path: PathBuf },

    #[error("Failed to run git {command}")]
    GitSpawnError {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("git {command} failed: {message}")]
    GitCommandFailed { command: String, message: String },

    #[error("Failed to read file: {path}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory does not exist: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Segment file listed in manifest is missing: {path}")]
    SegmentMissing { path: PathBuf },

    #[error("Invalid manifest {path}")]
    ManifestError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid exclusion pattern '{pattern}'")]
    InvalidExclusion {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("File is not valid UTF-8 or Windows-1252 text: {path}")]
    InvalidEncoding { path: PathBuf },
}

//! Working directory error types

use std::path::PathBuf;

use thiserror::Error;

/// Working directory error type
#[derive(Debug, Error)]
pub enum WorkdirError {
    #[error("Working directory {0} is already locked")]
    AlreadyLocked(PathBuf),

    #[error("Working directory {0} is already marked dirty")]
    AlreadyDirty(PathBuf),

    /// Cleanup refused: a mutation may still be in progress
    #[error("Working directory {0} is dirty")]
    Dirty(PathBuf),

    #[error("Application name must not be empty")]
    InvalidName,

    #[error("Root path is required when the native temp directory is disabled")]
    MissingRootPath,

    #[error("Root path {0} does not exist or is not a directory")]
    RootNotFound(PathBuf),

    #[error("{0} exists but is not a directory")]
    NotADirectory(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for working directory operations
pub type Result<T> = std::result::Result<T, WorkdirError>;

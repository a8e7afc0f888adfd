//! Archive codec error types

use thiserror::Error;

/// Archive codec error type
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The payload is not a readable ZIP container
    #[error("Bad archive: {0}")]
    Malformed(String),

    /// An entry would be written outside the destination directory
    #[error("Bad archive: entry '{0}' escapes the destination directory")]
    PathTraversal(String),

    /// Symbolic links are never materialised
    #[error("Bad archive: entry '{0}' is a symbolic link")]
    Symlink(String),

    /// Writing the packed archive failed
    #[error("Failed to write archive: {0}")]
    Write(#[from] zip::result::ZipError),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    /// Whether the failure is caused by the uploaded payload rather than the host
    pub fn is_bad_archive(&self) -> bool {
        matches!(
            self,
            Self::Malformed(_) | Self::PathTraversal(_) | Self::Symlink(_)
        )
    }
}

/// Result type alias for archive operations
pub type Result<T> = std::result::Result<T, ArchiveError>;

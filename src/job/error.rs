//! Job error types

use axum::http::StatusCode;

use super::recipe::RecipeState;
use crate::archive::ArchiveError;
use crate::manifest::ManifestError;
use crate::render::RenderError;
use crate::workdir::WorkdirError;

/// Job error type
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    WorkingDirectory(#[from] WorkdirError),

    #[error(transparent)]
    Render(RenderError),

    #[error("Input is not processable: no manifest.xml at the top of the archive")]
    NotProcessable,

    #[error("Renderer produced no output")]
    NoOutput,

    #[error("Job cancelled")]
    Cancelled,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Phase '{phase}' called in state {state:?}")]
    PhaseOrder {
        phase: &'static str,
        state: RecipeState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RenderError> for JobError {
    fn from(e: RenderError) -> Self {
        match e {
            RenderError::Cancelled => Self::Cancelled,
            other => Self::Render(other),
        }
    }
}

impl From<tokio::task::JoinError> for JobError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Io(std::io::Error::other(e))
    }
}

impl JobError {
    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Archive(e) if e.is_bad_archive() => "BAD_ARCHIVE",
            Self::Archive(_) => "ARCHIVE_ERROR",
            Self::Manifest(_) => "INVALID_MANIFEST",
            Self::WorkingDirectory(WorkdirError::AlreadyLocked(_)) => "ALREADY_LOCKED",
            Self::WorkingDirectory(WorkdirError::AlreadyDirty(_)) => "ALREADY_DIRTY",
            Self::WorkingDirectory(WorkdirError::Dirty(_)) => "WORKDIR_DIRTY",
            Self::WorkingDirectory(_) => "WORKDIR_ERROR",
            Self::Render(RenderError::InvalidRecipe(_)) => "INVALID_RECIPE",
            Self::Render(RenderError::UnsupportedFormat(_)) => "UNSUPPORTED_FORMAT",
            Self::Render(RenderError::TimedOut(_)) => "RENDER_TIMED_OUT",
            Self::Render(_) => "RENDER_FAILED",
            Self::NotProcessable => "NOT_PROCESSABLE",
            Self::NoOutput => "NO_OUTPUT",
            Self::Cancelled => "CANCELLED",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::PhaseOrder { .. } => "PHASE_ORDER",
            Self::Io(_) => "IO_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Archive(e) if e.is_bad_archive() => StatusCode::BAD_REQUEST,
            Self::Manifest(ManifestError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Manifest(_) | Self::NotProcessable => StatusCode::UNPROCESSABLE_ENTITY,
            Self::WorkingDirectory(WorkdirError::AlreadyLocked(_))
            | Self::WorkingDirectory(WorkdirError::AlreadyDirty(_)) => StatusCode::CONFLICT,
            Self::Render(RenderError::RenderFailed { .. }) | Self::NoOutput => {
                StatusCode::BAD_GATEWAY
            }
            Self::Render(RenderError::TimedOut(_)) => StatusCode::GATEWAY_TIMEOUT,
            Self::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Result type alias for job operations
pub type Result<T> = std::result::Result<T, JobError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_render_cancellation_maps_to_job_cancellation() {
        let err: JobError = RenderError::Cancelled.into();
        assert!(matches!(err, JobError::Cancelled));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_status_codes() {
        let cases: Vec<(JobError, StatusCode, &str)> = vec![
            (
                ArchiveError::PathTraversal("../evil.txt".into()).into(),
                StatusCode::BAD_REQUEST,
                "BAD_ARCHIVE",
            ),
            (
                ManifestError::MissingItems.into(),
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_MANIFEST",
            ),
            (
                JobError::NotProcessable,
                StatusCode::UNPROCESSABLE_ENTITY,
                "NOT_PROCESSABLE",
            ),
            (
                RenderError::UnsupportedFormat("html5".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "UNSUPPORTED_FORMAT",
            ),
            (
                RenderError::RenderFailed {
                    code: Some(2),
                    stderr_tail: "bad input\n".into(),
                }
                .into(),
                StatusCode::BAD_GATEWAY,
                "RENDER_FAILED",
            ),
            (
                RenderError::TimedOut(Duration::from_secs(1)).into(),
                StatusCode::GATEWAY_TIMEOUT,
                "RENDER_TIMED_OUT",
            ),
            (JobError::NoOutput, StatusCode::BAD_GATEWAY, "NO_OUTPUT"),
            (
                WorkdirError::AlreadyLocked(PathBuf::from("/tmp/x")).into(),
                StatusCode::CONFLICT,
                "ALREADY_LOCKED",
            ),
            (
                JobError::InvalidRequest("bad id".into()),
                StatusCode::BAD_REQUEST,
                "INVALID_REQUEST",
            ),
            (
                JobError::PhaseOrder {
                    phase: "bake",
                    state: RecipeState::Created,
                },
                StatusCode::INTERNAL_SERVER_ERROR,
                "PHASE_ORDER",
            ),
        ];

        for (err, status, code) in cases {
            assert_eq!(err.status_code(), status, "{}", err);
            assert_eq!(err.code(), code, "{}", err);
        }
    }

    #[test]
    fn test_render_failed_message_includes_stderr() {
        let err: JobError = RenderError::RenderFailed {
            code: Some(2),
            stderr_tail: "bad input\n".into(),
        }
        .into();
        let message = err.to_string();
        assert!(message.contains("exit code 2"));
        assert!(message.contains("bad input"));
    }
}

//! Render error types

use std::time::Duration;

/// Render error type
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Invalid processing recipe: {0}")]
    InvalidRecipe(String),

    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    /// Non-zero exit, death by signal (no code) or spawn failure
    #[error("Renderer failed (exit code {}): {stderr_tail}", display_code(.code))]
    RenderFailed {
        code: Option<i32>,
        stderr_tail: String,
    },

    #[error("Renderer timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Rendering cancelled")]
    Cancelled,
}

fn display_code(code: &Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "none".to_string())
}

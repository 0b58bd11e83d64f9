//! Domain error types.

use thiserror::Error;

/// Errors surfaced by the routing pipeline and its handlers.
#[derive(Debug, Error)]
pub enum AdjutantError {
    #[error("path escapes the workspace: {0}")]
    PathOutsideWorkspace(String),

    #[error("provider request failed: {0}")]
    Provider(String),
}

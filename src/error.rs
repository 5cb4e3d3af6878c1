//! Error types for the Marginalia core

use thiserror::Error;

/// Errors raised while rendering an annotation block from a template
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("payload serialization failed: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Errors raised by the mutating editor operations
///
/// Any `Err` guarantees the input document text was not altered; callers
/// keep their copy and can retry safely.
#[derive(Error, Debug)]
pub enum EditError {
    #[error("no annotation block with id '{0}'")]
    NotFound(String),

    #[error("render failed: {0}")]
    Render(#[from] RenderError),
}

/// Storage-side errors, produced by [`DocumentStore`] implementations
///
/// [`DocumentStore`]: crate::session::DocumentStore
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("document read failed: {0}")]
    Read(String),

    #[error("document write failed: {0}")]
    Write(String),
}

/// Errors surfaced at the async session boundary
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("edit error: {0}")]
    Edit(#[from] EditError),
}

impl EditError {
    /// True when the operation failed only because the target id was absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, EditError::NotFound(_))
    }
}

impl SessionError {
    /// True when the underlying failure was a missing target id
    pub fn is_not_found(&self) -> bool {
        matches!(self, SessionError::Edit(e) if e.is_not_found())
    }
}

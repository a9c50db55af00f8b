//! Error types for the pyff diff engine

use thiserror::Error;

/// Errors that can occur while parsing or diffing Python source
#[derive(Error, Debug)]
pub enum PyffError {
    /// The source text could not be parsed as Python
    #[error("failed to parse Python source: {0}")]
    Parse(String),

    /// The AST did not have the shape an operation required
    #[error("unexpected AST shape: {0}")]
    Ast(String),

    /// A precondition of a comparison routine was violated, e.g. comparing
    /// a code snippet that does not contain exactly one function
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// Filesystem access failed while walking a directory or reading a file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PyffError {
    /// Build a parse error from a message
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Build an AST-shape error from a message
    pub fn ast_error(message: impl Into<String>) -> Self {
        Self::Ast(message.into())
    }

    /// Build a precondition error from a message
    pub fn precondition_error(message: impl Into<String>) -> Self {
        Self::PreconditionFailed(message.into())
    }
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, PyffError>;

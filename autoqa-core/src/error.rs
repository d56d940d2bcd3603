//! Error types for AutoQA domain operations

use thiserror::Error;

/// Errors raised while interpreting report rows.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("Row {index} is missing attribute '{attribute}'")]
    MissingAttribute { index: usize, attribute: String },

    #[error("Row {index} has non-numeric attribute '{attribute}'")]
    InvalidAttribute { index: usize, attribute: String },
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

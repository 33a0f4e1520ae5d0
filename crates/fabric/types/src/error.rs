//! Type-level error definitions

use thiserror::Error;

/// Errors raised while constructing model values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("Invalid qualified name: {0}")]
    InvalidQName(String),

    #[error("Unknown binding type: {0}")]
    UnknownBindingType(String),
}

/// Result type for type construction
pub type Result<T> = std::result::Result<T, TypesError>;

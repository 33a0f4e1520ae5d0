//! Errors raised while building a logical domain

use fabric_types::Uri;
use thiserror::Error;

/// Structural errors: the caller asked for a shape the model cannot hold
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Duplicate URI in logical domain: {0}")]
    DuplicateUri(Uri),

    #[error("Component is not a composite: {0}")]
    NotAComposite(Uri),

    #[error("Wire must be declared in a composite enclosing both endpoints: {0}")]
    WireOutsideComposite(Uri),
}

/// Result type for model construction
pub type Result<T> = std::result::Result<T, ModelError>;

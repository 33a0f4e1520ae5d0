//! Binding selection errors

use fabric_types::{QName, TypesError, Uri};
use thiserror::Error;

/// Raised while choosing or attaching a binding
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindingSelectionError {
    #[error("No SCA binding provider suitable for creating a remote connection: {artifact}")]
    NoScaBindingProvider {
        artifact: Uri,
        /// Per-provider reasons for declining
        attempted: Vec<String>,
    },

    #[error("No free port left on {host} to bind {artifact}")]
    PortsExhausted { host: String, artifact: Uri },

    #[error("Binding provider {binding} failed to bind {artifact}: {message}")]
    BindFailed {
        binding: QName,
        artifact: Uri,
        message: String,
    },
}

/// Raised when the binding priority configuration is invalid
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindingConfigError {
    #[error("Binding priority names a binding type with no registered provider: {0}")]
    UnknownBindingType(QName),

    #[error("Invalid binding type name in priority list: {0}")]
    InvalidName(#[from] TypesError),
}

/// Result type for binding selection
pub type Result<T> = std::result::Result<T, BindingSelectionError>;

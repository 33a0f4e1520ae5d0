//! Generation errors
//!
//! All of these stem from deployable configuration and are never retried.

use fabric_types::{BindingKind, ContractKind, ImplementationKind, QName, Uri};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("No component generator registered for {0}")]
    NoComponentGenerator(ImplementationKind),

    #[error("No binding generator registered for {0}")]
    NoBindingGenerator(BindingKind),

    #[error("No channel connection generator registered for {0}")]
    NoConnectionBindingGenerator(BindingKind),

    #[error("Unsupported contract combination on {artifact}: {reference} to {service}")]
    UnsupportedContract {
        artifact: Uri,
        reference: ContractKind,
        service: ContractKind,
    },

    #[error("Operation {operation} not found on target {target}")]
    OperationNotFound { operation: String, target: Uri },

    #[error("Policy intent {intent} on {artifact} requires metadata '{key}'")]
    MissingPolicyMetadata {
        intent: QName,
        key: String,
        artifact: Uri,
    },

    #[error("Remote wire has no binding to carry it: {0}")]
    UnboundRemoteWire(Uri),

    #[error("Channel spans zones but carries no binding: {0}")]
    UnboundChannel(Uri),

    #[error("Component is a composite and cannot be instantiated: {0}")]
    CompositeComponent(Uri),
}

/// Result type for generation
pub type Result<T> = std::result::Result<T, GenerationError>;

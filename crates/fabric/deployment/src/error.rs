//! Deployment and protocol errors

use fabric_generator::GenerationError;
use fabric_types::{ContributionUri, Uri};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error("Contribution not found: {0}")]
    ContributionNotFound(ContributionUri),

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Checksum mismatch: expected {expected}, computed {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Contribution not provisioned: {0}")]
    NotProvisioned(ContributionUri),

    #[error("Component not built: {0}")]
    ComponentNotBuilt(Uri),
}

/// Failures moving protocol messages between controller and participants
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Peer channel closed")]
    ChannelClosed,

    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Deployment rejected by {runtime}: {reason}")]
    Rejected { runtime: String, reason: String },
}

/// Result type for deployment operations
pub type Result<T> = std::result::Result<T, DeploymentError>;

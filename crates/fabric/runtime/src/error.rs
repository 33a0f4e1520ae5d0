//! Domain errors

use fabric_binding::{BindingConfigError, BindingSelectionError};
use fabric_deployment::{DeploymentError, ProtocolError};
use fabric_generator::GenerationError;
use fabric_logical::{ModelError, ValidationReport};
use fabric_types::Uri;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0}")]
    Validation(ValidationReport),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Binding configuration error: {0}")]
    BindingConfig(#[from] BindingConfigError),

    #[error("Binding selection failed: {0}")]
    BindingSelection(#[from] BindingSelectionError),

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Deployment failed: {0}")]
    Deployment(#[from] DeploymentError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Component not found: {0}")]
    ComponentNotFound(Uri),

    #[error("Failed to read configuration {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result type for domain operations
pub type Result<T> = std::result::Result<T, DomainError>;

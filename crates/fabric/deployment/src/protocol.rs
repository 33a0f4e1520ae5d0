//! Update protocol messages
//!
//! Every exchange is an explicit request and response. A participant reports
//! the outcome of an update it pulled with a separate [`ProtocolRequest::Applied`]
//! message instead of writing into the command it received.

use crate::error::ProtocolError;
use crate::unit::SerializedDeploymentUnit;
use async_trait::async_trait;
use fabric_types::ZoneName;
use serde::{Deserialize, Serialize};

/// Deployment state pushed to, or pulled by, a zone participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentCommand {
    pub zone: ZoneName,
    /// State `current` applies on top of; `None` when it starts from nothing
    pub base_checksum: Option<String>,
    pub current: SerializedDeploymentUnit,
    pub full: SerializedDeploymentUnit,
}

impl DeploymentCommand {
    /// Checksum of the zone state after applying this command
    pub fn checksum(&self) -> &str {
        self.full.checksum()
    }

    /// A command carrying only the full unit
    pub fn bootstrap(zone: ZoneName, full: SerializedDeploymentUnit) -> Self {
        Self {
            zone,
            base_checksum: None,
            current: full.clone(),
            full,
        }
    }
}

/// Sent by a participant joining a zone or suspecting it is stale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeUpdateCommand {
    pub runtime_name: String,
    pub zone: ZoneName,
    /// Checksum of the last state applied; `None` for an empty runtime
    pub checksum: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeUpdateResponse {
    pub updated: bool,
    pub command: Option<DeploymentCommand>,
}

impl RuntimeUpdateResponse {
    pub fn not_updated() -> Self {
        Self {
            updated: false,
            command: None,
        }
    }

    pub fn updated(command: DeploymentCommand) -> Self {
        Self {
            updated: true,
            command: Some(command),
        }
    }
}

/// Outcome of applying a deployment command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeploymentResponse {
    Ack { runtime: String, checksum: String },
    Nack { runtime: String, reason: String },
}

impl DeploymentResponse {
    pub fn runtime(&self) -> &str {
        match self {
            DeploymentResponse::Ack { runtime, .. } | DeploymentResponse::Nack { runtime, .. } => runtime,
        }
    }

    pub fn is_ack(&self) -> bool {
        matches!(self, DeploymentResponse::Ack { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolRequest {
    Deploy(DeploymentCommand),
    RuntimeUpdate(RuntimeUpdateCommand),
    Applied(DeploymentResponse),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolResponse {
    Deployment(DeploymentResponse),
    RuntimeUpdate(RuntimeUpdateResponse),
    Received,
    Failed(String),
}

/// Answers protocol requests
#[async_trait]
pub trait ProtocolHandler: Send + Sync {
    async fn handle(&self, request: ProtocolRequest) -> ProtocolResponse;
}

/// Delivers a request to one remote handler and waits for its answer
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, request: ProtocolRequest) -> Result<ProtocolResponse, ProtocolError>;
}

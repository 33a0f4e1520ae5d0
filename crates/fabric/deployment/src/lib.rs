//! Fabric3 Deployment
//!
//! Turns a generated logical domain into per-zone deployment state and keeps
//! zone participants in step with it:
//!
//! - [`ContributionCollator`] groups the contributions each zone must
//!   provision, imports first
//! - [`DeploymentGenerator`] compiles a generation pass into a
//!   [`DeploymentUnit`] of typed [`Command`]s per zone
//! - [`DeploymentController`] keeps each zone's full unit and increment
//!   history and answers [`RuntimeUpdateCommand`]s by checksum
//! - [`Participant`] applies [`DeploymentCommand`]s through the
//!   [`Connector`], [`ChannelConnector`] and [`ComponentManager`] attach layer
//!
//! Delivery is at-least-once. Every command is idempotent, so a participant
//! can always fall back to applying the full unit.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod collator;
pub mod command;
pub mod connector;
pub mod controller;
pub mod error;
pub mod executor;
pub mod generator;
pub mod participant;
pub mod protocol;
pub mod store;
pub mod transport;
pub mod unit;

pub use collator::{CollatedContributions, ContributionCollator, GenerationType};
pub use command::{Command, Phase};
pub use connector::{
    ChannelConnector, ComponentManager, Connector, InMemoryChannelConnector,
    InMemoryComponentManager, InMemoryConnector,
};
pub use controller::{Delivery, DeploymentController, ParticipantStatus, DEFAULT_HISTORY_LIMIT};
pub use error::{DeploymentError, ProtocolError, Result};
pub use executor::{CommandExecutor, InMemoryRuntime};
pub use generator::{Deployment, DeploymentGenerator};
pub use participant::Participant;
pub use protocol::{
    DeploymentCommand, DeploymentResponse, ProtocolHandler, ProtocolRequest, ProtocolResponse,
    RuntimeUpdateCommand, RuntimeUpdateResponse, Transport,
};
pub use store::{InMemoryMetaDataStore, MetaDataStore};
pub use transport::{serve, ChannelTransport, Envelope};
pub use unit::{DeploymentUnit, SerializedDeploymentUnit};

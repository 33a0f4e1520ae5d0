//! Fabric3 Types - Shared model types for the wiring and deployment core
//!
//! These types are used by every stage of the generation pipeline:
//!
//! - **Identifiers**: [`Uri`], [`QName`], [`ZoneName`], [`ContributionUri`]
//! - **Contracts**: [`ServiceContract`] and its [`Operation`]s
//! - **Kinds**: the closed sets of supported bindings, implementations and
//!   contract languages. Generators are registered against these kinds rather
//!   than looked up by runtime type.
//! - **Policy**: resolved intents and policy sets ([`PolicyResult`])
//! - **Contributions**: deployable artifacts and their import wires
//! - **Physical definitions**: the immutable, serializable attach instructions
//!   produced by generation and consumed by runtime attachers

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod contract;
pub mod contribution;
pub mod error;
pub mod ids;
pub mod kinds;
pub mod physical;
pub mod policy;
pub mod state;

// Re-export main types
pub use contract::{Operation, ServiceContract};
pub use contribution::{Contribution, ContributionUri, ContributionWire};
pub use error::{Result, TypesError};
pub use ids::{QName, Uri, ZoneName, FABRIC3_NS, SCA_NS};
pub use kinds::{BindingKind, ContractKind, ImplementationKind};
pub use physical::{
    AttachPoint, ConnectionAttachPoint, ConnectionKey, DeliveryType,
    PhysicalChannelConnectionDefinition, PhysicalChannelDefinition, PhysicalComponentDefinition,
    PhysicalConnectionSource, PhysicalConnectionTarget, PhysicalInterceptor, PhysicalOperation,
    PhysicalWireDefinition, PhysicalWireSource, PhysicalWireTarget, WireKey,
};
pub use policy::{intents, EffectivePolicy, PolicyResult, PolicySet};
pub use state::{LogicalState, Multiplicity};

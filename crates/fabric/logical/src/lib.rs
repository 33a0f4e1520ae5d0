//! Fabric3 Logical Model
//!
//! The logical model is the validated, pre-generation representation of a
//! deployed assembly: components nested in composites, their services,
//! references, producers and consumers, plus the wires and channels that
//! connect them.
//!
//! ## Ownership
//!
//! A [`LogicalDomain`] is an arena. Every node lives in a flat vector and is
//! addressed by a typed index ([`ComponentId`], [`ServiceId`], ...). One
//! deployment request owns its domain exclusively while the pipeline mutates
//! it in place (promotion resolution, binding selection). Undeployed nodes
//! stay in the arena in the `Marked` state so ids never shift.
//!
//! ## Promotion
//!
//! [`PromotionResolver`] rewrites composite-level promotion URIs so each one
//! names a concrete leaf endpoint. Failures are accumulated in a
//! [`ValidationContext`] and rendered with [`ValidationReport`].

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod domain;
pub mod error;
pub mod promotion;
pub mod validation;

pub use domain::{
    ChannelDefinition, ChannelId, ComponentDefinition, ComponentId, ConsumerId, LogicalBinding,
    LogicalChannel, LogicalComponent, LogicalConsumer, LogicalDomain, LogicalProducer,
    LogicalReference, LogicalService, LogicalWire, ProducerId, ReferenceId, ServiceId, WireId,
};
pub use error::{ModelError, Result};
pub use promotion::PromotionResolver;
pub use validation::{ValidationContext, ValidationError, ValidationReport};

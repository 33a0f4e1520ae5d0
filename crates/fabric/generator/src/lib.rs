//! Fabric3 Generation
//!
//! Compiles a resolved, bound logical domain into physical definitions.
//! [`WireGenerator`] and [`ChannelGenerator`] are dispatchers: the metadata
//! for each end comes from the component, binding and interceptor generators
//! registered in a [`GeneratorRegistry`].

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod channel;
pub mod error;
pub mod generators;
pub mod policy;
pub mod registry;
pub mod standard;
pub mod wire;

pub use channel::ChannelGenerator;
pub use error::{GenerationError, Result};
pub use generators::{
    BindingGenerator, ComponentGenerator, ConnectionBindingGenerator, InterceptorGenerator,
};
pub use policy::{InMemoryPolicyResolver, NoPolicyResolver, PolicyResolver};
pub use registry::GeneratorRegistry;
pub use standard::{
    binding_endpoint_uri, AuthorizationInterceptorGenerator, StandardBindingGenerator,
    StandardComponentGenerator,
};
pub use wire::{WireGenerator, Zoned};

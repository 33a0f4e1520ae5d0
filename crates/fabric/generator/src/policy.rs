//! Policy resolution seam
//!
//! Policy is resolved upstream of generation. Generators consume the result
//! as an opaque [`PolicyResult`].

use fabric_logical::{ChannelId, LogicalDomain, ReferenceId, ServiceId, WireId};
use fabric_types::{PolicyResult, Uri};
use std::collections::HashMap;

pub trait PolicyResolver: Send + Sync {
    fn resolve_wire(&self, domain: &LogicalDomain, wire: WireId) -> PolicyResult;

    /// Policy for a reference generated against its own bindings
    fn resolve_reference(&self, domain: &LogicalDomain, reference: ReferenceId) -> PolicyResult;

    /// Policy for a service exposed over its own bindings
    fn resolve_service(&self, domain: &LogicalDomain, service: ServiceId) -> PolicyResult;

    fn resolve_channel(&self, domain: &LogicalDomain, channel: ChannelId) -> PolicyResult;
}

/// Resolver for deployments without policy
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPolicyResolver;

impl PolicyResolver for NoPolicyResolver {
    fn resolve_wire(&self, _domain: &LogicalDomain, _wire: WireId) -> PolicyResult {
        PolicyResult::empty()
    }

    fn resolve_reference(&self, _domain: &LogicalDomain, _reference: ReferenceId) -> PolicyResult {
        PolicyResult::empty()
    }

    fn resolve_service(&self, _domain: &LogicalDomain, _service: ServiceId) -> PolicyResult {
        PolicyResult::empty()
    }

    fn resolve_channel(&self, _domain: &LogicalDomain, _channel: ChannelId) -> PolicyResult {
        PolicyResult::empty()
    }
}

/// Pre-resolved policy keyed by artifact URI
///
/// Wires resolve through their source reference's URI.
#[derive(Debug, Default, Clone)]
pub struct InMemoryPolicyResolver {
    policies: HashMap<Uri, PolicyResult>,
}

impl InMemoryPolicyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, artifact: Uri, policy: PolicyResult) -> Self {
        self.policies.insert(artifact, policy);
        self
    }

    fn lookup(&self, artifact: &Uri) -> PolicyResult {
        self.policies.get(artifact).cloned().unwrap_or_default()
    }
}

impl PolicyResolver for InMemoryPolicyResolver {
    fn resolve_wire(&self, domain: &LogicalDomain, wire: WireId) -> PolicyResult {
        self.lookup(&domain.reference(domain.wire(wire).source).uri)
    }

    fn resolve_reference(&self, domain: &LogicalDomain, reference: ReferenceId) -> PolicyResult {
        self.lookup(&domain.reference(reference).uri)
    }

    fn resolve_service(&self, domain: &LogicalDomain, service: ServiceId) -> PolicyResult {
        self.lookup(&domain.service(service).uri)
    }

    fn resolve_channel(&self, domain: &LogicalDomain, channel: ChannelId) -> PolicyResult {
        self.lookup(&domain.channel(channel).uri)
    }
}

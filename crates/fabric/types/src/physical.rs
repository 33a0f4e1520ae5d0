//! Physical definitions
//!
//! Generation compiles the logical model into these values. They carry no
//! reference back into the logical graph and are never mutated once built:
//! definitions expose read-only accessors and are constructed whole.

use crate::contribution::ContributionUri;
use crate::ids::{QName, Uri};
use crate::kinds::{BindingKind, ImplementationKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which runtime attacher handles one end of a wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttachPoint {
    Component(ImplementationKind),
    Binding(BindingKind),
}

/// Source end of a physical wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalWireSource {
    pub uri: Uri,
    pub attach: AttachPoint,
    pub properties: BTreeMap<String, String>,
    /// Callback service the target calls back on, for bidirectional wires
    pub callback_uri: Option<Uri>,
}

impl PhysicalWireSource {
    pub fn new(uri: Uri, attach: AttachPoint) -> Self {
        Self {
            uri,
            attach,
            properties: BTreeMap::new(),
            callback_uri: None,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_callback_uri(mut self, uri: Uri) -> Self {
        self.callback_uri = Some(uri);
        self
    }
}

/// Target end of a physical wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalWireTarget {
    pub uri: Uri,
    pub attach: AttachPoint,
    pub properties: BTreeMap<String, String>,
    /// True when this target is a callback service
    pub callback: bool,
}

impl PhysicalWireTarget {
    pub fn new(uri: Uri, attach: AttachPoint) -> Self {
        Self {
            uri,
            attach,
            properties: BTreeMap::new(),
            callback: false,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn as_callback(mut self) -> Self {
        self.callback = true;
        self
    }
}

/// An interceptor interposed on an operation's invocation chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalInterceptor {
    pub intent: QName,
    pub config: BTreeMap<String, Vec<String>>,
}

/// One operation of a physical wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalOperation {
    pub name: String,
    pub source_parameter_types: Vec<String>,
    pub target_parameter_types: Vec<String>,
    pub output_type: Option<String>,
    pub fault_types: Vec<String>,
    pub one_way: bool,
    pub callback: bool,
    pub interceptors: Vec<PhysicalInterceptor>,
}

/// Identity of a wire at the attach layer
///
/// Attaching a definition whose key is already live replaces the live wire.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WireKey {
    pub source: Uri,
    pub target: Uri,
    pub callback: bool,
}

/// Instructions for wiring two runtime endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalWireDefinition {
    source: PhysicalWireSource,
    target: PhysicalWireTarget,
    operations: Vec<PhysicalOperation>,
    optimizable: bool,
    source_contribution: Option<ContributionUri>,
    target_contribution: Option<ContributionUri>,
}

impl PhysicalWireDefinition {
    pub fn new(
        source: PhysicalWireSource,
        target: PhysicalWireTarget,
        operations: Vec<PhysicalOperation>,
    ) -> Self {
        Self {
            source,
            target,
            operations,
            optimizable: false,
            source_contribution: None,
            target_contribution: None,
        }
    }

    pub fn optimizable(mut self, optimizable: bool) -> Self {
        self.optimizable = optimizable;
        self
    }

    pub fn with_contributions(
        mut self,
        source: Option<ContributionUri>,
        target: Option<ContributionUri>,
    ) -> Self {
        self.source_contribution = source;
        self.target_contribution = target;
        self
    }

    pub fn source(&self) -> &PhysicalWireSource {
        &self.source
    }

    pub fn target(&self) -> &PhysicalWireTarget {
        &self.target
    }

    pub fn operations(&self) -> &[PhysicalOperation] {
        &self.operations
    }

    pub fn is_optimizable(&self) -> bool {
        self.optimizable
    }

    pub fn source_contribution(&self) -> Option<&ContributionUri> {
        self.source_contribution.as_ref()
    }

    pub fn target_contribution(&self) -> Option<&ContributionUri> {
        self.target_contribution.as_ref()
    }

    pub fn key(&self) -> WireKey {
        WireKey {
            source: self.source.uri.clone(),
            target: self.target.uri.clone(),
            callback: self.target.callback,
        }
    }
}

/// Instructions for instantiating a component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalComponentDefinition {
    uri: Uri,
    kind: ImplementationKind,
    contribution: ContributionUri,
    properties: BTreeMap<String, String>,
}

impl PhysicalComponentDefinition {
    pub fn new(uri: Uri, kind: ImplementationKind, contribution: ContributionUri) -> Self {
        Self {
            uri,
            kind,
            contribution,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn kind(&self) -> ImplementationKind {
        self.kind
    }

    pub fn contribution(&self) -> &ContributionUri {
        &self.contribution
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }
}

/// Event dispatch strategy for a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeliveryType {
    /// Synchronous fan-out on the publishing thread
    #[default]
    Default,
    AsyncWorker,
    RingBuffer,
}

/// Instructions for building a channel replica in one zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalChannelDefinition {
    uri: Uri,
    delivery: DeliveryType,
    binding: Option<BindingKind>,
    contribution: Option<ContributionUri>,
}

impl PhysicalChannelDefinition {
    pub fn new(uri: Uri, delivery: DeliveryType) -> Self {
        Self {
            uri,
            delivery,
            binding: None,
            contribution: None,
        }
    }

    pub fn with_binding(mut self, binding: BindingKind) -> Self {
        self.binding = Some(binding);
        self
    }

    pub fn with_contribution(mut self, contribution: ContributionUri) -> Self {
        self.contribution = Some(contribution);
        self
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn delivery(&self) -> DeliveryType {
        self.delivery
    }

    pub fn binding(&self) -> Option<BindingKind> {
        self.binding
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    pub fn contribution(&self) -> Option<&ContributionUri> {
        self.contribution.as_ref()
    }
}

/// Which runtime attacher handles one end of a channel connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionAttachPoint {
    Component(ImplementationKind),
    Channel,
    Binding(BindingKind),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalConnectionSource {
    pub uri: Uri,
    pub attach: ConnectionAttachPoint,
    pub properties: BTreeMap<String, String>,
}

impl PhysicalConnectionSource {
    pub fn new(uri: Uri, attach: ConnectionAttachPoint) -> Self {
        Self {
            uri,
            attach,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalConnectionTarget {
    pub uri: Uri,
    pub attach: ConnectionAttachPoint,
    pub properties: BTreeMap<String, String>,
}

impl PhysicalConnectionTarget {
    pub fn new(uri: Uri, attach: ConnectionAttachPoint) -> Self {
        Self {
            uri,
            attach,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionKey {
    pub source: Uri,
    pub target: Uri,
}

/// Instructions for connecting a producer, consumer or binding to a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalChannelConnectionDefinition {
    source: PhysicalConnectionSource,
    target: PhysicalConnectionTarget,
    event_types: Vec<String>,
    interceptors: Vec<PhysicalInterceptor>,
}

impl PhysicalChannelConnectionDefinition {
    pub fn new(
        source: PhysicalConnectionSource,
        target: PhysicalConnectionTarget,
        event_types: Vec<String>,
    ) -> Self {
        Self {
            source,
            target,
            event_types,
            interceptors: Vec::new(),
        }
    }

    pub fn with_interceptors(mut self, interceptors: Vec<PhysicalInterceptor>) -> Self {
        self.interceptors = interceptors;
        self
    }

    pub fn source(&self) -> &PhysicalConnectionSource {
        &self.source
    }

    pub fn target(&self) -> &PhysicalConnectionTarget {
        &self.target
    }

    pub fn event_types(&self) -> &[String] {
        &self.event_types
    }

    pub fn interceptors(&self) -> &[PhysicalInterceptor] {
        &self.interceptors
    }

    pub fn key(&self) -> ConnectionKey {
        ConnectionKey {
            source: self.source.uri.clone(),
            target: self.target.uri.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_definition_serializes_deterministically() {
        let source = PhysicalWireSource::new(
            Uri::new("fabric3://domain/client#service"),
            AttachPoint::Component(ImplementationKind::Java),
        )
        .with_property("b", "2")
        .with_property("a", "1");
        let target = PhysicalWireTarget::new(
            Uri::new("fabric3://domain/server#service"),
            AttachPoint::Component(ImplementationKind::Java),
        );
        let definition = PhysicalWireDefinition::new(source, target, Vec::new());

        let first = serde_json::to_vec(&definition).unwrap();
        let second = serde_json::to_vec(&definition.clone()).unwrap();
        assert_eq!(first, second);

        let decoded: PhysicalWireDefinition = serde_json::from_slice(&first).unwrap();
        assert_eq!(decoded.key(), definition.key());
    }
}

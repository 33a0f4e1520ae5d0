//! Arena-backed logical domain
//!
//! Nodes are stored in flat vectors and addressed by typed indices. Ids are
//! only minted by the arena that owns the node, so indexing with an id from
//! the same domain cannot go out of bounds.

use crate::error::{ModelError, Result};
use fabric_types::{
    BindingKind, ContributionUri, DeliveryType, ImplementationKind, LogicalState, Multiplicity,
    QName, ServiceContract, Uri, ZoneName,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(usize);

        impl $name {
            pub fn index(&self) -> usize {
                self.0
            }
        }
    };
}

arena_id!(
    /// Index of a component in its domain
    ComponentId
);
arena_id!(ServiceId);
arena_id!(ReferenceId);
arena_id!(ChannelId);
arena_id!(WireId);
arena_id!(ProducerId);
arena_id!(ConsumerId);

/// A binding attached to a service, reference or channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalBinding {
    pub kind: BindingKind,
    pub name: String,
    /// Endpoint address for bound references
    pub target: Option<Uri>,
    pub config: BTreeMap<String, String>,
    /// Chosen by binding selection rather than declared in the composite
    pub assigned: bool,
    pub state: LogicalState,
}

impl LogicalBinding {
    /// A binding declared in the composite
    pub fn explicit(kind: BindingKind) -> Self {
        Self {
            kind,
            name: kind.qname().local,
            target: None,
            config: BTreeMap::new(),
            assigned: false,
            state: LogicalState::New,
        }
    }

    /// A binding chosen by a binding provider
    pub fn assigned(kind: BindingKind) -> Self {
        Self {
            assigned: true,
            ..Self::explicit(kind)
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_target(mut self, target: Uri) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }
}

/// Input for [`LogicalDomain::add_component`]
#[derive(Debug, Clone)]
pub struct ComponentDefinition {
    pub implementation: ImplementationKind,
    pub zone: ZoneName,
    pub contribution: ContributionUri,
    pub deployable: Option<QName>,
    pub state: LogicalState,
    pub properties: BTreeMap<String, String>,
}

impl ComponentDefinition {
    pub fn new(implementation: ImplementationKind, contribution: impl Into<ContributionUri>) -> Self {
        Self {
            implementation,
            zone: ZoneName::local(),
            contribution: contribution.into(),
            deployable: None,
            state: LogicalState::New,
            properties: BTreeMap::new(),
        }
    }

    pub fn composite(contribution: impl Into<ContributionUri>) -> Self {
        Self::new(ImplementationKind::Composite, contribution)
    }

    pub fn in_zone(mut self, zone: impl Into<ZoneName>) -> Self {
        self.zone = zone.into();
        self
    }

    pub fn with_state(mut self, state: LogicalState) -> Self {
        self.state = state;
        self
    }

    pub fn with_deployable(mut self, deployable: QName) -> Self {
        self.deployable = Some(deployable);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A deployed unit. Composites additionally own children, channels and wires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalComponent {
    pub id: ComponentId,
    pub uri: Uri,
    pub parent: Option<ComponentId>,
    pub zone: ZoneName,
    pub state: LogicalState,
    pub implementation: ImplementationKind,
    pub contribution: ContributionUri,
    pub deployable: Option<QName>,
    pub properties: BTreeMap<String, String>,
    services: Vec<ServiceId>,
    references: Vec<ReferenceId>,
    producers: Vec<ProducerId>,
    consumers: Vec<ConsumerId>,
    children: Vec<ComponentId>,
    channels: Vec<ChannelId>,
    wires: Vec<WireId>,
}

impl LogicalComponent {
    pub fn is_composite(&self) -> bool {
        self.implementation.is_composite()
    }

    pub fn services(&self) -> &[ServiceId] {
        &self.services
    }

    pub fn references(&self) -> &[ReferenceId] {
        &self.references
    }

    pub fn producers(&self) -> &[ProducerId] {
        &self.producers
    }

    pub fn consumers(&self) -> &[ConsumerId] {
        &self.consumers
    }

    pub fn children(&self) -> &[ComponentId] {
        &self.children
    }

    pub fn channels(&self) -> &[ChannelId] {
        &self.channels
    }

    /// Wires declared in this composite
    pub fn wires(&self) -> &[WireId] {
        &self.wires
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalService {
    pub id: ServiceId,
    pub uri: Uri,
    pub component: ComponentId,
    pub contract: ServiceContract,
    pub bindings: Vec<LogicalBinding>,
    /// Target of a composite-level promotion; resolved to `component#service`
    pub promote: Option<Uri>,
    /// Synthesized to receive callbacks for a bidirectional reference
    pub callback: bool,
}

impl LogicalService {
    pub fn name(&self) -> &str {
        self.uri.fragment().unwrap_or_default()
    }

    pub fn explicit_bindings(&self) -> impl Iterator<Item = &LogicalBinding> {
        self.bindings.iter().filter(|b| !b.assigned)
    }

    pub fn has_explicit_binding(&self) -> bool {
        self.explicit_bindings().next().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalReference {
    pub id: ReferenceId,
    pub uri: Uri,
    pub component: ComponentId,
    pub contract: ServiceContract,
    pub multiplicity: Multiplicity,
    pub bindings: Vec<LogicalBinding>,
    /// Inner references this composite-level reference promotes
    pub promoted_uris: Vec<Uri>,
    pub resolved: bool,
    /// Callback service on the owning component, for bidirectional contracts
    pub callback_service: Option<ServiceId>,
    wires: Vec<WireId>,
}

impl LogicalReference {
    pub fn name(&self) -> &str {
        self.uri.fragment().unwrap_or_default()
    }

    pub fn wires(&self) -> &[WireId] {
        &self.wires
    }

    pub fn explicit_bindings(&self) -> impl Iterator<Item = &LogicalBinding> {
        self.bindings.iter().filter(|b| !b.assigned)
    }

    pub fn has_explicit_binding(&self) -> bool {
        self.explicit_bindings().next().is_some()
    }
}

/// A directed edge from a reference to a service, declared in a composite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalWire {
    pub id: WireId,
    pub composite: ComponentId,
    pub source: ReferenceId,
    pub target: ServiceId,
    pub state: LogicalState,
    /// Set by binding selection on remote wires
    pub source_binding: Option<LogicalBinding>,
    pub target_binding: Option<LogicalBinding>,
}

impl LogicalWire {
    pub fn is_bound(&self) -> bool {
        self.source_binding.is_some() && self.target_binding.is_some()
    }
}

/// Input for [`LogicalDomain::add_channel`]
#[derive(Debug, Clone, Default)]
pub struct ChannelDefinition {
    pub zone: ZoneName,
    pub delivery: DeliveryType,
}

impl ChannelDefinition {
    pub fn in_zone(zone: impl Into<ZoneName>) -> Self {
        Self {
            zone: zone.into(),
            delivery: DeliveryType::Default,
        }
    }

    pub fn with_delivery(mut self, delivery: DeliveryType) -> Self {
        self.delivery = delivery;
        self
    }
}

/// Pub/sub event bus node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalChannel {
    pub id: ChannelId,
    pub uri: Uri,
    pub composite: ComponentId,
    pub zone: ZoneName,
    pub state: LogicalState,
    pub delivery: DeliveryType,
    pub bindings: Vec<LogicalBinding>,
}

impl LogicalChannel {
    pub fn is_bound(&self) -> bool {
        !self.bindings.is_empty()
    }
}

/// Publishes events to one or more channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalProducer {
    pub id: ProducerId,
    pub uri: Uri,
    pub component: ComponentId,
    pub event_types: Vec<String>,
    pub targets: Vec<Uri>,
}

/// Receives events from one or more channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalConsumer {
    pub id: ConsumerId,
    pub uri: Uri,
    pub component: ComponentId,
    pub event_types: Vec<String>,
    pub sources: Vec<Uri>,
}

/// The logical domain: root composite plus every node beneath it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalDomain {
    root: ComponentId,
    components: Vec<LogicalComponent>,
    services: Vec<LogicalService>,
    references: Vec<LogicalReference>,
    channels: Vec<LogicalChannel>,
    wires: Vec<LogicalWire>,
    producers: Vec<LogicalProducer>,
    consumers: Vec<LogicalConsumer>,
    component_index: HashMap<Uri, ComponentId>,
    channel_index: HashMap<Uri, ChannelId>,
}

impl LogicalDomain {
    /// Create a domain whose root composite is addressed by `uri`
    pub fn new(uri: impl Into<Uri>) -> Self {
        let uri = uri.into();
        let root = ComponentId(0);
        let mut component_index = HashMap::new();
        component_index.insert(uri.clone(), root);

        Self {
            root,
            components: vec![LogicalComponent {
                id: root,
                contribution: ContributionUri::new(uri.as_str()),
                uri,
                parent: None,
                zone: ZoneName::local(),
                state: LogicalState::Provisioned,
                implementation: ImplementationKind::Composite,
                deployable: None,
                properties: BTreeMap::new(),
                services: Vec::new(),
                references: Vec::new(),
                producers: Vec::new(),
                consumers: Vec::new(),
                children: Vec::new(),
                channels: Vec::new(),
                wires: Vec::new(),
            }],
            services: Vec::new(),
            references: Vec::new(),
            channels: Vec::new(),
            wires: Vec::new(),
            producers: Vec::new(),
            consumers: Vec::new(),
            component_index,
            channel_index: HashMap::new(),
        }
    }

    pub fn root(&self) -> ComponentId {
        self.root
    }

    pub fn uri(&self) -> &Uri {
        &self.components[self.root.0].uri
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Add a child component under `parent`; its URI is `parent/name`
    pub fn add_component(
        &mut self,
        parent: ComponentId,
        name: &str,
        definition: ComponentDefinition,
    ) -> Result<ComponentId> {
        let parent_component = &self.components[parent.0];
        if !parent_component.is_composite() {
            return Err(ModelError::NotAComposite(parent_component.uri.clone()));
        }
        let uri = parent_component.uri.child(name);
        // an undeployed component stays in the arena and may be replaced
        if let Some(existing) = self.component_index.get(&uri) {
            if self.components[existing.0].state != LogicalState::Marked {
                return Err(ModelError::DuplicateUri(uri));
            }
        }

        let id = ComponentId(self.components.len());
        self.components.push(LogicalComponent {
            id,
            uri: uri.clone(),
            parent: Some(parent),
            zone: definition.zone,
            state: definition.state,
            implementation: definition.implementation,
            contribution: definition.contribution,
            deployable: definition.deployable,
            properties: definition.properties,
            services: Vec::new(),
            references: Vec::new(),
            producers: Vec::new(),
            consumers: Vec::new(),
            children: Vec::new(),
            channels: Vec::new(),
            wires: Vec::new(),
        });
        self.components[parent.0].children.push(id);
        self.component_index.insert(uri, id);
        Ok(id)
    }

    pub fn add_service(
        &mut self,
        component: ComponentId,
        name: &str,
        contract: ServiceContract,
    ) -> Result<ServiceId> {
        self.push_service(component, name, contract, false)
    }

    /// Add a reference. A bidirectional contract also gets a callback service
    /// on the same component, shared by references with the same callback
    /// interface.
    pub fn add_reference(
        &mut self,
        component: ComponentId,
        name: &str,
        contract: ServiceContract,
        multiplicity: Multiplicity,
    ) -> Result<ReferenceId> {
        let uri = self.components[component.0].uri.with_fragment(name);
        if self.endpoint_exists(component, &uri) {
            return Err(ModelError::DuplicateUri(uri));
        }

        let callback_service = match contract.callback.as_deref() {
            Some(callback) => Some(self.callback_service_for(component, callback)?),
            None => None,
        };

        let id = ReferenceId(self.references.len());
        self.references.push(LogicalReference {
            id,
            uri,
            component,
            contract,
            multiplicity,
            bindings: Vec::new(),
            promoted_uris: Vec::new(),
            resolved: false,
            callback_service,
            wires: Vec::new(),
        });
        self.components[component.0].references.push(id);
        Ok(id)
    }

    pub fn add_channel(
        &mut self,
        composite: ComponentId,
        name: &str,
        definition: ChannelDefinition,
    ) -> Result<ChannelId> {
        let parent = &self.components[composite.0];
        if !parent.is_composite() {
            return Err(ModelError::NotAComposite(parent.uri.clone()));
        }
        let uri = parent.uri.child(name);
        if self.channel_index.contains_key(&uri) || self.component_index.contains_key(&uri) {
            return Err(ModelError::DuplicateUri(uri));
        }

        let id = ChannelId(self.channels.len());
        self.channels.push(LogicalChannel {
            id,
            uri: uri.clone(),
            composite,
            zone: definition.zone,
            state: LogicalState::New,
            delivery: definition.delivery,
            bindings: Vec::new(),
        });
        self.components[composite.0].channels.push(id);
        self.channel_index.insert(uri, id);
        Ok(id)
    }

    pub fn add_producer(
        &mut self,
        component: ComponentId,
        name: &str,
        event_types: Vec<String>,
        targets: Vec<Uri>,
    ) -> Result<ProducerId> {
        let uri = self.components[component.0].uri.with_fragment(name);
        if self.endpoint_exists(component, &uri) {
            return Err(ModelError::DuplicateUri(uri));
        }
        let id = ProducerId(self.producers.len());
        self.producers.push(LogicalProducer {
            id,
            uri,
            component,
            event_types,
            targets,
        });
        self.components[component.0].producers.push(id);
        Ok(id)
    }

    pub fn add_consumer(
        &mut self,
        component: ComponentId,
        name: &str,
        event_types: Vec<String>,
        sources: Vec<Uri>,
    ) -> Result<ConsumerId> {
        let uri = self.components[component.0].uri.with_fragment(name);
        if self.endpoint_exists(component, &uri) {
            return Err(ModelError::DuplicateUri(uri));
        }
        let id = ConsumerId(self.consumers.len());
        self.consumers.push(LogicalConsumer {
            id,
            uri,
            component,
            event_types,
            sources,
        });
        self.components[component.0].consumers.push(id);
        Ok(id)
    }

    /// Declare a wire in `composite`, which must enclose both endpoints
    pub fn add_wire(
        &mut self,
        composite: ComponentId,
        source: ReferenceId,
        target: ServiceId,
    ) -> Result<WireId> {
        let composite_uri = &self.components[composite.0].uri;
        let source_uri = &self.references[source.0].uri;
        let target_uri = &self.services[target.0].uri;
        if !composite_uri.is_ancestor_of(source_uri) {
            return Err(ModelError::WireOutsideComposite(source_uri.clone()));
        }
        if !composite_uri.is_ancestor_of(target_uri) {
            return Err(ModelError::WireOutsideComposite(target_uri.clone()));
        }

        let id = WireId(self.wires.len());
        self.wires.push(LogicalWire {
            id,
            composite,
            source,
            target,
            state: LogicalState::New,
            source_binding: None,
            target_binding: None,
        });
        self.components[composite.0].wires.push(id);
        self.references[source.0].wires.push(id);
        Ok(id)
    }

    pub fn promote_service(&mut self, service: ServiceId, promoted: Uri) {
        self.services[service.0].promote = Some(promoted);
    }

    pub fn promote_reference(&mut self, reference: ReferenceId, promoted: Vec<Uri>) {
        let reference = &mut self.references[reference.0];
        reference.promoted_uris = promoted;
        reference.resolved = false;
    }

    pub fn add_service_binding(&mut self, service: ServiceId, binding: LogicalBinding) {
        self.services[service.0].bindings.push(binding);
    }

    pub fn add_reference_binding(&mut self, reference: ReferenceId, binding: LogicalBinding) {
        self.references[reference.0].bindings.push(binding);
    }

    pub fn add_channel_binding(&mut self, channel: ChannelId, binding: LogicalBinding) {
        self.channels[channel.0].bindings.push(binding);
    }

    // ------------------------------------------------------------------
    // Binding selection hooks
    // ------------------------------------------------------------------

    /// Attach a selected binding pair to both ends of a wire
    pub fn bind_wire(&mut self, wire: WireId, source: LogicalBinding, target: LogicalBinding) {
        let (reference, service) = {
            let wire = &self.wires[wire.0];
            (wire.source, wire.target)
        };
        self.references[reference.0].bindings.push(source.clone());
        self.services[service.0].bindings.push(target.clone());
        let wire = &mut self.wires[wire.0];
        wire.source_binding = Some(source);
        wire.target_binding = Some(target);
    }

    pub fn bind_service(&mut self, service: ServiceId, binding: LogicalBinding) {
        self.services[service.0].bindings.push(binding);
    }

    pub fn bind_channel(&mut self, channel: ChannelId, binding: LogicalBinding) {
        self.channels[channel.0].bindings.push(binding);
    }

    // ------------------------------------------------------------------
    // Access
    // ------------------------------------------------------------------

    pub fn component(&self, id: ComponentId) -> &LogicalComponent {
        &self.components[id.0]
    }

    pub fn component_mut(&mut self, id: ComponentId) -> &mut LogicalComponent {
        &mut self.components[id.0]
    }

    pub fn service(&self, id: ServiceId) -> &LogicalService {
        &self.services[id.0]
    }

    pub fn service_mut(&mut self, id: ServiceId) -> &mut LogicalService {
        &mut self.services[id.0]
    }

    pub fn reference(&self, id: ReferenceId) -> &LogicalReference {
        &self.references[id.0]
    }

    pub fn reference_mut(&mut self, id: ReferenceId) -> &mut LogicalReference {
        &mut self.references[id.0]
    }

    pub fn channel(&self, id: ChannelId) -> &LogicalChannel {
        &self.channels[id.0]
    }

    pub fn wire(&self, id: WireId) -> &LogicalWire {
        &self.wires[id.0]
    }

    pub fn wire_mut(&mut self, id: WireId) -> &mut LogicalWire {
        &mut self.wires[id.0]
    }

    pub fn producer(&self, id: ProducerId) -> &LogicalProducer {
        &self.producers[id.0]
    }

    pub fn consumer(&self, id: ConsumerId) -> &LogicalConsumer {
        &self.consumers[id.0]
    }

    pub fn components(&self) -> impl Iterator<Item = &LogicalComponent> {
        self.components.iter()
    }

    pub fn wires(&self) -> impl Iterator<Item = &LogicalWire> {
        self.wires.iter()
    }

    pub fn wire_ids(&self) -> Vec<WireId> {
        self.wires.iter().map(|w| w.id).collect()
    }

    pub fn channels(&self) -> impl Iterator<Item = &LogicalChannel> {
        self.channels.iter()
    }

    pub fn channel_ids(&self) -> Vec<ChannelId> {
        self.channels.iter().map(|c| c.id).collect()
    }

    pub fn producers(&self) -> impl Iterator<Item = &LogicalProducer> {
        self.producers.iter()
    }

    pub fn consumers(&self) -> impl Iterator<Item = &LogicalConsumer> {
        self.consumers.iter()
    }

    pub fn find_component(&self, uri: &Uri) -> Option<ComponentId> {
        self.component_index.get(uri).copied()
    }

    pub fn find_channel(&self, uri: &Uri) -> Option<ChannelId> {
        self.channel_index.get(uri).copied()
    }

    /// Direct child of `composite` addressed by `uri`
    pub fn child(&self, composite: ComponentId, uri: &Uri) -> Option<ComponentId> {
        self.find_component(uri)
            .filter(|id| self.components[id.0].parent == Some(composite))
    }

    pub fn component_service(&self, component: ComponentId, name: &str) -> Option<ServiceId> {
        self.components[component.0]
            .services
            .iter()
            .copied()
            .find(|id| self.services[id.0].name() == name)
    }

    pub fn component_reference(&self, component: ComponentId, name: &str) -> Option<ReferenceId> {
        self.components[component.0]
            .references
            .iter()
            .copied()
            .find(|id| self.references[id.0].name() == name)
    }

    /// Resolve `component#service`
    pub fn find_service(&self, uri: &Uri) -> Option<ServiceId> {
        let component = self.find_component(&uri.defragment())?;
        self.component_service(component, uri.fragment()?)
    }

    /// Resolve `component#reference`
    pub fn find_reference(&self, uri: &Uri) -> Option<ReferenceId> {
        let component = self.find_component(&uri.defragment())?;
        self.component_reference(component, uri.fragment()?)
    }

    /// All components beneath `component`, parents before children
    pub fn descendants(&self, component: ComponentId) -> Vec<ComponentId> {
        let mut result = Vec::new();
        let mut stack: Vec<ComponentId> = self.components[component.0]
            .children
            .iter()
            .rev()
            .copied()
            .collect();
        while let Some(next) = stack.pop() {
            result.push(next);
            stack.extend(self.components[next.0].children.iter().rev().copied());
        }
        result
    }

    // ------------------------------------------------------------------
    // Zones
    // ------------------------------------------------------------------

    pub fn reference_zone(&self, reference: ReferenceId) -> &ZoneName {
        &self.components[self.references[reference.0].component.0].zone
    }

    pub fn service_zone(&self, service: ServiceId) -> &ZoneName {
        &self.components[self.services[service.0].component.0].zone
    }

    /// Zones of the leaf references a wire's source promotes, and the zone of
    /// its leaf target
    pub fn wire_zones(&self, wire: WireId) -> (BTreeSet<&ZoneName>, &ZoneName) {
        let wire = &self.wires[wire.0];
        let sources = self
            .leaf_references(wire.source)
            .into_iter()
            .map(|leaf| self.reference_zone(leaf))
            .collect();
        (sources, self.service_zone(self.leaf_service(wire.target)))
    }

    /// Whether the path from one leaf reference of a wire to its target
    /// crosses zones or passes through a declared transport binding
    pub fn is_remote_leaf(&self, wire: WireId, leaf: ReferenceId) -> bool {
        let wire = &self.wires[wire.0];
        let target = self.leaf_service(wire.target);
        self.reference_zone(leaf) != self.service_zone(target)
            || self.references[leaf.0].has_explicit_binding()
            || self.references[wire.source.0].has_explicit_binding()
            || self.services[wire.target.0].has_explicit_binding()
            || self.services[target.0].has_explicit_binding()
    }

    /// A wire is remote when any of its leaf references is
    pub fn is_remote_wire(&self, wire: WireId) -> bool {
        let source = self.wires[wire.0].source;
        self.leaf_references(source)
            .into_iter()
            .any(|leaf| self.is_remote_leaf(wire, leaf))
    }

    /// Follow resolved service promotions down to the implementing service.
    /// Only promotions into descendants are followed.
    pub fn leaf_service(&self, service: ServiceId) -> ServiceId {
        let mut current = service;
        while let Some(promoted) = &self.services[current.0].promote {
            let owner = &self.components[self.services[current.0].component.0].uri;
            match self.find_service(promoted) {
                Some(next) if owner.is_ancestor_of(&self.services[next.0].uri) => current = next,
                _ => break,
            }
        }
        current
    }

    /// Follow resolved reference promotions down to the references that
    /// originate calls. A reference that promotes nothing is its own leaf.
    pub fn leaf_references(&self, reference: ReferenceId) -> Vec<ReferenceId> {
        let declared = &self.references[reference.0];
        let owner = &self.components[declared.component.0].uri;
        let mut leaves = Vec::new();
        for uri in &declared.promoted_uris {
            if let Some(inner) = self.find_reference(uri) {
                if owner.is_ancestor_of(&self.references[inner.0].uri) {
                    leaves.extend(self.leaf_references(inner));
                }
            }
        }
        if leaves.is_empty() {
            leaves.push(reference);
        }
        leaves
    }

    pub fn channel_producers(&self, channel: ChannelId) -> Vec<ProducerId> {
        let uri = &self.channels[channel.0].uri;
        self.producers
            .iter()
            .filter(|p| p.targets.contains(uri))
            .map(|p| p.id)
            .collect()
    }

    pub fn channel_consumers(&self, channel: ChannelId) -> Vec<ConsumerId> {
        let uri = &self.channels[channel.0].uri;
        self.consumers
            .iter()
            .filter(|c| c.sources.contains(uri))
            .map(|c| c.id)
            .collect()
    }

    /// Zones hosting the channel itself or any of its producers or consumers
    pub fn channel_zones(&self, channel: ChannelId) -> BTreeSet<ZoneName> {
        let mut zones = BTreeSet::new();
        zones.insert(self.channels[channel.0].zone.clone());
        for producer in self.channel_producers(channel) {
            let component = self.producers[producer.0].component;
            zones.insert(self.components[component.0].zone.clone());
        }
        for consumer in self.channel_consumers(channel) {
            let component = self.consumers[consumer.0].component;
            zones.insert(self.components[component.0].zone.clone());
        }
        zones
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Mark a component, its descendants and everything attached to them for removal
    pub fn mark_for_undeploy(&mut self, component: ComponentId) {
        let mut marked = vec![component];
        marked.extend(self.descendants(component));

        for id in &marked {
            let component = &mut self.components[id.0];
            component.state = LogicalState::Marked;
            let channels = component.channels.clone();
            let services = component.services.clone();
            let references = component.references.clone();

            for channel in channels {
                let channel = &mut self.channels[channel.0];
                channel.state = LogicalState::Marked;
                for binding in &mut channel.bindings {
                    binding.state = LogicalState::Marked;
                }
            }
            for service in services {
                for binding in &mut self.services[service.0].bindings {
                    binding.state = LogicalState::Marked;
                }
            }
            for reference in references {
                for binding in &mut self.references[reference.0].bindings {
                    binding.state = LogicalState::Marked;
                }
            }
        }

        for wire in &mut self.wires {
            let source = self.references[wire.source.0].component;
            let target = self.services[wire.target.0].component;
            if marked.contains(&source) || marked.contains(&target) {
                wire.state = LogicalState::Marked;
            }
        }
        debug!(component = %self.components[component.0].uri, count = marked.len(), "Marked for undeploy");
    }

    /// Record that everything new in this domain has been deployed
    pub fn set_provisioned(&mut self) {
        fn provision(state: &mut LogicalState) {
            if *state == LogicalState::New {
                *state = LogicalState::Provisioned;
            }
        }

        for component in &mut self.components {
            provision(&mut component.state);
        }
        for wire in &mut self.wires {
            provision(&mut wire.state);
        }
        for channel in &mut self.channels {
            provision(&mut channel.state);
            channel.bindings.iter_mut().for_each(|b| provision(&mut b.state));
        }
        for service in &mut self.services {
            service.bindings.iter_mut().for_each(|b| provision(&mut b.state));
        }
        for reference in &mut self.references {
            reference.bindings.iter_mut().for_each(|b| provision(&mut b.state));
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn push_service(
        &mut self,
        component: ComponentId,
        name: &str,
        contract: ServiceContract,
        callback: bool,
    ) -> Result<ServiceId> {
        let uri = self.components[component.0].uri.with_fragment(name);
        if self.endpoint_exists(component, &uri) {
            return Err(ModelError::DuplicateUri(uri));
        }
        let id = ServiceId(self.services.len());
        self.services.push(LogicalService {
            id,
            uri,
            component,
            contract,
            bindings: Vec::new(),
            promote: None,
            callback,
        });
        self.components[component.0].services.push(id);
        Ok(id)
    }

    fn callback_service_for(
        &mut self,
        component: ComponentId,
        callback: &ServiceContract,
    ) -> Result<ServiceId> {
        let name = callback
            .interface_name
            .rsplit('.')
            .next()
            .unwrap_or(&callback.interface_name)
            .to_string();
        match self.component_service(component, &name) {
            Some(existing) if self.services[existing.0].callback => Ok(existing),
            Some(_) => {
                let uri = self.components[component.0].uri.with_fragment(&name);
                Err(ModelError::DuplicateUri(uri))
            }
            None => self.push_service(component, &name, callback.clone(), true),
        }
    }

    fn endpoint_exists(&self, component: ComponentId, uri: &Uri) -> bool {
        let component = &self.components[component.0];
        component.services.iter().any(|s| &self.services[s.0].uri == uri)
            || component.references.iter().any(|r| &self.references[r.0].uri == uri)
            || component.producers.iter().any(|p| &self.producers[p.0].uri == uri)
            || component.consumers.iter().any(|c| &self.consumers[c.0].uri == uri)
    }
}

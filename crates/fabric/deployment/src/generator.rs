//! Deployment generation
//!
//! Compiles the components of one generation pass into a [`DeploymentUnit`]
//! per zone. Within a unit commands are grouped by [`Phase`], keeping the
//! order in which they were generated inside each phase.

use crate::collator::{ContributionCollator, GenerationType};
use crate::command::{Command, Phase};
use crate::error::Result;
use crate::store::MetaDataStore;
use crate::unit::DeploymentUnit;
use fabric_generator::{ChannelGenerator, GeneratorRegistry, PolicyResolver, WireGenerator, Zoned};
use fabric_logical::{ChannelId, ComponentId, LogicalDomain};
use fabric_types::{
    ConnectionKey, ContributionUri, LogicalState, PhysicalChannelConnectionDefinition,
    PhysicalWireDefinition, Uri, WireKey, ZoneName,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Units produced by one generation pass, keyed by zone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deployment {
    units: BTreeMap<ZoneName, DeploymentUnit>,
}

impl Deployment {
    pub fn zones(&self) -> impl Iterator<Item = &ZoneName> {
        self.units.keys()
    }

    pub fn unit(&self, zone: &ZoneName) -> Option<&DeploymentUnit> {
        self.units.get(zone)
    }

    pub fn units(&self) -> impl Iterator<Item = (&ZoneName, &DeploymentUnit)> {
        self.units.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[derive(Default)]
struct ZoneCommands {
    phases: BTreeMap<Phase, Vec<Command>>,
    wires: HashSet<WireKey>,
    connections: HashSet<ConnectionKey>,
    channels: HashSet<Uri>,
}

impl ZoneCommands {
    fn push(&mut self, command: Command) {
        let fresh = match &command {
            Command::AttachWire(wire) | Command::DetachWire(wire) => self.wires.insert(wire.key()),
            Command::ConnectChannel(c) | Command::DisconnectChannel(c) => self.connections.insert(c.key()),
            Command::BuildChannel(channel) => self.channels.insert(channel.uri().clone()),
            Command::DisposeChannel(uri) => self.channels.insert(uri.clone()),
            _ => true,
        };
        if fresh {
            self.phases.entry(command.phase()).or_default().push(command);
        }
    }

    fn finish(self) -> DeploymentUnit {
        DeploymentUnit::from_commands(self.phases.into_values().flatten().collect())
    }
}

#[derive(Default)]
struct Builder {
    zones: BTreeMap<ZoneName, ZoneCommands>,
}

impl Builder {
    fn push(&mut self, zone: &ZoneName, command: Command) {
        self.zones.entry(zone.clone()).or_default().push(command);
    }

    fn finish(self) -> Deployment {
        Deployment {
            units: self
                .zones
                .into_iter()
                .map(|(zone, commands)| (zone, commands.finish()))
                .filter(|(_, unit)| !unit.is_empty())
                .collect(),
        }
    }
}

pub struct DeploymentGenerator {
    registry: Arc<GeneratorRegistry>,
    collator: ContributionCollator,
    wires: WireGenerator,
    channels: ChannelGenerator,
}

impl DeploymentGenerator {
    pub fn new(
        registry: Arc<GeneratorRegistry>,
        policy: Arc<dyn PolicyResolver>,
        store: Arc<dyn MetaDataStore>,
    ) -> Self {
        Self {
            collator: ContributionCollator::new(store),
            wires: WireGenerator::new(registry.clone(), policy.clone()),
            channels: ChannelGenerator::new(registry.clone(), policy),
            registry,
        }
    }

    /// Generate per-zone units for `components`
    ///
    /// `components` bounds the pass; within it, `generation_type` decides
    /// which artifacts produce commands.
    #[instrument(skip(self, domain, components), fields(generation_type = %generation_type, components = components.len()))]
    pub fn generate(
        &self,
        domain: &LogicalDomain,
        components: &[ComponentId],
        generation_type: GenerationType,
    ) -> Result<Deployment> {
        let scope: HashSet<ComponentId> = components.iter().copied().collect();
        let leaves: Vec<ComponentId> = components
            .iter()
            .copied()
            .filter(|id| !domain.component(*id).is_composite())
            .collect();
        let selected: HashSet<ComponentId> = leaves
            .iter()
            .copied()
            .filter(|id| generation_type.generates(domain.component(*id).state))
            .collect();

        let mut builder = Builder::default();
        self.contributions(domain, &leaves, generation_type, &mut builder)?;
        self.components(domain, &leaves, &selected, generation_type, &mut builder)?;
        self.wires(domain, &scope, generation_type, &mut builder)?;
        for channel in domain.channel_ids() {
            self.channel(domain, channel, &scope, &selected, generation_type, &mut builder)?;
        }

        let deployment = builder.finish();
        info!(zones = deployment.units.len(), "Generated deployment");
        Ok(deployment)
    }

    fn contributions(
        &self,
        domain: &LogicalDomain,
        leaves: &[ComponentId],
        generation_type: GenerationType,
        builder: &mut Builder,
    ) -> Result<()> {
        let collated = self.collator.collate(domain, leaves, generation_type)?;
        if !generation_type.is_undeploy() {
            for (zone, contributions) in collated {
                for contribution in contributions {
                    builder.push(&zone, Command::ProvisionContribution(contribution));
                }
            }
            return Ok(());
        }

        // contributions still used by a live component in the zone stay provisioned
        let live: Vec<ComponentId> = domain
            .components()
            .filter(|c| c.parent.is_some() && !c.is_composite() && c.state != LogicalState::Marked)
            .map(|c| c.id)
            .collect();
        let retained: HashMap<ZoneName, HashSet<ContributionUri>> = self
            .collator
            .collate(domain, &live, GenerationType::Full)?
            .into_iter()
            .map(|(zone, contributions)| (zone, contributions.into_iter().map(|c| c.uri).collect()))
            .collect();

        for (zone, contributions) in collated {
            for contribution in contributions.into_iter().rev() {
                let in_use = retained
                    .get(&zone)
                    .is_some_and(|uris| uris.contains(&contribution.uri));
                if in_use {
                    debug!(zone = %zone, contribution = %contribution.uri, "Contribution still in use");
                    continue;
                }
                builder.push(&zone, Command::UnprovisionContribution(contribution.uri));
            }
        }
        Ok(())
    }

    fn components(
        &self,
        domain: &LogicalDomain,
        leaves: &[ComponentId],
        selected: &HashSet<ComponentId>,
        generation_type: GenerationType,
        builder: &mut Builder,
    ) -> Result<()> {
        for id in leaves.iter().filter(|id| selected.contains(id)) {
            let component = domain.component(*id);
            if generation_type.is_undeploy() {
                builder.push(&component.zone, Command::StopComponent(component.uri.clone()));
                builder.push(&component.zone, Command::DisposeComponent(component.uri.clone()));
            } else {
                let definition = self
                    .registry
                    .component(component.implementation)?
                    .generate(domain, *id)?;
                builder.push(&component.zone, Command::BuildComponent(definition));
                builder.push(&component.zone, Command::StartComponent(component.uri.clone()));
            }
        }
        Ok(())
    }

    fn wires(
        &self,
        domain: &LogicalDomain,
        scope: &HashSet<ComponentId>,
        generation_type: GenerationType,
        builder: &mut Builder,
    ) -> Result<()> {
        let mut generated: Vec<Zoned<PhysicalWireDefinition>> = Vec::new();

        for wire in domain.wires() {
            if !generation_type.generates(wire.state) {
                continue;
            }
            let target = domain.service(domain.leaf_service(wire.target)).component;
            let touches_scope = scope.contains(&target)
                || domain
                    .leaf_references(wire.source)
                    .iter()
                    .any(|r| scope.contains(&domain.reference(*r).component));
            if touches_scope {
                generated.extend(self.wires.generate_wire(domain, wire.id)?);
            }
        }

        for id in scope {
            let component = domain.component(*id);
            if !generation_type.generates(component.state) {
                continue;
            }
            for reference in component.references() {
                if domain.reference(*reference).has_explicit_binding() {
                    generated.extend(self.wires.generate_bound_reference(domain, *reference)?);
                }
            }
            for service in component.services() {
                if domain.service(*service).has_explicit_binding() {
                    generated.extend(self.wires.generate_bound_service(domain, *service)?);
                }
            }
        }

        for Zoned { zone, definition } in generated {
            let command = if generation_type.is_undeploy() {
                Command::DetachWire(definition)
            } else {
                Command::AttachWire(definition)
            };
            builder.push(&zone, command);
        }
        Ok(())
    }

    fn channel(
        &self,
        domain: &LogicalDomain,
        channel: ChannelId,
        scope: &HashSet<ComponentId>,
        selected: &HashSet<ComponentId>,
        generation_type: GenerationType,
        builder: &mut Builder,
    ) -> Result<()> {
        let logical = domain.channel(channel);
        let owned = logical.composite == domain.root() || scope.contains(&logical.composite);
        let whole = owned && generation_type.generates(logical.state);
        // a deployed channel that just gained a binding is bridged in every zone
        let rebound = !whole
            && !generation_type.is_undeploy()
            && logical.bindings.iter().any(|b| b.state == LogicalState::New);

        let owner_of = |connection: &PhysicalChannelConnectionDefinition| {
            domain
                .find_component(&connection.source().uri.defragment())
                .or_else(|| domain.find_component(&connection.target().uri.defragment()))
                .filter(|id| !domain.component(*id).is_composite())
        };

        // connections of selected components on a channel that is otherwise untouched
        let mut partial_zones: HashSet<ZoneName> = HashSet::new();
        let mut connections = Vec::new();
        for zoned in self.channels.generate_connections(domain, channel)? {
            let owner = owner_of(&zoned.definition);
            let include = if whole {
                generation_type.is_undeploy()
                    || owner.map_or(true, |id| domain.component(id).state != LogicalState::Marked)
            } else {
                owner.is_some_and(|id| selected.contains(&id))
            };
            if include {
                if !whole {
                    partial_zones.insert(zoned.zone.clone());
                }
                connections.push(zoned);
            } else if !whole && owner.is_none() {
                connections.push(zoned);
            }
        }

        if !whole && !rebound && partial_zones.is_empty() {
            return Ok(());
        }
        // a joining component re-applies its zone's replica and binding bridge
        let replicated = |zone: &ZoneName| {
            whole || rebound || (!generation_type.is_undeploy() && partial_zones.contains(zone))
        };

        for replica in self.channels.generate_channel(domain, channel)? {
            if !replicated(&replica.zone) {
                continue;
            }
            let command = if generation_type.is_undeploy() {
                Command::DisposeChannel(replica.definition.uri().clone())
            } else {
                Command::BuildChannel(replica.definition)
            };
            builder.push(&replica.zone, command);
        }

        for Zoned { zone, definition } in connections {
            let is_bridge = owner_of(&definition).is_none();
            if is_bridge && !replicated(&zone) {
                continue;
            }
            let command = if generation_type.is_undeploy() {
                Command::DisconnectChannel(definition)
            } else {
                Command::ConnectChannel(definition)
            };
            builder.push(&zone, command);
        }
        Ok(())
    }
}

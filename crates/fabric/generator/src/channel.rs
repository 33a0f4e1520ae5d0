//! Channel generation
//!
//! A channel is replicated in every zone hosting it or one of its producers
//! or consumers. Replicas are joined through the channel's binding: zones
//! that publish forward events into the binding, zones that subscribe
//! receive them from it.

use crate::error::{GenerationError, Result};
use crate::policy::PolicyResolver;
use crate::registry::GeneratorRegistry;
use crate::wire::{interceptors_for, Zoned};
use fabric_logical::{ChannelId, LogicalDomain};
use fabric_types::{
    ConnectionAttachPoint, PhysicalChannelConnectionDefinition, PhysicalChannelDefinition,
    PhysicalConnectionSource, PhysicalConnectionTarget, ZoneName,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument};

pub struct ChannelGenerator {
    registry: Arc<GeneratorRegistry>,
    policy: Arc<dyn PolicyResolver>,
}

impl ChannelGenerator {
    pub fn new(registry: Arc<GeneratorRegistry>, policy: Arc<dyn PolicyResolver>) -> Self {
        Self { registry, policy }
    }

    /// One channel definition per zone the channel spans
    pub fn generate_channel(
        &self,
        domain: &LogicalDomain,
        channel: ChannelId,
    ) -> Result<Vec<Zoned<PhysicalChannelDefinition>>> {
        let logical = domain.channel(channel);
        let zones = domain.channel_zones(channel);
        let binding = logical.bindings.first();
        if zones.len() > 1 && binding.is_none() {
            return Err(GenerationError::UnboundChannel(logical.uri.clone()));
        }

        let contribution = domain.component(logical.composite).contribution.clone();
        Ok(zones
            .into_iter()
            .map(|zone| {
                let mut definition = PhysicalChannelDefinition::new(logical.uri.clone(), logical.delivery)
                    .with_contribution(contribution.clone());
                if let Some(binding) = binding {
                    definition = definition.with_binding(binding.kind);
                }
                Zoned::new(zone, definition)
            })
            .collect())
    }

    /// Producer, consumer and binding connections for a channel
    #[instrument(skip(self, domain), fields(channel = %domain.channel(channel).uri))]
    pub fn generate_connections(
        &self,
        domain: &LogicalDomain,
        channel: ChannelId,
    ) -> Result<Vec<Zoned<PhysicalChannelConnectionDefinition>>> {
        let logical = domain.channel(channel);
        let policy = self.policy.resolve_channel(domain, channel);
        let interceptors = interceptors_for(&self.registry, &policy.endpoint, &logical.uri)?;

        let mut generated = Vec::new();
        let mut publishing: BTreeMap<ZoneName, Vec<String>> = BTreeMap::new();
        let mut subscribing: BTreeMap<ZoneName, Vec<String>> = BTreeMap::new();

        for producer in domain.channel_producers(channel) {
            let logical_producer = domain.producer(producer);
            let component = domain.component(logical_producer.component);
            let source = self
                .registry
                .component(component.implementation)?
                .generate_connection_source(domain, producer)?;
            let target = PhysicalConnectionTarget::new(logical.uri.clone(), ConnectionAttachPoint::Channel);
            generated.push(Zoned::new(
                component.zone.clone(),
                PhysicalChannelConnectionDefinition::new(source, target, logical_producer.event_types.clone())
                    .with_interceptors(interceptors.clone()),
            ));
            merge_event_types(
                publishing.entry(component.zone.clone()).or_default(),
                &logical_producer.event_types,
            );
        }

        for consumer in domain.channel_consumers(channel) {
            let logical_consumer = domain.consumer(consumer);
            let component = domain.component(logical_consumer.component);
            let source = PhysicalConnectionSource::new(logical.uri.clone(), ConnectionAttachPoint::Channel);
            let target = self
                .registry
                .component(component.implementation)?
                .generate_connection_target(domain, consumer)?;
            generated.push(Zoned::new(
                component.zone.clone(),
                PhysicalChannelConnectionDefinition::new(source, target, logical_consumer.event_types.clone())
                    .with_interceptors(interceptors.clone()),
            ));
            merge_event_types(
                subscribing.entry(component.zone.clone()).or_default(),
                &logical_consumer.event_types,
            );
        }

        if let Some(binding) = logical.bindings.first() {
            let generator = self.registry.connection(binding.kind)?;
            for (zone, event_types) in publishing {
                let source = PhysicalConnectionSource::new(logical.uri.clone(), ConnectionAttachPoint::Channel);
                let target = generator.generate_connection_target(binding, &logical.uri)?;
                generated.push(Zoned::new(
                    zone,
                    PhysicalChannelConnectionDefinition::new(source, target, event_types),
                ));
            }
            for (zone, event_types) in subscribing {
                let source = generator.generate_connection_source(binding, &logical.uri)?;
                let target = PhysicalConnectionTarget::new(logical.uri.clone(), ConnectionAttachPoint::Channel);
                generated.push(Zoned::new(
                    zone,
                    PhysicalChannelConnectionDefinition::new(source, target, event_types),
                ));
            }
        }

        debug!(count = generated.len(), "Generated channel connections");
        Ok(generated)
    }
}

fn merge_event_types(into: &mut Vec<String>, event_types: &[String]) {
    for event_type in event_types {
        if !into.contains(event_type) {
            into.push(event_type.clone());
        }
    }
}

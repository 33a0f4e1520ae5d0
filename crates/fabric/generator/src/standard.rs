//! Generators shipped with the core
//!
//! Transport- and implementation-specific extensions register their own
//! generators; these cover the metadata every attacher needs.

use crate::error::{GenerationError, Result};
use crate::generators::{BindingGenerator, ComponentGenerator, ConnectionBindingGenerator, InterceptorGenerator};
use fabric_logical::{ComponentId, ConsumerId, LogicalBinding, LogicalDomain, ProducerId, ReferenceId, ServiceId};
use fabric_types::{
    intents, AttachPoint, BindingKind, ConnectionAttachPoint, EffectivePolicy, ImplementationKind,
    PhysicalComponentDefinition, PhysicalConnectionSource, PhysicalConnectionTarget,
    PhysicalInterceptor, PhysicalWireSource, PhysicalWireTarget, QName, ServiceContract, Uri,
};
use std::collections::BTreeMap;

/// URI of a binding endpoint attached to `endpoint`
pub fn binding_endpoint_uri(endpoint: &Uri, binding: &LogicalBinding) -> Uri {
    Uri::new(format!("{}/{}", endpoint, binding.name))
}

/// Component generator carrying URIs and configured properties
#[derive(Debug, Clone, Copy)]
pub struct StandardComponentGenerator {
    kind: ImplementationKind,
}

impl StandardComponentGenerator {
    pub fn new(kind: ImplementationKind) -> Self {
        Self { kind }
    }
}

impl ComponentGenerator for StandardComponentGenerator {
    fn implementation_kind(&self) -> ImplementationKind {
        self.kind
    }

    fn generate(&self, domain: &LogicalDomain, component: ComponentId) -> Result<PhysicalComponentDefinition> {
        let logical = domain.component(component);
        if logical.is_composite() {
            return Err(GenerationError::CompositeComponent(logical.uri.clone()));
        }
        let definition = logical.properties.iter().fold(
            PhysicalComponentDefinition::new(
                logical.uri.clone(),
                logical.implementation,
                logical.contribution.clone(),
            ),
            |definition, (key, value)| definition.with_property(key.clone(), value.clone()),
        );
        Ok(definition)
    }

    fn generate_source(
        &self,
        domain: &LogicalDomain,
        reference: ReferenceId,
        _policy: &EffectivePolicy,
    ) -> Result<PhysicalWireSource> {
        let reference = domain.reference(reference);
        let source = PhysicalWireSource::new(reference.uri.clone(), AttachPoint::Component(self.kind))
            .with_property("interface", reference.contract.interface_name.clone());
        Ok(match reference.multiplicity.is_multi_valued() {
            true => source.with_property("multiplicity", "many"),
            false => source,
        })
    }

    fn generate_target(
        &self,
        domain: &LogicalDomain,
        service: ServiceId,
        _policy: &EffectivePolicy,
    ) -> Result<PhysicalWireTarget> {
        let service = domain.service(service);
        Ok(
            PhysicalWireTarget::new(service.uri.clone(), AttachPoint::Component(self.kind))
                .with_property("interface", service.contract.interface_name.clone()),
        )
    }

    fn generate_callback_source(
        &self,
        domain: &LogicalDomain,
        service: ServiceId,
        _policy: &EffectivePolicy,
    ) -> Result<PhysicalWireSource> {
        let service = domain.service(service);
        let interface = service
            .contract
            .callback
            .as_ref()
            .map(|callback| callback.interface_name.clone())
            .unwrap_or_default();
        Ok(
            PhysicalWireSource::new(service.uri.clone(), AttachPoint::Component(self.kind))
                .with_property("interface", interface),
        )
    }

    fn generate_connection_source(
        &self,
        domain: &LogicalDomain,
        producer: ProducerId,
    ) -> Result<PhysicalConnectionSource> {
        let producer = domain.producer(producer);
        Ok(PhysicalConnectionSource::new(
            producer.uri.clone(),
            ConnectionAttachPoint::Component(self.kind),
        ))
    }

    fn generate_connection_target(
        &self,
        domain: &LogicalDomain,
        consumer: ConsumerId,
    ) -> Result<PhysicalConnectionTarget> {
        let consumer = domain.consumer(consumer);
        Ok(PhysicalConnectionTarget::new(
            consumer.uri.clone(),
            ConnectionAttachPoint::Component(self.kind),
        ))
    }
}

/// Binding generator that forwards the binding configuration chosen by the
/// provider (or declared in the composite) as attach properties
#[derive(Debug, Clone, Copy)]
pub struct StandardBindingGenerator {
    kind: BindingKind,
}

impl StandardBindingGenerator {
    pub fn new(kind: BindingKind) -> Self {
        Self { kind }
    }

    fn properties(binding: &LogicalBinding) -> BTreeMap<String, String> {
        let mut properties = binding.config.clone();
        properties.insert("binding.name".to_string(), binding.name.clone());
        properties
    }
}

impl BindingGenerator for StandardBindingGenerator {
    fn binding_kind(&self) -> BindingKind {
        self.kind
    }

    fn generate_source(
        &self,
        binding: &LogicalBinding,
        endpoint: &Uri,
        contract: &ServiceContract,
        _policy: &EffectivePolicy,
    ) -> Result<PhysicalWireSource> {
        let mut source = PhysicalWireSource::new(
            binding_endpoint_uri(endpoint, binding),
            AttachPoint::Binding(self.kind),
        );
        source.properties = Self::properties(binding);
        Ok(source.with_property("interface", contract.interface_name.clone()))
    }

    fn generate_target(
        &self,
        binding: &LogicalBinding,
        endpoint: &Uri,
        contract: &ServiceContract,
        _policy: &EffectivePolicy,
    ) -> Result<PhysicalWireTarget> {
        let mut target = PhysicalWireTarget::new(
            binding_endpoint_uri(endpoint, binding),
            AttachPoint::Binding(self.kind),
        );
        target.properties = Self::properties(binding);
        let address = binding.target.as_ref().unwrap_or(endpoint);
        Ok(target
            .with_property("target", address.to_string())
            .with_property("interface", contract.interface_name.clone()))
    }
}

impl ConnectionBindingGenerator for StandardBindingGenerator {
    fn binding_kind(&self) -> BindingKind {
        self.kind
    }

    fn generate_connection_source(
        &self,
        binding: &LogicalBinding,
        channel: &Uri,
    ) -> Result<PhysicalConnectionSource> {
        let mut source = PhysicalConnectionSource::new(
            binding_endpoint_uri(channel, binding),
            ConnectionAttachPoint::Binding(self.kind),
        );
        source.properties = Self::properties(binding);
        Ok(source)
    }

    fn generate_connection_target(
        &self,
        binding: &LogicalBinding,
        channel: &Uri,
    ) -> Result<PhysicalConnectionTarget> {
        let mut target = PhysicalConnectionTarget::new(
            binding_endpoint_uri(channel, binding),
            ConnectionAttachPoint::Binding(self.kind),
        );
        target.properties = Self::properties(binding);
        Ok(target)
    }
}

/// Role-based authorization for the `authorization` intent
///
/// The policy set providing the intent must publish the permitted roles.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationInterceptorGenerator;

impl InterceptorGenerator for AuthorizationInterceptorGenerator {
    fn intent(&self) -> QName {
        intents::authorization()
    }

    fn generate(&self, policy: &EffectivePolicy, artifact: &Uri) -> Result<Option<PhysicalInterceptor>> {
        let intent = intents::authorization();
        if !policy.required_intents().contains(&intent) {
            return Ok(None);
        }
        let roles = policy
            .metadata_for(&intent, intents::ROLES_METADATA)
            .filter(|roles| !roles.is_empty())
            .ok_or_else(|| GenerationError::MissingPolicyMetadata {
                intent: intent.clone(),
                key: intents::ROLES_METADATA.to_string(),
                artifact: artifact.clone(),
            })?;

        let mut config = BTreeMap::new();
        config.insert(intents::ROLES_METADATA.to_string(), roles.to_vec());
        Ok(Some(PhysicalInterceptor { intent, config }))
    }
}

//! Wire generation
//!
//! A logical wire compiles to one physical wire when both ends share a zone,
//! or to a reference-side and a service-side wire joined by a binding when it
//! is remote. Bidirectional contracts add the matching callback wires.

use crate::error::{GenerationError, Result};
use crate::policy::PolicyResolver;
use crate::registry::GeneratorRegistry;
use fabric_logical::{LogicalBinding, LogicalDomain, ReferenceId, ServiceId, WireId};
use fabric_types::{
    EffectivePolicy, PhysicalInterceptor, PhysicalOperation, PhysicalWireDefinition, PolicyResult,
    ServiceContract, Uri, ZoneName,
};
use std::sync::Arc;
use tracing::{debug, instrument, trace};

/// A physical definition and the zone that must apply it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zoned<T> {
    pub zone: ZoneName,
    pub definition: T,
}

impl<T> Zoned<T> {
    pub fn new(zone: ZoneName, definition: T) -> Self {
        Self { zone, definition }
    }
}

pub struct WireGenerator {
    registry: Arc<GeneratorRegistry>,
    policy: Arc<dyn PolicyResolver>,
}

impl WireGenerator {
    pub fn new(registry: Arc<GeneratorRegistry>, policy: Arc<dyn PolicyResolver>) -> Self {
        Self { registry, policy }
    }

    /// Physical wires for a logical wire, resolved through promotions to the
    /// leaf endpoints
    #[instrument(skip(self, domain), fields(source = %domain.reference(domain.wire(wire).source).uri))]
    pub fn generate_wire(
        &self,
        domain: &LogicalDomain,
        wire: WireId,
    ) -> Result<Vec<Zoned<PhysicalWireDefinition>>> {
        let logical = domain.wire(wire);
        let policy = self.policy.resolve_wire(domain, wire);
        let target = domain.leaf_service(logical.target);

        let mut generated = Vec::new();
        let mut remote = 0;
        for reference in domain.leaf_references(logical.source) {
            if domain.is_remote_leaf(wire, reference) {
                remote += 1;
                generated.extend(self.generate_remote(domain, wire, reference, target, &policy)?);
            } else {
                generated.extend(self.generate_local(domain, reference, target, &policy)?);
            }
        }
        debug!(count = generated.len(), remote, "Generated physical wires");
        Ok(generated)
    }

    /// `component -> binding` wires for each binding declared on a reference
    pub fn generate_bound_reference(
        &self,
        domain: &LogicalDomain,
        reference: ReferenceId,
    ) -> Result<Vec<Zoned<PhysicalWireDefinition>>> {
        let declared = domain.reference(reference);
        let policy = self.policy.resolve_reference(domain, reference);
        let mut generated = Vec::new();

        for leaf in domain.leaf_references(reference) {
            let logical = domain.reference(leaf);
            let component = domain.component(logical.component);
            let generator = self.registry.component(component.implementation)?;

            for binding in declared.explicit_bindings() {
                let mut source = generator.generate_source(domain, leaf, &policy.endpoint)?;
                if let Some(callback) = logical.callback_service {
                    source = source.with_callback_uri(domain.service(callback).uri.clone());
                }
                let target = self.registry.binding(binding.kind)?.generate_target(
                    binding,
                    &logical.uri,
                    &logical.contract,
                    &policy.endpoint,
                )?;
                let operations = self.operations(&logical.contract, &logical.contract, &logical.uri, &policy, false)?;
                let definition = PhysicalWireDefinition::new(source, target, operations)
                    .with_contributions(Some(component.contribution.clone()), None);
                generated.push(Zoned::new(component.zone.clone(), definition));
            }
        }
        Ok(generated)
    }

    /// `binding -> component` wires for each binding declared on a service
    pub fn generate_bound_service(
        &self,
        domain: &LogicalDomain,
        service: ServiceId,
    ) -> Result<Vec<Zoned<PhysicalWireDefinition>>> {
        let declared = domain.service(service);
        let policy = self.policy.resolve_service(domain, service);
        let leaf = domain.leaf_service(service);
        let logical = domain.service(leaf);
        let component = domain.component(logical.component);
        let generator = self.registry.component(component.implementation)?;

        let mut generated = Vec::new();
        for binding in declared.explicit_bindings() {
            let source = self.registry.binding(binding.kind)?.generate_source(
                binding,
                &logical.uri,
                &logical.contract,
                &policy.endpoint,
            )?;
            let mut target = generator.generate_target(domain, leaf, &policy.endpoint)?;
            if logical.callback {
                target = target.as_callback();
            }
            let operations = self.operations(&logical.contract, &logical.contract, &logical.uri, &policy, logical.callback)?;
            let definition = PhysicalWireDefinition::new(source, target, operations)
                .with_contributions(None, Some(component.contribution.clone()));
            generated.push(Zoned::new(component.zone.clone(), definition));
        }
        Ok(generated)
    }

    fn generate_local(
        &self,
        domain: &LogicalDomain,
        reference: ReferenceId,
        service: ServiceId,
        policy: &PolicyResult,
    ) -> Result<Vec<Zoned<PhysicalWireDefinition>>> {
        let logical_reference = domain.reference(reference);
        let logical_service = domain.service(service);
        let source_component = domain.component(logical_reference.component);
        let target_component = domain.component(logical_service.component);

        let (reference_kind, service_kind) = (logical_reference.contract.kind, logical_service.contract.kind);
        if !self.registry.supports_transformation(reference_kind, service_kind) {
            return Err(GenerationError::UnsupportedContract {
                artifact: logical_reference.uri.clone(),
                reference: reference_kind,
                service: service_kind,
            });
        }

        let source_generator = self.registry.component(source_component.implementation)?;
        let target_generator = self.registry.component(target_component.implementation)?;

        let mut source = source_generator.generate_source(domain, reference, &policy.endpoint)?;
        if let Some(callback) = logical_reference.callback_service {
            source = source.with_callback_uri(domain.service(callback).uri.clone());
        }
        let target = target_generator.generate_target(domain, service, &policy.endpoint)?;
        let operations = self.operations(
            &logical_reference.contract,
            &logical_service.contract,
            &logical_service.uri,
            policy,
            false,
        )?;
        let optimizable = reference_kind == service_kind
            && operations.iter().all(|operation| operation.interceptors.is_empty());

        let zone = source_component.zone.clone();
        let mut generated = vec![Zoned::new(
            zone.clone(),
            PhysicalWireDefinition::new(source, target, operations)
                .optimizable(optimizable)
                .with_contributions(
                    Some(source_component.contribution.clone()),
                    Some(target_component.contribution.clone()),
                ),
        )];

        if let (Some(callback_contract), Some(callback)) = (
            logical_reference.contract.callback.as_deref(),
            logical_reference.callback_service,
        ) {
            let callback_service = domain.service(callback);
            let source = target_generator.generate_callback_source(domain, service, &policy.endpoint)?;
            let target = source_generator
                .generate_target(domain, callback, &policy.endpoint)?
                .as_callback();
            let operations = self.operations(
                callback_contract,
                &callback_service.contract,
                &callback_service.uri,
                policy,
                true,
            )?;
            trace!(callback = %callback_service.uri, "Generated local callback wire");
            generated.push(Zoned::new(
                zone,
                PhysicalWireDefinition::new(source, target, operations).with_contributions(
                    Some(target_component.contribution.clone()),
                    Some(source_component.contribution.clone()),
                ),
            ));
        }
        Ok(generated)
    }

    fn generate_remote(
        &self,
        domain: &LogicalDomain,
        wire: WireId,
        reference: ReferenceId,
        service: ServiceId,
        policy: &PolicyResult,
    ) -> Result<Vec<Zoned<PhysicalWireDefinition>>> {
        let logical_wire = domain.wire(wire);
        let logical_reference = domain.reference(reference);
        let logical_service = domain.service(service);
        let source_component = domain.component(logical_reference.component);
        let target_component = domain.component(logical_service.component);
        let reference_bound = logical_reference.has_explicit_binding()
            || domain.reference(logical_wire.source).has_explicit_binding();

        // Explicitly bound references are generated with their own bindings
        let source_binding: Option<LogicalBinding> = match &logical_wire.source_binding {
            Some(binding) => Some(binding.clone()),
            None if reference_bound => None,
            None => logical_service.explicit_bindings().next().cloned(),
        };
        // Explicitly bound services are generated with their own bindings
        let target_binding = logical_wire.target_binding.clone();

        if source_binding.is_none() && target_binding.is_none() && !reference_bound {
            return Err(GenerationError::UnboundRemoteWire(logical_reference.uri.clone()));
        }

        let source_generator = self.registry.component(source_component.implementation)?;
        let target_generator = self.registry.component(target_component.implementation)?;
        let mut generated = Vec::new();

        if let Some(binding) = &source_binding {
            let mut source = source_generator.generate_source(domain, reference, &policy.endpoint)?;
            if let Some(callback) = logical_reference.callback_service {
                source = source.with_callback_uri(domain.service(callback).uri.clone());
            }
            let target = self.registry.binding(binding.kind)?.generate_target(
                binding,
                &logical_service.uri,
                &logical_reference.contract,
                &policy.endpoint,
            )?;
            let operations = self.operations(
                &logical_reference.contract,
                &logical_reference.contract,
                &logical_service.uri,
                policy,
                false,
            )?;
            generated.push(Zoned::new(
                source_component.zone.clone(),
                PhysicalWireDefinition::new(source, target, operations)
                    .with_contributions(Some(source_component.contribution.clone()), None),
            ));
        }

        if let Some(binding) = &target_binding {
            let source = self.registry.binding(binding.kind)?.generate_source(
                binding,
                &logical_service.uri,
                &logical_service.contract,
                &policy.endpoint,
            )?;
            let target = target_generator.generate_target(domain, service, &policy.endpoint)?;
            let operations = self.operations(
                &logical_service.contract,
                &logical_service.contract,
                &logical_service.uri,
                policy,
                false,
            )?;
            generated.push(Zoned::new(
                target_component.zone.clone(),
                PhysicalWireDefinition::new(source, target, operations)
                    .with_contributions(None, Some(target_component.contribution.clone())),
            ));
        }

        if let (Some(callback_contract), Some(callback)) = (
            logical_reference.contract.callback.as_deref(),
            logical_reference.callback_service,
        ) {
            let callback_service = domain.service(callback);
            match callback_service.bindings.first() {
                Some(binding) => {
                    let generator = self.registry.binding(binding.kind)?;
                    let operations = self.operations(
                        callback_contract,
                        &callback_service.contract,
                        &callback_service.uri,
                        policy,
                        true,
                    )?;

                    // Inbound callbacks delivered to the client's callback service
                    let inbound = PhysicalWireDefinition::new(
                        generator.generate_source(binding, &callback_service.uri, callback_contract, &policy.endpoint)?,
                        source_generator
                            .generate_target(domain, callback, &policy.endpoint)?
                            .as_callback(),
                        operations.clone(),
                    )
                    .with_contributions(None, Some(source_component.contribution.clone()));
                    generated.push(Zoned::new(source_component.zone.clone(), inbound));

                    // Outbound callbacks sent by the service implementation
                    let outbound = PhysicalWireDefinition::new(
                        target_generator.generate_callback_source(domain, service, &policy.endpoint)?,
                        generator
                            .generate_target(binding, &callback_service.uri, callback_contract, &policy.endpoint)?
                            .as_callback(),
                        operations,
                    )
                    .with_contributions(Some(target_component.contribution.clone()), None);
                    generated.push(Zoned::new(target_component.zone.clone(), outbound));
                }
                None if source_component.zone == target_component.zone => {
                    let source = target_generator.generate_callback_source(domain, service, &policy.endpoint)?;
                    let target = source_generator
                        .generate_target(domain, callback, &policy.endpoint)?
                        .as_callback();
                    let operations = self.operations(
                        callback_contract,
                        &callback_service.contract,
                        &callback_service.uri,
                        policy,
                        true,
                    )?;
                    generated.push(Zoned::new(
                        source_component.zone.clone(),
                        PhysicalWireDefinition::new(source, target, operations).with_contributions(
                            Some(target_component.contribution.clone()),
                            Some(source_component.contribution.clone()),
                        ),
                    ));
                }
                None => {
                    return Err(GenerationError::UnboundRemoteWire(callback_service.uri.clone()));
                }
            }
        }

        Ok(generated)
    }

    /// Match source operations to target operations by name and attach
    /// interceptors for the policy in effect on each
    fn operations(
        &self,
        source: &ServiceContract,
        target: &ServiceContract,
        target_uri: &Uri,
        policy: &PolicyResult,
        callback: bool,
    ) -> Result<Vec<PhysicalOperation>> {
        source
            .operations
            .iter()
            .map(|operation| {
                let target_operation = target.operation(&operation.name).ok_or_else(|| {
                    GenerationError::OperationNotFound {
                        operation: operation.name.clone(),
                        target: target_uri.clone(),
                    }
                })?;
                let effective = policy.for_operation(&operation.name);
                Ok(PhysicalOperation {
                    name: operation.name.clone(),
                    source_parameter_types: operation.input_types.clone(),
                    target_parameter_types: target_operation.input_types.clone(),
                    output_type: target_operation.output_type.clone(),
                    fault_types: target_operation.fault_types.clone(),
                    one_way: operation.one_way,
                    callback,
                    interceptors: self.interceptors(&effective, target_uri)?,
                })
            })
            .collect()
    }

    pub(crate) fn interceptors(
        &self,
        policy: &EffectivePolicy,
        artifact: &Uri,
    ) -> Result<Vec<PhysicalInterceptor>> {
        interceptors_for(&self.registry, policy, artifact)
    }
}

/// Interceptors contributed by registered generators for the intents in
/// effect. Intents without a generator are provided by the binding or the
/// implementation and contribute nothing here.
pub(crate) fn interceptors_for(
    registry: &GeneratorRegistry,
    policy: &EffectivePolicy,
    artifact: &Uri,
) -> Result<Vec<PhysicalInterceptor>> {
    let mut interceptors = Vec::new();
    for intent in policy.required_intents() {
        match registry.interceptor(&intent) {
            Some(generator) => {
                if let Some(interceptor) = generator.generate(policy, artifact)? {
                    interceptors.push(interceptor);
                }
            }
            None => trace!(intent = %intent, "No interceptor generator for intent"),
        }
    }
    Ok(interceptors)
}

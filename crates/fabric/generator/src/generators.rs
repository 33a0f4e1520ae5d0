//! Generator plugin contracts
//!
//! Generators are registered per implementation kind, binding kind or policy
//! intent. The wire and channel generators only dispatch to them.

use crate::error::Result;
use fabric_logical::{ComponentId, ConsumerId, LogicalBinding, LogicalDomain, ProducerId, ReferenceId, ServiceId};
use fabric_types::{
    BindingKind, EffectivePolicy, ImplementationKind, PhysicalComponentDefinition,
    PhysicalConnectionSource, PhysicalConnectionTarget, PhysicalInterceptor, PhysicalWireSource,
    PhysicalWireTarget, QName, ServiceContract, Uri,
};

/// Produces physical metadata for one implementation kind
pub trait ComponentGenerator: Send + Sync {
    fn implementation_kind(&self) -> ImplementationKind;

    fn generate(&self, domain: &LogicalDomain, component: ComponentId) -> Result<PhysicalComponentDefinition>;

    /// Source end of a wire leaving `reference`
    fn generate_source(
        &self,
        domain: &LogicalDomain,
        reference: ReferenceId,
        policy: &EffectivePolicy,
    ) -> Result<PhysicalWireSource>;

    /// Target end of a wire arriving at `service`
    fn generate_target(
        &self,
        domain: &LogicalDomain,
        service: ServiceId,
        policy: &EffectivePolicy,
    ) -> Result<PhysicalWireTarget>;

    /// Source end of the callback wire the implementation behind `service`
    /// uses to call its clients back
    fn generate_callback_source(
        &self,
        domain: &LogicalDomain,
        service: ServiceId,
        policy: &EffectivePolicy,
    ) -> Result<PhysicalWireSource>;

    fn generate_connection_source(
        &self,
        domain: &LogicalDomain,
        producer: ProducerId,
    ) -> Result<PhysicalConnectionSource>;

    fn generate_connection_target(
        &self,
        domain: &LogicalDomain,
        consumer: ConsumerId,
    ) -> Result<PhysicalConnectionTarget>;
}

/// Produces the transport end of wires for one binding kind
pub trait BindingGenerator: Send + Sync {
    fn binding_kind(&self) -> BindingKind;

    /// Inbound side: the binding receives requests for `endpoint` and
    /// dispatches them into a component
    fn generate_source(
        &self,
        binding: &LogicalBinding,
        endpoint: &Uri,
        contract: &ServiceContract,
        policy: &EffectivePolicy,
    ) -> Result<PhysicalWireSource>;

    /// Outbound side: a component sends requests for `endpoint` through the binding
    fn generate_target(
        &self,
        binding: &LogicalBinding,
        endpoint: &Uri,
        contract: &ServiceContract,
        policy: &EffectivePolicy,
    ) -> Result<PhysicalWireTarget>;
}

/// Produces the transport end of channel connections for one binding kind
pub trait ConnectionBindingGenerator: Send + Sync {
    fn binding_kind(&self) -> BindingKind;

    /// Subscribing side: the binding delivers remote events into `channel`
    fn generate_connection_source(
        &self,
        binding: &LogicalBinding,
        channel: &Uri,
    ) -> Result<PhysicalConnectionSource>;

    /// Publishing side: events on `channel` are forwarded through the binding
    fn generate_connection_target(
        &self,
        binding: &LogicalBinding,
        channel: &Uri,
    ) -> Result<PhysicalConnectionTarget>;
}

/// Contributes an interceptor for one policy intent
pub trait InterceptorGenerator: Send + Sync {
    fn intent(&self) -> QName;

    /// `None` when the policy does not call for an interceptor here
    fn generate(&self, policy: &EffectivePolicy, artifact: &Uri) -> Result<Option<PhysicalInterceptor>>;
}

//! Generator registration table
//!
//! Built once at startup. Lookups are keyed by the closed kind enums, so an
//! unsupported kind surfaces as a typed error naming the kind.

use crate::error::{GenerationError, Result};
use crate::generators::{BindingGenerator, ComponentGenerator, ConnectionBindingGenerator, InterceptorGenerator};
use crate::standard::{AuthorizationInterceptorGenerator, StandardBindingGenerator, StandardComponentGenerator};
use fabric_types::{BindingKind, ContractKind, ImplementationKind, QName};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Default)]
pub struct GeneratorRegistry {
    components: HashMap<ImplementationKind, Arc<dyn ComponentGenerator>>,
    bindings: HashMap<BindingKind, Arc<dyn BindingGenerator>>,
    connections: HashMap<BindingKind, Arc<dyn ConnectionBindingGenerator>>,
    interceptors: HashMap<QName, Arc<dyn InterceptorGenerator>>,
    transformations: HashSet<(ContractKind, ContractKind)>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the generators shipped in this crate
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for kind in [
            ImplementationKind::System,
            ImplementationKind::Java,
            ImplementationKind::Timer,
            ImplementationKind::Web,
        ] {
            registry.register_component(Arc::new(StandardComponentGenerator::new(kind)));
        }
        for kind in BindingKind::ALL {
            registry.register_binding(Arc::new(StandardBindingGenerator::new(kind)));
        }
        for kind in [BindingKind::Jms, BindingKind::ZeroMq] {
            registry.register_connection(Arc::new(StandardBindingGenerator::new(kind)));
        }
        registry.register_interceptor(Arc::new(AuthorizationInterceptorGenerator));
        for (from, to) in [
            (ContractKind::Java, ContractKind::Wsdl),
            (ContractKind::Wsdl, ContractKind::Java),
            (ContractKind::Java, ContractKind::JsonSchema),
            (ContractKind::JsonSchema, ContractKind::Java),
        ] {
            registry.register_transformation(from, to);
        }
        registry
    }

    pub fn register_component(&mut self, generator: Arc<dyn ComponentGenerator>) {
        self.components.insert(generator.implementation_kind(), generator);
    }

    pub fn register_binding(&mut self, generator: Arc<dyn BindingGenerator>) {
        self.bindings.insert(generator.binding_kind(), generator);
    }

    pub fn register_connection(&mut self, generator: Arc<dyn ConnectionBindingGenerator>) {
        self.connections.insert(generator.binding_kind(), generator);
    }

    pub fn register_interceptor(&mut self, generator: Arc<dyn InterceptorGenerator>) {
        self.interceptors.insert(generator.intent(), generator);
    }

    /// Allow local wires from a `from` contract to a `to` contract
    pub fn register_transformation(&mut self, from: ContractKind, to: ContractKind) {
        self.transformations.insert((from, to));
    }

    pub fn component(&self, kind: ImplementationKind) -> Result<&dyn ComponentGenerator> {
        self.components
            .get(&kind)
            .map(|g| &**g)
            .ok_or(GenerationError::NoComponentGenerator(kind))
    }

    pub fn binding(&self, kind: BindingKind) -> Result<&dyn BindingGenerator> {
        self.bindings
            .get(&kind)
            .map(|g| &**g)
            .ok_or(GenerationError::NoBindingGenerator(kind))
    }

    pub fn connection(&self, kind: BindingKind) -> Result<&dyn ConnectionBindingGenerator> {
        self.connections
            .get(&kind)
            .map(|g| &**g)
            .ok_or(GenerationError::NoConnectionBindingGenerator(kind))
    }

    /// Interceptor generators are optional per intent
    pub fn interceptor(&self, intent: &QName) -> Option<&dyn InterceptorGenerator> {
        self.interceptors.get(intent).map(|g| &**g)
    }

    pub fn supports_transformation(&self, from: ContractKind, to: ContractKind) -> bool {
        from == to || self.transformations.contains(&(from, to))
    }
}

impl std::fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .field("bindings", &self.bindings.keys().collect::<Vec<_>>())
            .field("connections", &self.connections.keys().collect::<Vec<_>>())
            .field("interceptors", &self.interceptors.keys().collect::<Vec<_>>())
            .field("transformations", &self.transformations)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_kinds_are_typed_errors() {
        let registry = GeneratorRegistry::new();
        assert!(matches!(
            registry.component(ImplementationKind::Java),
            Err(GenerationError::NoComponentGenerator(ImplementationKind::Java))
        ));
        assert!(matches!(
            registry.binding(BindingKind::Ftp),
            Err(GenerationError::NoBindingGenerator(BindingKind::Ftp))
        ));

        let standard = GeneratorRegistry::standard();
        assert!(standard.component(ImplementationKind::Java).is_ok());
        assert!(standard.component(ImplementationKind::Composite).is_err());
        assert!(standard.connection(BindingKind::Http).is_err());
    }

    #[test]
    fn test_transformations() {
        let registry = GeneratorRegistry::standard();
        assert!(registry.supports_transformation(ContractKind::Wsdl, ContractKind::Wsdl));
        assert!(registry.supports_transformation(ContractKind::Java, ContractKind::Wsdl));
        assert!(!registry.supports_transformation(ContractKind::Wsdl, ContractKind::JsonSchema));
    }
}

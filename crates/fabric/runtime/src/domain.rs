//! Domain facade
//!
//! [`Domain`] owns the logical domain behind a single lock and runs the whole
//! pipeline for each deployment: promotion resolution, binding selection,
//! generation, collation and distribution to the zones. Each operation works
//! on a copy of the domain and commits it only when generation succeeded, so
//! a failed deployment leaves the domain untouched.

use crate::config::RuntimeConfig;
use crate::error::{DomainError, Result};
use fabric_binding::{BindingProvider, BindingSelector, JmsBindingProvider, ZeroMqBindingProvider};
use fabric_deployment::{
    Delivery, Deployment, DeploymentController, DeploymentGenerator, DeploymentUnit,
    GenerationType, MetaDataStore, Transport,
};
use fabric_generator::{GeneratorRegistry, NoPolicyResolver, PolicyResolver};
use fabric_logical::{
    ComponentId, LogicalDomain, ModelError, PromotionResolver, ValidationContext,
};
use fabric_types::{LogicalState, Uri, ZoneName};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Collaborators the pipeline is assembled from
pub struct DomainServices {
    pub providers: Vec<Arc<dyn BindingProvider>>,
    pub registry: Arc<GeneratorRegistry>,
    pub policy: Arc<dyn PolicyResolver>,
    pub store: Arc<dyn MetaDataStore>,
}

impl DomainServices {
    /// ZeroMQ and JMS providers, the standard generators and no policy
    pub fn standard(store: Arc<dyn MetaDataStore>) -> Self {
        Self {
            providers: vec![
                Arc::new(ZeroMqBindingProvider::new("localhost", 10000)),
                Arc::new(JmsBindingProvider::new()),
            ],
            registry: Arc::new(GeneratorRegistry::standard()),
            policy: Arc::new(NoPolicyResolver),
            store,
        }
    }
}

/// Outcome of one deployment operation
#[derive(Debug, Clone)]
pub struct DeploymentReport {
    pub id: Uuid,
    pub generation_type: GenerationType,
    /// Zones whose state changed
    pub zones: Vec<ZoneName>,
    pub deliveries: Vec<Delivery>,
}

impl DeploymentReport {
    /// Whether every participant reached the new state
    pub fn all_acknowledged(&self) -> bool {
        self.deliveries
            .iter()
            .all(|d| d.outcome.as_ref().is_ok_and(|r| r.is_ack()))
    }
}

pub struct Domain {
    // at most one deployment runs against the domain at a time
    logical: Mutex<LogicalDomain>,
    resolver: PromotionResolver,
    selector: BindingSelector,
    generator: DeploymentGenerator,
    controller: Arc<DeploymentController>,
}

impl Domain {
    pub fn new(config: &RuntimeConfig, services: DomainServices) -> Result<Self> {
        let selector = BindingSelector::new(services.providers, &config.binding)?;
        let generator = DeploymentGenerator::new(services.registry, services.policy, services.store);
        info!(domain = %config.domain_uri, order = ?selector.order(), "Domain created");

        Ok(Self {
            logical: Mutex::new(LogicalDomain::new(config.domain_uri.as_str())),
            resolver: PromotionResolver::new(),
            selector,
            generator,
            controller: Arc::new(DeploymentController::with_history_limit(
                config.protocol.history_limit,
            )),
        })
    }

    pub fn controller(&self) -> Arc<DeploymentController> {
        self.controller.clone()
    }

    /// Register a participant that receives this domain's deployments
    pub fn register_participant(
        &self,
        runtime: impl Into<String>,
        zone: ZoneName,
        transport: Arc<dyn Transport>,
    ) {
        self.controller.register_participant(runtime, zone, transport);
    }

    /// Read the logical domain
    pub async fn inspect<R>(&self, f: impl FnOnce(&LogicalDomain) -> R) -> R {
        let logical = self.logical.lock().await;
        f(&logical)
    }

    /// Add components with `include`, then deploy everything new
    ///
    /// `include` plays the part of introspection: it builds the new
    /// components, wires and channels under the domain root.
    #[instrument(skip_all)]
    pub async fn deploy<F>(&self, include: F) -> Result<DeploymentReport>
    where
        F: FnOnce(&mut LogicalDomain) -> std::result::Result<(), ModelError>,
    {
        let mut logical = self.logical.lock().await;
        let mut working = logical.clone();
        include(&mut working)?;

        let root = working.root();
        let mut context = ValidationContext::new();
        self.resolver.resolve(&mut working, root, &mut context);
        if context.has_errors() {
            let report = context.report();
            warn!(errors = report.total(), "Deployment rejected");
            return Err(DomainError::Validation(report));
        }
        self.selector.select_bindings(&mut working)?;

        let live = live_components(&working);
        let increment = self.generator.generate(&working, &live, GenerationType::Incremental)?;
        let full = self.generator.generate(&working, &live, GenerationType::Full)?;

        working.set_provisioned();
        *logical = working;
        self.publish(GenerationType::Incremental, &increment, &full).await
    }

    /// Undeploy a component and everything beneath it
    #[instrument(skip(self, uri), fields(component = %uri))]
    pub async fn undeploy(&self, uri: &Uri) -> Result<DeploymentReport> {
        let mut logical = self.logical.lock().await;
        let mut working = logical.clone();
        let component = working
            .find_component(uri)
            .filter(|id| working.component(*id).state != LogicalState::Marked)
            .ok_or_else(|| DomainError::ComponentNotFound(uri.clone()))?;
        working.mark_for_undeploy(component);

        // earlier tombstones are out of scope: a replacement may reuse their URIs
        let mut removed = vec![component];
        removed.extend(working.descendants(component));
        let removal = self.generator.generate(&working, &removed, GenerationType::Undeploy)?;
        let full = self
            .generator
            .generate(&working, &live_components(&working), GenerationType::Full)?;

        *logical = working;
        self.publish(GenerationType::Undeploy, &removal, &full).await
    }

    /// Hand each changed zone to the controller and push it to the zone's
    /// participants. Runs under the domain lock so zones see deployments in
    /// order.
    async fn publish(
        &self,
        generation_type: GenerationType,
        increment: &Deployment,
        full: &Deployment,
    ) -> Result<DeploymentReport> {
        let id = Uuid::new_v4();
        let empty = DeploymentUnit::new();
        let zones: BTreeSet<ZoneName> = increment
            .zones()
            .chain(full.zones())
            .cloned()
            .chain(self.controller.zones())
            .collect();

        let mut report = DeploymentReport {
            id,
            generation_type,
            zones: Vec::new(),
            deliveries: Vec::new(),
        };
        for zone in zones {
            let current = increment.unit(&zone).unwrap_or(&empty);
            let target = full.unit(&zone).unwrap_or(&empty);
            let Some(command) = self.controller.publish(&zone, current, target)? else {
                continue;
            };
            report.deliveries.extend(self.controller.distribute(&command).await);
            report.zones.push(zone);
        }

        info!(
            deployment = %id,
            generation_type = %generation_type,
            zones = report.zones.len(),
            deliveries = report.deliveries.len(),
            "Deployment published"
        );
        Ok(report)
    }
}

/// Components beneath the root not pending removal
fn live_components(domain: &LogicalDomain) -> Vec<ComponentId> {
    domain
        .descendants(domain.root())
        .into_iter()
        .filter(|id| {
            let component = domain.component(*id);
            component.state != LogicalState::Marked
        })
        .collect()
}

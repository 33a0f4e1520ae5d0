//! Attach layer
//!
//! Participants apply deployment units through these traits. Every operation
//! must be idempotent: redelivered commands are applied again, so attaching a
//! definition whose key is already live replaces the live wire rather than
//! adding a second one.
//!
//! The in-memory implementations record runtime state only. They are used by
//! tests and by runtimes that host no real transports.

use crate::error::{DeploymentError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use fabric_types::{
    ConnectionKey, Contribution, ContributionUri, PhysicalChannelConnectionDefinition,
    PhysicalChannelDefinition, PhysicalComponentDefinition, PhysicalWireDefinition, Uri, WireKey,
};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Attaches and detaches physical wires
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, definition: &PhysicalWireDefinition) -> Result<()>;

    async fn disconnect(&self, definition: &PhysicalWireDefinition) -> Result<()>;
}

/// Attaches and detaches channel connections
#[async_trait]
pub trait ChannelConnector: Send + Sync {
    async fn connect(&self, definition: &PhysicalChannelConnectionDefinition) -> Result<()>;

    async fn disconnect(&self, definition: &PhysicalChannelConnectionDefinition) -> Result<()>;
}

/// Contribution, component and channel lifecycle on a participant
#[async_trait]
pub trait ComponentManager: Send + Sync {
    async fn provision(&self, contribution: &Contribution) -> Result<()>;

    async fn unprovision(&self, contribution: &ContributionUri) -> Result<()>;

    async fn build_component(&self, definition: &PhysicalComponentDefinition) -> Result<()>;

    async fn start(&self, component: &Uri) -> Result<()>;

    async fn stop(&self, component: &Uri) -> Result<()>;

    async fn dispose_component(&self, component: &Uri) -> Result<()>;

    async fn build_channel(&self, definition: &PhysicalChannelDefinition) -> Result<()>;

    async fn dispose_channel(&self, channel: &Uri) -> Result<()>;
}

/// In-memory wire attacher
pub struct InMemoryConnector {
    wires: DashMap<WireKey, PhysicalWireDefinition>,
    attachments: AtomicU64,
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self {
            wires: DashMap::new(),
            attachments: AtomicU64::new(0),
        }
    }

    /// Number of live wires
    pub fn live_wires(&self) -> usize {
        self.wires.len()
    }

    pub fn is_attached(&self, key: &WireKey) -> bool {
        self.wires.contains_key(key)
    }

    pub fn wire(&self, key: &WireKey) -> Option<PhysicalWireDefinition> {
        self.wires.get(key).map(|w| w.clone())
    }

    /// Total attach operations performed, including re-attachments
    pub fn attachments(&self) -> u64 {
        self.attachments.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for InMemoryConnector {
    async fn connect(&self, definition: &PhysicalWireDefinition) -> Result<()> {
        let key = definition.key();
        if self.wires.remove(&key).is_some() {
            debug!(source = %key.source, target = %key.target, "Detached live wire before reattach");
        }
        self.wires.insert(key, definition.clone());
        self.attachments.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn disconnect(&self, definition: &PhysicalWireDefinition) -> Result<()> {
        self.wires.remove(&definition.key());
        Ok(())
    }
}

/// In-memory channel connection attacher
pub struct InMemoryChannelConnector {
    connections: DashMap<ConnectionKey, PhysicalChannelConnectionDefinition>,
}

impl InMemoryChannelConnector {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    pub fn live_connections(&self) -> usize {
        self.connections.len()
    }

    pub fn is_connected(&self, key: &ConnectionKey) -> bool {
        self.connections.contains_key(key)
    }
}

impl Default for InMemoryChannelConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelConnector for InMemoryChannelConnector {
    async fn connect(&self, definition: &PhysicalChannelConnectionDefinition) -> Result<()> {
        self.connections.insert(definition.key(), definition.clone());
        Ok(())
    }

    async fn disconnect(&self, definition: &PhysicalChannelConnectionDefinition) -> Result<()> {
        self.connections.remove(&definition.key());
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct ComponentRecord {
    definition: PhysicalComponentDefinition,
    started: bool,
}

/// In-memory component manager
pub struct InMemoryComponentManager {
    contributions: DashMap<ContributionUri, Contribution>,
    components: DashMap<Uri, ComponentRecord>,
    channels: DashMap<Uri, PhysicalChannelDefinition>,
}

impl InMemoryComponentManager {
    pub fn new() -> Self {
        Self {
            contributions: DashMap::new(),
            components: DashMap::new(),
            channels: DashMap::new(),
        }
    }

    pub fn is_provisioned(&self, contribution: &ContributionUri) -> bool {
        self.contributions.contains_key(contribution)
    }

    pub fn is_running(&self, component: &Uri) -> bool {
        self.components.get(component).is_some_and(|c| c.started)
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn has_channel(&self, channel: &Uri) -> bool {
        self.channels.contains_key(channel)
    }
}

impl Default for InMemoryComponentManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ComponentManager for InMemoryComponentManager {
    async fn provision(&self, contribution: &Contribution) -> Result<()> {
        self.contributions.insert(contribution.uri.clone(), contribution.clone());
        Ok(())
    }

    async fn unprovision(&self, contribution: &ContributionUri) -> Result<()> {
        self.contributions.remove(contribution);
        Ok(())
    }

    async fn build_component(&self, definition: &PhysicalComponentDefinition) -> Result<()> {
        if !self.contributions.contains_key(definition.contribution()) {
            return Err(DeploymentError::NotProvisioned(definition.contribution().clone()));
        }
        // rebuilding keeps a running instance running
        let started = self.is_running(definition.uri());
        self.components.insert(
            definition.uri().clone(),
            ComponentRecord {
                definition: definition.clone(),
                started,
            },
        );
        Ok(())
    }

    async fn start(&self, component: &Uri) -> Result<()> {
        let mut record = self
            .components
            .get_mut(component)
            .ok_or_else(|| DeploymentError::ComponentNotBuilt(component.clone()))?;
        record.started = true;
        debug!(component = %component, kind = %record.definition.kind(), "Started component");
        Ok(())
    }

    async fn stop(&self, component: &Uri) -> Result<()> {
        if let Some(mut record) = self.components.get_mut(component) {
            record.started = false;
        }
        Ok(())
    }

    async fn dispose_component(&self, component: &Uri) -> Result<()> {
        self.components.remove(component);
        Ok(())
    }

    async fn build_channel(&self, definition: &PhysicalChannelDefinition) -> Result<()> {
        self.channels.insert(definition.uri().clone(), definition.clone());
        Ok(())
    }

    async fn dispose_channel(&self, channel: &Uri) -> Result<()> {
        self.channels.remove(channel);
        Ok(())
    }
}

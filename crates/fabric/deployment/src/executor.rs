//! Applies deployment units through the attach layer

use crate::command::Command;
use crate::connector::{
    ChannelConnector, ComponentManager, Connector, InMemoryChannelConnector,
    InMemoryComponentManager, InMemoryConnector,
};
use crate::error::Result;
use crate::unit::DeploymentUnit;
use std::sync::Arc;
use tracing::{instrument, trace};

pub struct CommandExecutor {
    components: Arc<dyn ComponentManager>,
    wires: Arc<dyn Connector>,
    channels: Arc<dyn ChannelConnector>,
}

impl CommandExecutor {
    pub fn new(
        components: Arc<dyn ComponentManager>,
        wires: Arc<dyn Connector>,
        channels: Arc<dyn ChannelConnector>,
    ) -> Self {
        Self {
            components,
            wires,
            channels,
        }
    }

    /// Apply every command in order, stopping at the first failure
    #[instrument(skip_all, fields(commands = unit.len()))]
    pub async fn execute(&self, unit: &DeploymentUnit) -> Result<()> {
        for command in unit.commands() {
            trace!(%command, "Applying command");
            match command {
                Command::ProvisionContribution(contribution) => {
                    self.components.provision(contribution).await?
                }
                Command::BuildChannel(channel) => self.components.build_channel(channel).await?,
                Command::BuildComponent(component) => {
                    self.components.build_component(component).await?
                }
                Command::AttachWire(wire) => self.wires.connect(wire).await?,
                Command::ConnectChannel(connection) => self.channels.connect(connection).await?,
                Command::StartComponent(uri) => self.components.start(uri).await?,
                Command::StopComponent(uri) => self.components.stop(uri).await?,
                Command::DetachWire(wire) => self.wires.disconnect(wire).await?,
                Command::DisconnectChannel(connection) => {
                    self.channels.disconnect(connection).await?
                }
                Command::DisposeComponent(uri) => self.components.dispose_component(uri).await?,
                Command::DisposeChannel(uri) => self.components.dispose_channel(uri).await?,
                Command::UnprovisionContribution(uri) => self.components.unprovision(uri).await?,
            }
        }
        Ok(())
    }
}

/// In-memory attach layer with handles for inspection
#[derive(Clone, Default)]
pub struct InMemoryRuntime {
    pub components: Arc<InMemoryComponentManager>,
    pub wires: Arc<InMemoryConnector>,
    pub channels: Arc<InMemoryChannelConnector>,
}

impl InMemoryRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn executor(&self) -> CommandExecutor {
        CommandExecutor::new(
            self.components.clone(),
            self.wires.clone(),
            self.channels.clone(),
        )
    }
}

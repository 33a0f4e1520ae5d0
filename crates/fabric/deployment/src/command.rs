//! Typed deployment commands
//!
//! A participant applies commands strictly in the order a unit lists them.

use fabric_types::{
    Contribution, ContributionUri, PhysicalChannelConnectionDefinition, PhysicalChannelDefinition,
    PhysicalComponentDefinition, PhysicalWireDefinition, Uri,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "payload", rename_all = "snake_case")]
pub enum Command {
    ProvisionContribution(Contribution),
    BuildChannel(PhysicalChannelDefinition),
    BuildComponent(PhysicalComponentDefinition),
    AttachWire(PhysicalWireDefinition),
    ConnectChannel(PhysicalChannelConnectionDefinition),
    StartComponent(Uri),
    StopComponent(Uri),
    DetachWire(PhysicalWireDefinition),
    DisconnectChannel(PhysicalChannelConnectionDefinition),
    DisposeComponent(Uri),
    DisposeChannel(Uri),
    UnprovisionContribution(ContributionUri),
}

/// Position of a command within a generated unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Provision,
    BuildChannels,
    BuildComponents,
    Attach,
    Start,
    Stop,
    Detach,
    Dispose,
    Unprovision,
}

impl Command {
    pub fn phase(&self) -> Phase {
        match self {
            Command::ProvisionContribution(_) => Phase::Provision,
            Command::BuildChannel(_) => Phase::BuildChannels,
            Command::BuildComponent(_) => Phase::BuildComponents,
            Command::AttachWire(_) | Command::ConnectChannel(_) => Phase::Attach,
            Command::StartComponent(_) => Phase::Start,
            Command::StopComponent(_) => Phase::Stop,
            Command::DetachWire(_) | Command::DisconnectChannel(_) => Phase::Detach,
            Command::DisposeComponent(_) | Command::DisposeChannel(_) => Phase::Dispose,
            Command::UnprovisionContribution(_) => Phase::Unprovision,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::ProvisionContribution(c) => write!(f, "provision {}", c.uri),
            Command::BuildChannel(c) => write!(f, "build channel {}", c.uri()),
            Command::BuildComponent(c) => write!(f, "build component {}", c.uri()),
            Command::AttachWire(w) => write!(f, "attach {} -> {}", w.source().uri, w.target().uri),
            Command::ConnectChannel(c) => write!(f, "connect {} -> {}", c.source().uri, c.target().uri),
            Command::StartComponent(uri) => write!(f, "start {uri}"),
            Command::StopComponent(uri) => write!(f, "stop {uri}"),
            Command::DetachWire(w) => write!(f, "detach {} -> {}", w.source().uri, w.target().uri),
            Command::DisconnectChannel(c) => {
                write!(f, "disconnect {} -> {}", c.source().uri, c.target().uri)
            }
            Command::DisposeComponent(uri) => write!(f, "dispose component {uri}"),
            Command::DisposeChannel(uri) => write!(f, "dispose channel {uri}"),
            Command::UnprovisionContribution(uri) => write!(f, "unprovision {uri}"),
        }
    }
}

//! Zone participant
//!
//! A participant applies deployment commands to its runtime and remembers the
//! checksum of the state it reached. It applies the incremental unit only when
//! the command's base checksum is its own; otherwise it applies the full unit,
//! which is safe because every command is idempotent.
//!
//! A participant that holds a full unit can answer update requests from peers
//! in its zone. Unlike the controller it answers "not updated" when it has
//! nothing to offer.

use crate::error::ProtocolError;
use crate::executor::CommandExecutor;
use crate::protocol::{
    DeploymentCommand, DeploymentResponse, ProtocolHandler, ProtocolRequest, ProtocolResponse,
    RuntimeUpdateCommand, RuntimeUpdateResponse, Transport,
};
use async_trait::async_trait;
use fabric_types::ZoneName;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

#[derive(Default)]
struct ParticipantState {
    checksum: Option<String>,
    bootstrap: Option<DeploymentCommand>,
}

pub struct Participant {
    runtime_name: String,
    zone: ZoneName,
    executor: CommandExecutor,
    // held across unit execution so commands apply one at a time
    state: Mutex<ParticipantState>,
}

impl Participant {
    pub fn new(runtime_name: impl Into<String>, zone: ZoneName, executor: CommandExecutor) -> Self {
        Self {
            runtime_name: runtime_name.into(),
            zone,
            executor,
            state: Mutex::new(ParticipantState::default()),
        }
    }

    pub fn runtime_name(&self) -> &str {
        &self.runtime_name
    }

    pub fn zone(&self) -> &ZoneName {
        &self.zone
    }

    pub async fn checksum(&self) -> Option<String> {
        self.state.lock().await.checksum.clone()
    }

    /// Apply a command and report the outcome
    #[instrument(skip(self, command), fields(runtime = %self.runtime_name, checksum = %command.checksum()))]
    pub async fn apply(&self, command: DeploymentCommand) -> DeploymentResponse {
        if command.zone != self.zone {
            return self.nack(format!("command for zone {} sent to zone {}", command.zone, self.zone));
        }

        let mut state = self.state.lock().await;
        if state.checksum.as_deref() == Some(command.checksum()) {
            debug!("Already at this state");
            return self.ack(command.checksum());
        }

        if let Err(e) = command.full.verify() {
            return self.nack(e.to_string());
        }
        let incremental = command.base_checksum == state.checksum;
        let payload = if incremental { &command.current } else { &command.full };
        let unit = match payload.deserialize() {
            Ok(unit) => unit,
            Err(e) => return self.nack(e.to_string()),
        };

        if let Err(e) = self.executor.execute(&unit).await {
            warn!(error = %e, "Deployment failed");
            // partially applied: only a full unit can recover from here
            state.checksum = None;
            return self.nack(e.to_string());
        }

        info!(incremental, commands = unit.len(), "Applied deployment");
        state.checksum = Some(command.checksum().to_string());
        state.bootstrap = Some(DeploymentCommand::bootstrap(self.zone.clone(), command.full.clone()));
        self.ack(command.checksum())
    }

    /// Ask the controller or a zone peer for the current state and apply it
    ///
    /// Returns whether an update was applied.
    #[instrument(skip(self, transport), fields(runtime = %self.runtime_name))]
    pub async fn request_update(&self, transport: &dyn Transport) -> Result<bool, ProtocolError> {
        let request = RuntimeUpdateCommand {
            runtime_name: self.runtime_name.clone(),
            zone: self.zone.clone(),
            checksum: self.checksum().await,
        };

        let response = match transport.request(ProtocolRequest::RuntimeUpdate(request)).await? {
            ProtocolResponse::RuntimeUpdate(response) => response,
            other => return Err(ProtocolError::UnexpectedResponse(format!("{other:?}"))),
        };
        if !response.updated {
            debug!("Up to date");
            return Ok(false);
        }
        let command = response
            .command
            .ok_or_else(|| ProtocolError::UnexpectedResponse("update without a command".into()))?;

        let outcome = self.apply(command).await;
        transport.request(ProtocolRequest::Applied(outcome.clone())).await?;
        match outcome {
            DeploymentResponse::Ack { .. } => Ok(true),
            DeploymentResponse::Nack { runtime, reason } => Err(ProtocolError::Rejected { runtime, reason }),
        }
    }

    /// Answer a peer's update request from the last full unit applied
    pub async fn handle_update(&self, command: &RuntimeUpdateCommand) -> RuntimeUpdateResponse {
        let state = self.state.lock().await;
        if command.zone != self.zone || state.checksum == command.checksum {
            return RuntimeUpdateResponse::not_updated();
        }
        match &state.bootstrap {
            Some(bootstrap) => RuntimeUpdateResponse::updated(bootstrap.clone()),
            None => RuntimeUpdateResponse::not_updated(),
        }
    }

    fn ack(&self, checksum: &str) -> DeploymentResponse {
        DeploymentResponse::Ack {
            runtime: self.runtime_name.clone(),
            checksum: checksum.to_string(),
        }
    }

    fn nack(&self, reason: String) -> DeploymentResponse {
        DeploymentResponse::Nack {
            runtime: self.runtime_name.clone(),
            reason,
        }
    }
}

#[async_trait]
impl ProtocolHandler for Participant {
    async fn handle(&self, request: ProtocolRequest) -> ProtocolResponse {
        match request {
            ProtocolRequest::Deploy(command) => ProtocolResponse::Deployment(self.apply(command).await),
            ProtocolRequest::RuntimeUpdate(command) => {
                ProtocolResponse::RuntimeUpdate(self.handle_update(&command).await)
            }
            ProtocolRequest::Applied(_) => ProtocolResponse::Received,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::controller::{DeploymentController, ParticipantStatus};
    use crate::executor::InMemoryRuntime;
    use crate::transport::ChannelTransport;
    use crate::unit::DeploymentUnit;
    use fabric_types::{Contribution, ContributionUri};
    use std::sync::Arc;
    use std::time::Duration;

    fn zone() -> ZoneName {
        ZoneName::from("zone1")
    }

    fn provision(uri: &str) -> DeploymentUnit {
        DeploymentUnit::from_commands(vec![Command::ProvisionContribution(Contribution::new(uri))])
    }

    fn participant(name: &str) -> (Participant, InMemoryRuntime) {
        let runtime = InMemoryRuntime::new();
        (Participant::new(name, zone(), runtime.executor()), runtime)
    }

    #[tokio::test]
    async fn test_incremental_then_redelivery() {
        let controller = DeploymentController::new();
        let (vm1, runtime) = participant("vm1");

        let first = controller.publish(&zone(), &provision("a"), &provision("a")).unwrap().unwrap();
        assert!(vm1.apply(first.clone()).await.is_ack());

        let mut full = provision("a");
        full.append(&provision("b"));
        let second = controller.publish(&zone(), &provision("b"), &full).unwrap().unwrap();
        assert!(vm1.apply(second.clone()).await.is_ack());
        assert!(vm1.apply(second.clone()).await.is_ack());

        assert_eq!(vm1.checksum().await.as_deref(), Some(second.checksum()));
        assert!(runtime.components.is_provisioned(&ContributionUri::new("a")));
        assert!(runtime.components.is_provisioned(&ContributionUri::new("b")));
    }

    #[tokio::test]
    async fn test_missed_base_applies_full_unit() {
        let controller = DeploymentController::new();
        let (vm1, runtime) = participant("vm1");

        controller.publish(&zone(), &provision("a"), &provision("a")).unwrap();
        let mut full = provision("a");
        full.append(&provision("b"));
        let second = controller.publish(&zone(), &provision("b"), &full).unwrap().unwrap();

        // vm1 never saw the first command
        assert!(vm1.apply(second).await.is_ack());
        assert!(runtime.components.is_provisioned(&ContributionUri::new("a")));
    }

    #[tokio::test]
    async fn test_corrupted_unit_rejected() {
        let (vm1, _) = participant("vm1");
        let mut command = DeploymentCommand::bootstrap(zone(), provision("a").serialize().unwrap());
        command.full.corrupt();

        let response = vm1.apply(command).await;
        assert!(matches!(response, DeploymentResponse::Nack { .. }));
        assert_eq!(vm1.checksum().await, None);
    }

    #[tokio::test]
    async fn test_wrong_zone_rejected() {
        let (vm1, _) = participant("vm1");
        let command = DeploymentCommand::bootstrap(ZoneName::from("zone2"), provision("a").serialize().unwrap());
        assert!(!vm1.apply(command).await.is_ack());
    }

    #[tokio::test]
    async fn test_catch_up_from_controller() {
        let controller = Arc::new(DeploymentController::new());
        controller.publish(&zone(), &provision("a"), &provision("a")).unwrap();
        let (transport, _task) = ChannelTransport::spawn(controller.clone(), 8, Duration::from_secs(1));

        let (vm1, runtime) = participant("vm1");
        assert!(vm1.request_update(&transport).await.unwrap());
        assert!(runtime.components.is_provisioned(&ContributionUri::new("a")));
        assert_eq!(controller.participant_status("vm1"), ParticipantStatus::UpToDate);

        assert!(!vm1.request_update(&transport).await.unwrap());
    }

    #[tokio::test]
    async fn test_catch_up_from_peer() {
        let controller = DeploymentController::new();
        let command = controller.publish(&zone(), &provision("a"), &provision("a")).unwrap().unwrap();

        let (leader, _) = participant("leader");
        let leader = Arc::new(leader);
        let (transport, _task) = ChannelTransport::spawn(leader.clone(), 8, Duration::from_secs(1));

        // a peer with nothing applied has nothing to offer
        let (vm2, runtime) = participant("vm2");
        assert!(!vm2.request_update(&transport).await.unwrap());

        leader.apply(command).await;
        assert!(vm2.request_update(&transport).await.unwrap());
        assert!(runtime.components.is_provisioned(&ContributionUri::new("a")));
        assert_eq!(vm2.checksum().await, leader.checksum().await);
    }
}

//! Deployment controller
//!
//! The controller holds the authoritative deployment state of every zone: the
//! latest full unit plus the increments that led to it, each keyed by the
//! checksum it was applied on top of. A participant reporting a historical
//! checksum receives exactly the increments it missed; any other checksum
//! receives the full unit.

use crate::error::{ProtocolError, Result};
use crate::protocol::{
    DeploymentCommand, DeploymentResponse, ProtocolHandler, ProtocolRequest, ProtocolResponse,
    RuntimeUpdateCommand, RuntimeUpdateResponse, Transport,
};
use crate::unit::{DeploymentUnit, SerializedDeploymentUnit};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fabric_types::ZoneName;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Default number of increments retained per zone
pub const DEFAULT_HISTORY_LIMIT: usize = 64;

/// Participant state as seen by the controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticipantStatus {
    #[default]
    Unknown,
    RequestingUpdate,
    UpToDate,
    Stale,
}

struct Increment {
    base: String,
    unit: DeploymentUnit,
}

struct ZoneHistory {
    full: SerializedDeploymentUnit,
    increments: Vec<Increment>,
}

struct ParticipantRecord {
    zone: ZoneName,
    status: ParticipantStatus,
    checksum: Option<String>,
    transport: Option<Arc<dyn Transport>>,
    last_seen: DateTime<Utc>,
}

impl ParticipantRecord {
    fn new(zone: ZoneName) -> Self {
        Self {
            zone,
            status: ParticipantStatus::Unknown,
            checksum: None,
            transport: None,
            last_seen: Utc::now(),
        }
    }
}

/// Result of pushing a command to one participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub runtime: String,
    pub outcome: std::result::Result<DeploymentResponse, ProtocolError>,
}

pub struct DeploymentController {
    zones: DashMap<ZoneName, ZoneHistory>,
    participants: DashMap<String, ParticipantRecord>,
    history_limit: usize,
}

impl DeploymentController {
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(history_limit: usize) -> Self {
        Self {
            zones: DashMap::new(),
            participants: DashMap::new(),
            history_limit,
        }
    }

    /// Current deployment-state checksum of a zone
    pub fn zone_checksum(&self, zone: &ZoneName) -> Option<String> {
        self.zones.get(zone).map(|h| h.full.checksum().to_string())
    }

    pub fn zones(&self) -> Vec<ZoneName> {
        self.zones.iter().map(|z| z.key().clone()).collect()
    }

    /// Record a new zone state and build the command announcing it
    ///
    /// Returns `None` when the zone is already in that state.
    #[instrument(skip(self, increment, full), fields(zone = %zone, commands = increment.len()))]
    pub fn publish(
        &self,
        zone: &ZoneName,
        increment: &DeploymentUnit,
        full: &DeploymentUnit,
    ) -> Result<Option<DeploymentCommand>> {
        let full = full.serialize()?;
        let current = increment.serialize()?;

        let base = match self.zones.get_mut(zone) {
            Some(mut history) => {
                if history.full.checksum() == full.checksum() && increment.is_empty() {
                    debug!("Zone unchanged");
                    return Ok(None);
                }
                let base = history.full.checksum().to_string();
                history.increments.push(Increment {
                    base: base.clone(),
                    unit: increment.clone(),
                });
                let overflow = history.increments.len().saturating_sub(self.history_limit);
                history.increments.drain(..overflow);
                history.full = full.clone();
                Some(base)
            }
            None => {
                self.zones.insert(
                    zone.clone(),
                    ZoneHistory {
                        full: full.clone(),
                        increments: Vec::new(),
                    },
                );
                None
            }
        };

        info!(checksum = %full.checksum(), "Published zone state");
        Ok(Some(DeploymentCommand {
            zone: zone.clone(),
            base_checksum: base,
            current,
            full,
        }))
    }

    /// Command bringing a runtime at `checksum` up to the zone's state, or
    /// `None` when it is already current
    pub fn command_for(
        &self,
        zone: &ZoneName,
        checksum: Option<&str>,
    ) -> Result<Option<DeploymentCommand>> {
        let Some(history) = self.zones.get(zone) else {
            if checksum.is_none() {
                return Ok(None);
            }
            // nothing deployed: the runtime resets to the empty state
            let empty = DeploymentUnit::new().serialize()?;
            return Ok(Some(DeploymentCommand::bootstrap(zone.clone(), empty)));
        };
        if checksum == Some(history.full.checksum()) {
            return Ok(None);
        }

        // a zone may return to an earlier state, so start from its latest visit
        let missed = checksum.and_then(|c| history.increments.iter().rposition(|i| i.base == c));
        match missed {
            Some(start) => {
                let mut current = DeploymentUnit::new();
                for increment in &history.increments[start..] {
                    current.append(&increment.unit);
                }
                Ok(Some(DeploymentCommand {
                    zone: zone.clone(),
                    base_checksum: checksum.map(str::to_string),
                    current: current.serialize()?,
                    full: history.full.clone(),
                }))
            }
            None => Ok(Some(DeploymentCommand::bootstrap(zone.clone(), history.full.clone()))),
        }
    }

    /// Answer a participant's update request
    #[instrument(skip(self, command), fields(runtime = %command.runtime_name, zone = %command.zone))]
    pub fn handle_update(&self, command: &RuntimeUpdateCommand) -> Result<RuntimeUpdateResponse> {
        self.set_status(
            &command.runtime_name,
            &command.zone,
            ParticipantStatus::RequestingUpdate,
            command.checksum.clone(),
        );

        let response = match self.command_for(&command.zone, command.checksum.as_deref())? {
            None => {
                self.set_status(
                    &command.runtime_name,
                    &command.zone,
                    ParticipantStatus::UpToDate,
                    command.checksum.clone(),
                );
                RuntimeUpdateResponse::not_updated()
            }
            Some(deployment) => {
                debug!(incremental = deployment.base_checksum.is_some(), "Participant is stale");
                self.set_status(
                    &command.runtime_name,
                    &command.zone,
                    ParticipantStatus::Stale,
                    command.checksum.clone(),
                );
                RuntimeUpdateResponse::updated(deployment)
            }
        };
        Ok(response)
    }

    /// Record the outcome a participant reported for a command
    pub fn record_response(&self, response: &DeploymentResponse) {
        let Some(mut record) = self.participants.get_mut(response.runtime()) else {
            warn!(runtime = response.runtime(), "Response from unknown participant");
            return;
        };
        let current = self.zone_checksum(&record.zone);
        match response {
            DeploymentResponse::Ack { checksum, .. } => {
                record.status = if current.as_deref() == Some(checksum.as_str()) {
                    ParticipantStatus::UpToDate
                } else {
                    ParticipantStatus::Stale
                };
                record.checksum = Some(checksum.clone());
            }
            DeploymentResponse::Nack { reason, .. } => {
                warn!(runtime = response.runtime(), %reason, "Participant rejected deployment");
                record.status = ParticipantStatus::Stale;
            }
        }
        record.last_seen = Utc::now();
    }

    /// Register a participant the controller pushes deployments to
    pub fn register_participant(
        &self,
        runtime: impl Into<String>,
        zone: ZoneName,
        transport: Arc<dyn Transport>,
    ) {
        let runtime = runtime.into();
        info!(runtime = %runtime, zone = %zone, "Registered participant");
        let mut record = self
            .participants
            .entry(runtime)
            .or_insert_with(|| ParticipantRecord::new(zone.clone()));
        record.zone = zone;
        record.transport = Some(transport);
    }

    pub fn participant_status(&self, runtime: &str) -> ParticipantStatus {
        self.participants
            .get(runtime)
            .map(|r| r.status)
            .unwrap_or_default()
    }

    /// Checksum a participant last reported
    pub fn participant_checksum(&self, runtime: &str) -> Option<String> {
        self.participants.get(runtime).and_then(|r| r.checksum.clone())
    }

    pub fn last_seen(&self, runtime: &str) -> Option<DateTime<Utc>> {
        self.participants.get(runtime).map(|r| r.last_seen)
    }

    /// Push a command to every registered participant of its zone
    #[instrument(skip(self, command), fields(zone = %command.zone))]
    pub async fn distribute(&self, command: &DeploymentCommand) -> Vec<Delivery> {
        // collected first: no map guard may be held across an await
        let targets: Vec<(String, Arc<dyn Transport>)> = self
            .participants
            .iter()
            .filter(|r| r.zone == command.zone)
            .filter_map(|r| r.transport.clone().map(|t| (r.key().clone(), t)))
            .collect();

        let mut deliveries = Vec::with_capacity(targets.len());
        for (runtime, transport) in targets {
            let outcome = match transport.request(ProtocolRequest::Deploy(command.clone())).await {
                Ok(ProtocolResponse::Deployment(response)) => {
                    self.record_response(&response);
                    Ok(response)
                }
                Ok(other) => Err(ProtocolError::UnexpectedResponse(format!("{other:?}"))),
                Err(e) => Err(e),
            };
            if let Err(e) = &outcome {
                warn!(runtime = %runtime, error = %e, "Delivery failed");
                self.set_status(&runtime, &command.zone, ParticipantStatus::Stale, None);
            }
            deliveries.push(Delivery { runtime, outcome });
        }
        deliveries
    }

    fn set_status(
        &self,
        runtime: &str,
        zone: &ZoneName,
        status: ParticipantStatus,
        checksum: Option<String>,
    ) {
        let mut record = self
            .participants
            .entry(runtime.to_string())
            .or_insert_with(|| ParticipantRecord::new(zone.clone()));
        record.status = status;
        if checksum.is_some() {
            record.checksum = checksum;
        }
        record.last_seen = Utc::now();
    }
}

impl Default for DeploymentController {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProtocolHandler for DeploymentController {
    async fn handle(&self, request: ProtocolRequest) -> ProtocolResponse {
        match request {
            ProtocolRequest::RuntimeUpdate(command) => match self.handle_update(&command) {
                Ok(response) => ProtocolResponse::RuntimeUpdate(response),
                Err(e) => ProtocolResponse::Failed(e.to_string()),
            },
            ProtocolRequest::Applied(response) => {
                self.record_response(&response);
                ProtocolResponse::Received
            }
            ProtocolRequest::Deploy(command) => ProtocolResponse::Failed(format!(
                "controller does not apply deployments (zone {})",
                command.zone
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use fabric_types::Contribution;
    use proptest::prelude::*;

    fn provision(uri: &str) -> DeploymentUnit {
        DeploymentUnit::from_commands(vec![Command::ProvisionContribution(Contribution::new(uri))])
    }

    fn zone() -> ZoneName {
        ZoneName::from("zone1")
    }

    fn update(checksum: Option<String>) -> RuntimeUpdateCommand {
        RuntimeUpdateCommand {
            runtime_name: "vm1".into(),
            zone: zone(),
            checksum,
        }
    }

    /// Two deployments: `a`, then `b` on top of it
    fn controller() -> (DeploymentController, String, String) {
        let controller = DeploymentController::new();
        let first = controller
            .publish(&zone(), &provision("a"), &provision("a"))
            .unwrap()
            .unwrap();
        let mut full = provision("a");
        full.append(&provision("b"));
        let second = controller.publish(&zone(), &provision("b"), &full).unwrap().unwrap();
        assert_eq!(second.base_checksum.as_deref(), Some(first.checksum()));
        (controller, first.checksum().to_string(), second.checksum().to_string())
    }

    #[test]
    fn test_current_checksum_not_updated() {
        let (controller, _, current) = controller();
        let response = controller.handle_update(&update(Some(current))).unwrap();

        assert!(!response.updated);
        assert!(response.command.is_none());
        assert_eq!(controller.participant_status("vm1"), ParticipantStatus::UpToDate);
    }

    #[test]
    fn test_historical_checksum_gets_missed_increments() {
        let (controller, first, current) = controller();
        let response = controller.handle_update(&update(Some(first.clone()))).unwrap();

        assert!(response.updated);
        let command = response.command.unwrap();
        assert_eq!(command.base_checksum, Some(first));
        assert_eq!(command.checksum(), current);
        assert_eq!(command.current.deserialize().unwrap(), provision("b"));
        assert_eq!(controller.participant_status("vm1"), ParticipantStatus::Stale);
    }

    #[test]
    fn test_revisited_checksum_gets_only_later_increments() {
        let (controller, first, _) = controller();
        // undo b, returning the zone to the first state, then add c
        let undo = DeploymentUnit::from_commands(vec![Command::UnprovisionContribution("b".into())]);
        let back = controller.publish(&zone(), &undo, &provision("a")).unwrap().unwrap();
        assert_eq!(back.checksum(), first);
        let mut full = provision("a");
        full.append(&provision("c"));
        let latest = controller.publish(&zone(), &provision("c"), &full).unwrap().unwrap();

        let command = controller.command_for(&zone(), Some(first.as_str())).unwrap().unwrap();
        assert_eq!(command.base_checksum, Some(first));
        assert_eq!(command.current.deserialize().unwrap(), provision("c"));
        assert_eq!(command.checksum(), latest.checksum());
    }

    #[test]
    fn test_unknown_checksum_gets_full_unit() {
        let (controller, _, current) = controller();
        for checksum in [None, Some("bogus".to_string())] {
            let command = controller.handle_update(&update(checksum)).unwrap().command.unwrap();
            assert_eq!(command.base_checksum, None);
            assert_eq!(command.current, command.full);
            assert_eq!(command.checksum(), current);
        }
    }

    #[test]
    fn test_unchanged_zone_not_republished() {
        let (controller, _, _) = controller();
        let mut full = provision("a");
        full.append(&provision("b"));
        assert!(controller
            .publish(&zone(), &DeploymentUnit::new(), &full)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_history_limit_falls_back_to_full() {
        let controller = DeploymentController::with_history_limit(1);
        let first = controller.publish(&zone(), &provision("a"), &provision("a")).unwrap().unwrap();
        controller.publish(&zone(), &provision("b"), &provision("b")).unwrap();
        let third = controller.publish(&zone(), &provision("c"), &provision("c")).unwrap().unwrap();

        let command = controller
            .command_for(&zone(), Some(first.checksum()))
            .unwrap()
            .unwrap();
        assert_eq!(command.base_checksum, None);
        assert_eq!(command.checksum(), third.checksum());
    }

    #[test]
    fn test_ack_marks_up_to_date() {
        let (controller, first, current) = controller();
        controller.handle_update(&update(Some(first))).unwrap();
        assert_eq!(controller.participant_status("vm1"), ParticipantStatus::Stale);

        controller.record_response(&DeploymentResponse::Ack {
            runtime: "vm1".into(),
            checksum: current,
        });
        assert_eq!(controller.participant_status("vm1"), ParticipantStatus::UpToDate);
        assert_eq!(controller.participant_status("vm2"), ParticipantStatus::Unknown);
    }

    #[test]
    fn test_empty_zone() {
        let controller = DeploymentController::new();
        let other = ZoneName::from("zone9");
        assert!(controller.command_for(&other, None).unwrap().is_none());

        let command = controller.command_for(&other, Some("stale")).unwrap().unwrap();
        assert!(command.full.deserialize().unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn prop_checksum_round_trip(names in prop::collection::vec("[a-z]{1,6}", 1..6), probe in "[a-f0-9]{8}") {
            let controller = DeploymentController::new();
            let mut full = DeploymentUnit::new();
            for name in &names {
                let increment = provision(name);
                full.append(&increment);
                controller.publish(&zone(), &increment, &full).unwrap();
            }
            let current = controller.zone_checksum(&zone());

            let matched = controller.handle_update(&update(current)).unwrap();
            prop_assert!(!matched.updated);
            prop_assert!(matched.command.is_none());

            let mismatched = controller.handle_update(&update(Some(probe))).unwrap();
            prop_assert!(mismatched.updated);
            prop_assert!(mismatched.command.is_some());
        }
    }
}

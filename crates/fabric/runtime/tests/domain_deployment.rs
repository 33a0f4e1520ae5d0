//! Deploys through the domain facade to in-memory zone participants

use fabric_binding::{BindingProvider, BindingSelectionError, ZeroMqBindingProvider};
use fabric_deployment::{
    ChannelTransport, InMemoryMetaDataStore, InMemoryRuntime, MetaDataStore, Participant,
    ParticipantStatus,
};
use fabric_logical::{ChannelDefinition, ComponentDefinition, LogicalDomain, ModelError, ValidationError};
use fabric_runtime::{Domain, DomainError, DomainServices, RuntimeConfig};
use fabric_types::{
    Contribution, ContributionUri, ImplementationKind, LogicalState, Multiplicity, Operation, ServiceContract,
    Uri, ZoneName,
};
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(2);

fn store() -> Arc<dyn MetaDataStore> {
    Arc::new(
        InMemoryMetaDataStore::new()
            .with(Contribution::new("api"))
            .with(Contribution::new("app").with_wire("org.acme.api", "api")),
    )
}

fn domain() -> Domain {
    Domain::new(&RuntimeConfig::default(), DomainServices::standard(store())).unwrap()
}

fn contract() -> ServiceContract {
    ServiceContract::java("org.acme.Greeter")
        .with_operation(Operation::new("greet").with_input("java.lang.String"))
}

fn java(zone: &str) -> ComponentDefinition {
    ComponentDefinition::new(ImplementationKind::Java, "app").in_zone(zone)
}

/// client(zone1) -> server(zone2)
fn client_server(domain: &mut LogicalDomain) -> Result<(), ModelError> {
    let root = domain.root();
    let client = domain.add_component(root, "client", java("zone1"))?;
    let server = domain.add_component(root, "server", java("zone2"))?;
    let reference = domain.add_reference(client, "greeter", contract(), Multiplicity::OneOne)?;
    let service = domain.add_service(server, "Greeter", contract())?;
    domain.add_wire(root, reference, service)?;
    Ok(())
}

/// Start a participant for `zone` and register it with the domain
fn join(domain: &Domain, name: &str, zone: &str) -> (Arc<Participant>, InMemoryRuntime) {
    let runtime = InMemoryRuntime::new();
    let participant = Arc::new(Participant::new(name, ZoneName::from(zone), runtime.executor()));
    let (transport, _task) = ChannelTransport::spawn(participant.clone(), 8, TIMEOUT);
    domain.register_participant(name, ZoneName::from(zone), Arc::new(transport));
    (participant, runtime)
}

fn uri(value: &str) -> Uri {
    Uri::from(value)
}

#[tokio::test]
async fn test_remote_wire_deployed_to_both_zones() {
    let domain = domain();
    let (vm1, zone1) = join(&domain, "vm1", "zone1");
    let (vm2, zone2) = join(&domain, "vm2", "zone2");

    let report = domain.deploy(client_server).await.unwrap();

    let zones: Vec<&str> = report.zones.iter().map(ZoneName::as_str).collect();
    assert_eq!(zones, vec!["zone1", "zone2"]);
    assert_eq!(report.deliveries.len(), 2);
    assert!(report.all_acknowledged());

    assert!(zone1.components.is_running(&uri("fabric3://domain/client")));
    assert!(zone2.components.is_running(&uri("fabric3://domain/server")));
    assert!(zone2.components.is_provisioned(&ContributionUri::new("api")));
    assert_eq!(zone1.wires.live_wires(), 1);
    assert_eq!(zone2.wires.live_wires(), 1);

    let controller = domain.controller();
    assert_eq!(vm1.checksum().await, controller.zone_checksum(&ZoneName::from("zone1")));
    assert_eq!(vm2.checksum().await, controller.zone_checksum(&ZoneName::from("zone2")));
    assert_eq!(controller.participant_status("vm1"), ParticipantStatus::UpToDate);

    // selection assigned a binding and the wire is now provisioned
    domain
        .inspect(|logical| {
            let wire = logical.wires().next().unwrap();
            assert!(wire.is_bound());
            assert_eq!(wire.state, LogicalState::Provisioned);
        })
        .await;
}

#[tokio::test]
async fn test_second_deployment_is_incremental() {
    let domain = domain();
    let (_vm1, zone1) = join(&domain, "vm1", "zone1");
    let (_vm2, zone2) = join(&domain, "vm2", "zone2");
    domain.deploy(client_server).await.unwrap();

    let report = domain
        .deploy(|logical| {
            let root = logical.root();
            logical.add_component(root, "audit", java("zone2"))?;
            Ok(())
        })
        .await
        .unwrap();

    // zone1 is unchanged and receives nothing
    let zones: Vec<&str> = report.zones.iter().map(ZoneName::as_str).collect();
    assert_eq!(zones, vec!["zone2"]);
    assert_eq!(report.deliveries.len(), 1);
    assert!(report.all_acknowledged());
    assert!(zone2.components.is_running(&uri("fabric3://domain/audit")));
    assert_eq!(zone2.components.component_count(), 2);
    assert_eq!(zone1.components.component_count(), 1);
}

#[tokio::test]
async fn test_undeploy_removes_component_and_wire() {
    let domain = domain();
    let (_vm1, zone1) = join(&domain, "vm1", "zone1");
    let (_vm2, zone2) = join(&domain, "vm2", "zone2");
    domain.deploy(client_server).await.unwrap();

    let report = domain.undeploy(&uri("fabric3://domain/server")).await.unwrap();
    assert!(report.all_acknowledged());

    assert!(!zone2.components.is_running(&uri("fabric3://domain/server")));
    assert_eq!(zone2.components.component_count(), 0);
    assert!(!zone2.components.is_provisioned(&ContributionUri::new("app")));
    assert_eq!(zone2.wires.live_wires(), 0);

    // the client stays, detached from the removed service
    assert!(zone1.components.is_running(&uri("fabric3://domain/client")));
    assert_eq!(zone1.wires.live_wires(), 0);

    let missing = domain.undeploy(&uri("fabric3://domain/server")).await;
    assert!(matches!(missing, Err(DomainError::ComponentNotFound(_))));
}

#[tokio::test]
async fn test_consumer_in_second_zone_joins_deployed_channel() {
    let domain = domain();
    let (_vm1, zone1) = join(&domain, "vm1", "zone1");
    let (_vm2, zone2) = join(&domain, "vm2", "zone2");
    let orders = uri("fabric3://domain/orders");

    domain
        .deploy(|logical| {
            let root = logical.root();
            logical.add_channel(root, "orders", ChannelDefinition::in_zone("zone1"))?;
            let publisher = logical.add_component(root, "publisher", java("zone1"))?;
            logical.add_producer(publisher, "orders", vec!["Order".into()], vec![uri("fabric3://domain/orders")])?;
            Ok(())
        })
        .await
        .unwrap();
    assert!(zone1.components.has_channel(&orders));
    assert_eq!(zone1.channels.live_connections(), 1);
    domain
        .inspect(|logical| assert!(logical.channels().all(|c| !c.is_bound())))
        .await;

    let report = domain
        .deploy(|logical| {
            let root = logical.root();
            let subscriber = logical.add_component(root, "subscriber", java("zone2"))?;
            logical.add_consumer(subscriber, "onOrder", vec!["Order".into()], vec![uri("fabric3://domain/orders")])?;
            Ok(())
        })
        .await
        .unwrap();

    // zone1 gains the bridge onto the new binding, zone2 the replica and its subscriber
    let zones: Vec<&str> = report.zones.iter().map(ZoneName::as_str).collect();
    assert_eq!(zones, vec!["zone1", "zone2"]);
    assert!(report.all_acknowledged());
    assert_eq!(zone1.channels.live_connections(), 2);
    assert!(zone2.components.has_channel(&orders));
    assert!(zone2.components.is_running(&uri("fabric3://domain/subscriber")));
    assert_eq!(zone2.channels.live_connections(), 2);
    domain
        .inspect(|logical| assert!(logical.channels().all(|c| c.is_bound())))
        .await;
}

#[tokio::test]
async fn test_fanned_out_promotion_wires_each_leaf_by_zone() {
    let domain = domain();
    let (_vm1, zone1) = join(&domain, "vm1", "zone1");
    let (_vm2, zone2) = join(&domain, "vm2", "zone2");

    let report = domain
        .deploy(|logical| {
            let root = logical.root();
            let composite = logical.add_component(root, "comp", ComponentDefinition::composite("app"))?;
            let a = logical.add_component(composite, "a", java("zone1"))?;
            let b = logical.add_component(composite, "b", java("zone2"))?;
            let server = logical.add_component(root, "server", java("zone1"))?;
            logical.add_reference(a, "r", contract(), Multiplicity::OneOne)?;
            logical.add_reference(b, "r", contract(), Multiplicity::OneOne)?;
            let promoted = logical.add_reference(composite, "r", contract(), Multiplicity::OneN)?;
            logical.promote_reference(
                promoted,
                vec![uri("fabric3://domain/comp/a#r"), uri("fabric3://domain/comp/b#r")],
            );
            let service = logical.add_service(server, "G", contract())?;
            logical.add_wire(root, promoted, service)?;
            Ok(())
        })
        .await
        .unwrap();
    assert!(report.all_acknowledged());

    // a is wired directly, b reaches the server through the binding
    assert_eq!(zone1.wires.live_wires(), 2);
    assert_eq!(zone2.wires.live_wires(), 1);
    assert!(zone2.components.is_running(&uri("fabric3://domain/comp/b")));
    domain
        .inspect(|logical| assert!(logical.wires().all(|wire| wire.is_bound())))
        .await;
}

#[tokio::test]
async fn test_ambiguous_promotion_rejected_without_changes() {
    let domain = domain();
    let result = domain
        .deploy(|logical| {
            let root = logical.root();
            let composite =
                logical.add_component(root, "composite", ComponentDefinition::composite("app"))?;
            let target = logical.add_component(composite, "target", java("zone1"))?;
            logical.add_service(target, "A", contract())?;
            logical.add_service(target, "B", contract())?;
            let promoted = logical.add_service(composite, "promoted", contract())?;
            logical.promote_service(promoted, uri("fabric3://domain/composite/target"));
            Ok(())
        })
        .await;

    let Err(DomainError::Validation(report)) = result else {
        panic!("expected a validation report");
    };
    assert_eq!(report.total(), 1);
    let errors = report.for_artifact(&uri("fabric3://domain/composite#promoted"));
    assert!(matches!(errors, [ValidationError::AmbiguousService { .. }]));

    domain
        .inspect(|logical| assert!(logical.find_component(&uri("fabric3://domain/composite")).is_none()))
        .await;
}

#[tokio::test]
async fn test_no_binding_provider_available() {
    let zeromq = Arc::new(ZeroMqBindingProvider::default());
    zeromq.set_enabled(false);
    let provider: Arc<dyn BindingProvider> = zeromq;
    let services = DomainServices {
        providers: vec![provider],
        ..DomainServices::standard(store())
    };
    let domain = Domain::new(&RuntimeConfig::default(), services).unwrap();

    let result = domain.deploy(client_server).await;
    assert!(matches!(
        result,
        Err(DomainError::BindingSelection(BindingSelectionError::NoScaBindingProvider { attempted, .. }))
            if attempted.len() == 1
    ));
    domain.inspect(|logical| assert_eq!(logical.wires().count(), 0)).await;
}

#[tokio::test]
async fn test_late_participant_catches_up() {
    let domain = domain();
    let (_vm1, _) = join(&domain, "vm1", "zone1");
    domain.deploy(client_server).await.unwrap();

    // vm2 was not registered when zone2 was deployed
    let runtime = InMemoryRuntime::new();
    let vm2 = Participant::new("vm2", ZoneName::from("zone2"), runtime.executor());
    let (controller, _task) = ChannelTransport::spawn(domain.controller(), 8, TIMEOUT);

    assert!(vm2.request_update(&controller).await.unwrap());
    assert!(runtime.components.is_running(&uri("fabric3://domain/server")));
    assert_eq!(domain.controller().participant_status("vm2"), ParticipantStatus::UpToDate);
    assert!(!vm2.request_update(&controller).await.unwrap());
}

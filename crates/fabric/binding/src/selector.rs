//! Binding selection over a logical domain

use crate::config::BindingConfig;
use crate::error::{BindingConfigError, BindingSelectionError, Result};
use crate::provider::BindingProvider;
use fabric_logical::{ChannelId, LogicalDomain, ServiceId, WireId};
use fabric_types::{BindingKind, LogicalState, QName};
use std::sync::Arc;
use tracing::{debug, instrument, trace, warn};

/// Chooses bindings for remote wires, callback services and distributed channels
pub struct BindingSelector {
    providers: Vec<Arc<dyn BindingProvider>>,
}

impl BindingSelector {
    /// Order `providers` by the configured priority list. Unlisted providers
    /// keep their registration order after the listed ones.
    pub fn new(
        providers: Vec<Arc<dyn BindingProvider>>,
        config: &BindingConfig,
    ) -> std::result::Result<Self, BindingConfigError> {
        let mut remaining = providers;
        let mut ordered: Vec<Arc<dyn BindingProvider>> = Vec::with_capacity(remaining.len());

        for name in &config.priority {
            let qname = QName::parse(name)?;
            let kind = BindingKind::from_qname(&qname);
            let position = kind.and_then(|kind| {
                remaining
                    .iter()
                    .position(|provider| provider.binding_type() == kind)
            });
            match position {
                Some(index) => ordered.push(remaining.remove(index)),
                None if ordered.iter().any(|p| Some(p.binding_type()) == kind) => {
                    trace!(binding = %qname, "Duplicate binding priority entry");
                }
                None if config.allow_unknown => {
                    warn!(binding = %qname, "Ignoring binding priority entry with no registered provider");
                }
                None => return Err(BindingConfigError::UnknownBindingType(qname)),
            }
        }
        ordered.extend(remaining);

        debug!(
            order = ?ordered.iter().map(|p| p.binding_type()).collect::<Vec<_>>(),
            "Binding provider order"
        );
        Ok(Self { providers: ordered })
    }

    /// Binding types in the order providers are consulted
    pub fn order(&self) -> Vec<BindingKind> {
        self.providers.iter().map(|p| p.binding_type()).collect()
    }

    /// Attach bindings to every new remote wire and distributed channel in the
    /// domain that does not already declare one
    #[instrument(skip_all, fields(domain = %domain.uri()))]
    pub fn select_bindings(&self, domain: &mut LogicalDomain) -> Result<()> {
        for wire in domain.wire_ids() {
            self.select_wire(domain, wire)?;
        }
        for channel in domain.channel_ids() {
            self.select_channel(domain, channel)?;
        }
        Ok(())
    }

    pub fn select_wire(&self, domain: &mut LogicalDomain, wire: WireId) -> Result<()> {
        let logical = domain.wire(wire);
        if logical.state != LogicalState::New {
            return Ok(());
        }
        // a fanned-out reference needs a binding as soon as one leaf is remote
        let (source_zones, target_zone) = domain.wire_zones(wire);
        if source_zones.iter().all(|zone| *zone == target_zone) {
            return Ok(());
        }
        let reference = domain.reference(logical.source);
        let service = domain.service(logical.target);
        if logical.is_bound() || reference.has_explicit_binding() || service.has_explicit_binding()
        {
            return Ok(());
        }
        let artifact = reference.uri.clone();
        let callback_service = reference.callback_service;

        let mut attempted = Vec::new();
        let mut chosen = None;
        for provider in &self.providers {
            let result = provider.can_bind_wire(domain, wire);
            if result.is_match() {
                chosen = Some(provider);
                break;
            }
            attempted.push(describe(result.binding(), result.reasons()));
        }

        let Some(provider) = chosen else {
            return Err(BindingSelectionError::NoScaBindingProvider {
                artifact,
                attempted,
            });
        };
        provider.bind_wire(domain, wire)?;
        debug!(wire = %artifact, binding = %provider.binding_type(), "Selected wire binding");

        if let Some(callback) = callback_service {
            self.select_callback(domain, callback)?;
        }
        Ok(())
    }

    /// Bind the callback service of a remote bidirectional wire
    fn select_callback(&self, domain: &mut LogicalDomain, service: ServiceId) -> Result<()> {
        if !domain.service(service).bindings.is_empty() {
            return Ok(());
        }

        let mut attempted = Vec::new();
        for provider in &self.providers {
            let result = provider.can_bind_service(domain, service);
            if result.is_match() {
                provider.bind_service(domain, service)?;
                debug!(service = %domain.service(service).uri, binding = %provider.binding_type(), "Selected callback binding");
                return Ok(());
            }
            attempted.push(describe(result.binding(), result.reasons()));
        }
        Err(BindingSelectionError::NoScaBindingProvider {
            artifact: domain.service(service).uri.clone(),
            attempted,
        })
    }

    pub fn select_channel(&self, domain: &mut LogicalDomain, channel: ChannelId) -> Result<()> {
        // a deployed channel still needs a binding once it spans a second zone
        let logical = domain.channel(channel);
        if logical.state == LogicalState::Marked || logical.is_bound() {
            return Ok(());
        }
        if domain.channel_zones(channel).len() < 2 {
            return Ok(());
        }

        let mut attempted = Vec::new();
        for provider in &self.providers {
            let result = provider.can_bind_channel(domain, channel);
            if result.is_match() {
                provider.bind_channel(domain, channel)?;
                debug!(channel = %domain.channel(channel).uri, binding = %provider.binding_type(), "Selected channel binding");
                return Ok(());
            }
            attempted.push(describe(result.binding(), result.reasons()));
        }
        Err(BindingSelectionError::NoScaBindingProvider {
            artifact: domain.channel(channel).uri.clone(),
            attempted,
        })
    }
}

fn describe(binding: &QName, reasons: &[String]) -> String {
    if reasons.is_empty() {
        binding.to_string()
    } else {
        format!("{}: {}", binding, reasons.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::BindingMatchResult;
    use fabric_logical::{ChannelDefinition, ComponentDefinition, LogicalBinding};
    use fabric_types::{ImplementationKind, Multiplicity, ServiceContract, Uri};
    use std::sync::Mutex;

    type Calls = Arc<Mutex<Vec<String>>>;

    struct RecordingProvider {
        kind: BindingKind,
        matches: bool,
        calls: Calls,
    }

    impl RecordingProvider {
        fn new(kind: BindingKind, matches: bool, calls: &Calls) -> Arc<dyn BindingProvider> {
            Arc::new(Self {
                kind,
                matches,
                calls: calls.clone(),
            })
        }

        fn record(&self, call: &str) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{:?}.{}", self.kind, call));
        }

        fn result(&self) -> BindingMatchResult {
            if self.matches {
                BindingMatchResult::matched(self.kind)
            } else {
                BindingMatchResult::no_match(self.kind, "declined")
            }
        }
    }

    impl BindingProvider for RecordingProvider {
        fn binding_type(&self) -> BindingKind {
            self.kind
        }

        fn can_bind_wire(&self, _domain: &LogicalDomain, _wire: WireId) -> BindingMatchResult {
            self.record("can_bind_wire");
            self.result()
        }

        fn can_bind_service(&self, _domain: &LogicalDomain, _service: ServiceId) -> BindingMatchResult {
            self.record("can_bind_service");
            self.result()
        }

        fn can_bind_channel(&self, _domain: &LogicalDomain, _channel: ChannelId) -> BindingMatchResult {
            self.record("can_bind_channel");
            self.result()
        }

        fn bind_wire(&self, domain: &mut LogicalDomain, wire: WireId) -> Result<()> {
            self.record("bind_wire");
            domain.bind_wire(
                wire,
                LogicalBinding::assigned(self.kind),
                LogicalBinding::assigned(self.kind),
            );
            Ok(())
        }

        fn bind_service(&self, domain: &mut LogicalDomain, service: ServiceId) -> Result<()> {
            self.record("bind_service");
            domain.bind_service(service, LogicalBinding::assigned(self.kind));
            Ok(())
        }

        fn bind_channel(&self, domain: &mut LogicalDomain, channel: ChannelId) -> Result<()> {
            self.record("bind_channel");
            domain.bind_channel(channel, LogicalBinding::assigned(self.kind));
            Ok(())
        }
    }

    fn wired_domain(source_zone: &str, target_zone: &str, contract: ServiceContract) -> (LogicalDomain, WireId) {
        let mut domain = LogicalDomain::new("fabric3://domain");
        let root = domain.root();
        let client = domain
            .add_component(
                root,
                "client",
                ComponentDefinition::new(ImplementationKind::Java, "app").in_zone(source_zone),
            )
            .unwrap();
        let server = domain
            .add_component(
                root,
                "server",
                ComponentDefinition::new(ImplementationKind::Java, "app").in_zone(target_zone),
            )
            .unwrap();
        let reference = domain
            .add_reference(client, "echo", contract.clone(), Multiplicity::OneOne)
            .unwrap();
        let service = domain.add_service(server, "echo", contract).unwrap();
        let wire = domain.add_wire(root, reference, service).unwrap();
        (domain, wire)
    }

    fn echo() -> ServiceContract {
        ServiceContract::java("org.acme.Echo")
    }

    #[test]
    fn test_local_wire_never_consults_providers() {
        let calls = Calls::default();
        let selector = BindingSelector::new(
            vec![RecordingProvider::new(BindingKind::ZeroMq, true, &calls)],
            &BindingConfig::default(),
        )
        .unwrap();
        let (mut domain, wire) = wired_domain("zone1", "zone1", echo());

        selector.select_bindings(&mut domain).unwrap();

        assert!(calls.lock().unwrap().is_empty());
        assert!(!domain.wire(wire).is_bound());
    }

    #[test]
    fn test_first_matching_provider_wins() {
        let calls = Calls::default();
        let selector = BindingSelector::new(
            vec![
                RecordingProvider::new(BindingKind::Jms, false, &calls),
                RecordingProvider::new(BindingKind::ZeroMq, true, &calls),
                RecordingProvider::new(BindingKind::Http, true, &calls),
            ],
            &BindingConfig::default(),
        )
        .unwrap();
        let (mut domain, wire) = wired_domain("zone1", "zone2", echo());

        selector.select_bindings(&mut domain).unwrap();

        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                "Jms.can_bind_wire".to_string(),
                "ZeroMq.can_bind_wire".to_string(),
                "ZeroMq.bind_wire".to_string(),
            ]
        );
        let bound = domain.wire(wire);
        assert_eq!(bound.source_binding.as_ref().map(|b| b.kind), Some(BindingKind::ZeroMq));
        assert_eq!(bound.target_binding.as_ref().map(|b| b.kind), Some(BindingKind::ZeroMq));
    }

    #[test]
    fn test_no_matching_provider_is_fatal_and_binds_nothing() {
        let calls = Calls::default();
        let selector = BindingSelector::new(
            vec![
                RecordingProvider::new(BindingKind::Jms, false, &calls),
                RecordingProvider::new(BindingKind::ZeroMq, false, &calls),
            ],
            &BindingConfig::default(),
        )
        .unwrap();
        let (mut domain, wire) = wired_domain("zone1", "zone2", echo());

        let error = selector.select_bindings(&mut domain).unwrap_err();
        match error {
            BindingSelectionError::NoScaBindingProvider { artifact, attempted } => {
                assert_eq!(artifact, Uri::new("fabric3://domain/client#echo"));
                assert_eq!(attempted.len(), 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let logical = domain.wire(wire);
        assert!(logical.source_binding.is_none() && logical.target_binding.is_none());
        assert!(domain.reference(logical.source).bindings.is_empty());
        assert!(domain.service(logical.target).bindings.is_empty());
    }

    #[test]
    fn test_explicit_binding_left_untouched() {
        let calls = Calls::default();
        let selector = BindingSelector::new(
            vec![RecordingProvider::new(BindingKind::ZeroMq, true, &calls)],
            &BindingConfig::default(),
        )
        .unwrap();
        let (mut domain, wire) = wired_domain("zone1", "zone2", echo());
        let service = domain.wire(wire).target;
        domain.add_service_binding(service, LogicalBinding::explicit(BindingKind::Ws));

        selector.select_bindings(&mut domain).unwrap();

        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(domain.service(service).bindings.len(), 1);
    }

    #[test]
    fn test_priority_reorders_providers() {
        let calls = Calls::default();
        let selector = BindingSelector::new(
            vec![
                RecordingProvider::new(BindingKind::Jms, true, &calls),
                RecordingProvider::new(BindingKind::Http, true, &calls),
                RecordingProvider::new(BindingKind::ZeroMq, true, &calls),
            ],
            &BindingConfig::with_priority(["{urn:fabric3.org}binding.zeromq"]),
        )
        .unwrap();

        assert_eq!(
            selector.order(),
            vec![BindingKind::ZeroMq, BindingKind::Jms, BindingKind::Http]
        );
    }

    #[test]
    fn test_unknown_priority_name_rejected_unless_allowed() {
        let calls = Calls::default();
        let providers = || vec![RecordingProvider::new(BindingKind::Jms, true, &calls)];

        let strict = BindingSelector::new(
            providers(),
            &BindingConfig::with_priority(["{urn:fabric3.org}binding.zeromq"]),
        );
        assert!(matches!(strict, Err(BindingConfigError::UnknownBindingType(_))));

        let invalid = BindingSelector::new(providers(), &BindingConfig::with_priority(["{broken"]));
        assert!(matches!(invalid, Err(BindingConfigError::InvalidName(_))));

        let mut lenient = BindingConfig::with_priority(["{urn:example}binding.carrier-pigeon"]);
        lenient.allow_unknown = true;
        let selector = BindingSelector::new(providers(), &lenient).unwrap();
        assert_eq!(selector.order(), vec![BindingKind::Jms]);
    }

    #[test]
    fn test_remote_bidirectional_wire_binds_callback_service() {
        let calls = Calls::default();
        let selector = BindingSelector::new(
            vec![RecordingProvider::new(BindingKind::ZeroMq, true, &calls)],
            &BindingConfig::default(),
        )
        .unwrap();
        let contract = echo().with_callback(ServiceContract::java("org.acme.EchoCallback"));
        let (mut domain, wire) = wired_domain("zone1", "zone2", contract);

        selector.select_bindings(&mut domain).unwrap();

        let reference = domain.reference(domain.wire(wire).source);
        let callback = reference.callback_service.unwrap();
        assert_eq!(domain.service(callback).bindings.len(), 1);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                "ZeroMq.can_bind_wire".to_string(),
                "ZeroMq.bind_wire".to_string(),
                "ZeroMq.can_bind_service".to_string(),
                "ZeroMq.bind_service".to_string(),
            ]
        );
    }

    #[test]
    fn test_distributed_channel_is_bound() {
        let calls = Calls::default();
        let selector = BindingSelector::new(
            vec![RecordingProvider::new(BindingKind::Jms, true, &calls)],
            &BindingConfig::default(),
        )
        .unwrap();
        let mut domain = LogicalDomain::new("fabric3://domain");
        let root = domain.root();
        let channel = domain
            .add_channel(root, "events", ChannelDefinition::in_zone("zone1"))
            .unwrap();
        let local_channel = domain
            .add_channel(root, "local", ChannelDefinition::in_zone("zone1"))
            .unwrap();
        let consumer = domain
            .add_component(
                root,
                "listener",
                ComponentDefinition::new(ImplementationKind::Java, "app").in_zone("zone2"),
            )
            .unwrap();
        domain
            .add_consumer(
                consumer,
                "onEvent",
                vec!["org.acme.Event".into()],
                vec![domain.channel(channel).uri.clone()],
            )
            .unwrap();

        selector.select_bindings(&mut domain).unwrap();

        assert!(domain.channel(channel).is_bound());
        assert!(!domain.channel(local_channel).is_bound());
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["Jms.can_bind_channel".to_string(), "Jms.bind_channel".to_string()]
        );
    }

    #[test]
    fn test_fanned_out_reference_bound_when_one_leaf_is_remote() {
        let calls = Calls::default();
        let selector = BindingSelector::new(
            vec![RecordingProvider::new(BindingKind::ZeroMq, true, &calls)],
            &BindingConfig::default(),
        )
        .unwrap();
        let mut domain = LogicalDomain::new("fabric3://domain");
        let root = domain.root();
        let java = |zone: &str| ComponentDefinition::new(ImplementationKind::Java, "app").in_zone(zone);
        let composite = domain
            .add_component(root, "comp", ComponentDefinition::composite("app"))
            .unwrap();
        let a = domain.add_component(composite, "a", java("zone1")).unwrap();
        let b = domain.add_component(composite, "b", java("zone2")).unwrap();
        let server = domain.add_component(root, "server", java("zone1")).unwrap();
        domain.add_reference(a, "r", echo(), Multiplicity::OneOne).unwrap();
        domain.add_reference(b, "r", echo(), Multiplicity::OneOne).unwrap();
        let promoted = domain
            .add_reference(composite, "r", echo(), Multiplicity::OneN)
            .unwrap();
        // the first leaf lives with the server
        domain.promote_reference(
            promoted,
            vec![
                Uri::new("fabric3://domain/comp/a#r"),
                Uri::new("fabric3://domain/comp/b#r"),
            ],
        );
        let service = domain.add_service(server, "G", echo()).unwrap();
        let wire = domain.add_wire(root, promoted, service).unwrap();

        selector.select_bindings(&mut domain).unwrap();

        assert!(domain.wire(wire).is_bound());
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["ZeroMq.can_bind_wire".to_string(), "ZeroMq.bind_wire".to_string()]
        );
    }

    #[test]
    fn test_deployed_channel_bound_when_it_spans_a_second_zone() {
        let calls = Calls::default();
        let selector = BindingSelector::new(
            vec![RecordingProvider::new(BindingKind::ZeroMq, true, &calls)],
            &BindingConfig::default(),
        )
        .unwrap();
        let mut domain = LogicalDomain::new("fabric3://domain");
        let root = domain.root();
        let channel = domain
            .add_channel(root, "orders", ChannelDefinition::in_zone("zone1"))
            .unwrap();
        selector.select_bindings(&mut domain).unwrap();
        domain.set_provisioned();
        assert!(!domain.channel(channel).is_bound());

        let consumer = domain
            .add_component(
                root,
                "listener",
                ComponentDefinition::new(ImplementationKind::Java, "app").in_zone("zone2"),
            )
            .unwrap();
        domain
            .add_consumer(
                consumer,
                "onOrder",
                vec!["org.acme.Order".into()],
                vec![domain.channel(channel).uri.clone()],
            )
            .unwrap();
        selector.select_bindings(&mut domain).unwrap();

        assert_eq!(domain.channel(channel).state, LogicalState::Provisioned);
        assert!(domain.channel(channel).is_bound());
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["ZeroMq.can_bind_channel".to_string(), "ZeroMq.bind_channel".to_string()]
        );
    }
}

//! Built-in binding providers
//!
//! Providers only choose and configure a binding. The transports themselves
//! are attached at runtime by the matching binding generator and attacher.

use crate::error::{BindingSelectionError, Result};
use crate::provider::{BindingMatchResult, BindingProvider};
use fabric_logical::{ChannelId, LogicalBinding, LogicalDomain, ServiceId, WireId};
use fabric_types::{BindingKind, Uri};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tracing::debug;

/// Binds remote artifacts over ZeroMQ sockets, assigning a port per endpoint
pub struct ZeroMqBindingProvider {
    host: String,
    // one past u16::MAX once every port has been handed out
    next_port: AtomicU32,
    enabled: AtomicBool,
}

impl ZeroMqBindingProvider {
    pub const DEFAULT_BASE_PORT: u16 = 10_000;

    pub fn new(host: impl Into<String>, base_port: u16) -> Self {
        Self {
            host: host.into(),
            next_port: AtomicU32::new(u32::from(base_port)),
            enabled: AtomicBool::new(true),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn allocate(&self, artifact: &Uri) -> Result<LogicalBinding> {
        let port = self
            .next_port
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |port| {
                u16::try_from(port).ok().map(|_| port + 1)
            })
            .ok()
            .and_then(|port| u16::try_from(port).ok())
            .ok_or_else(|| BindingSelectionError::PortsExhausted {
                host: self.host.clone(),
                artifact: artifact.clone(),
            })?;
        Ok(LogicalBinding::assigned(BindingKind::ZeroMq)
            .with_config("host", self.host.clone())
            .with_config("port", port.to_string()))
    }

    fn check(&self) -> BindingMatchResult {
        if self.enabled.load(Ordering::SeqCst) {
            BindingMatchResult::matched(BindingKind::ZeroMq)
        } else {
            BindingMatchResult::no_match(BindingKind::ZeroMq, "ZeroMQ binding provider is disabled")
        }
    }
}

impl Default for ZeroMqBindingProvider {
    fn default() -> Self {
        Self::new("localhost", Self::DEFAULT_BASE_PORT)
    }
}

impl BindingProvider for ZeroMqBindingProvider {
    fn binding_type(&self) -> BindingKind {
        BindingKind::ZeroMq
    }

    fn can_bind_wire(&self, _domain: &LogicalDomain, _wire: WireId) -> BindingMatchResult {
        self.check()
    }

    fn can_bind_service(&self, _domain: &LogicalDomain, _service: ServiceId) -> BindingMatchResult {
        self.check()
    }

    fn can_bind_channel(&self, _domain: &LogicalDomain, _channel: ChannelId) -> BindingMatchResult {
        self.check()
    }

    fn bind_wire(&self, domain: &mut LogicalDomain, wire: WireId) -> Result<()> {
        let service_uri = domain.service(domain.wire(wire).target).uri.clone();
        let target = self.allocate(&service_uri)?.with_target(service_uri.clone());
        let address = format!(
            "tcp://{}:{}",
            target.config.get("host").map(String::as_str).unwrap_or_default(),
            target.config.get("port").map(String::as_str).unwrap_or_default()
        );
        let source = LogicalBinding::assigned(BindingKind::ZeroMq)
            .with_target(service_uri.clone())
            .with_config("address", address);
        debug!(service = %service_uri, "Assigned ZeroMQ binding");
        domain.bind_wire(wire, source, target);
        Ok(())
    }

    fn bind_service(&self, domain: &mut LogicalDomain, service: ServiceId) -> Result<()> {
        let binding = self.allocate(&domain.service(service).uri)?;
        domain.bind_service(service, binding);
        Ok(())
    }

    fn bind_channel(&self, domain: &mut LogicalDomain, channel: ChannelId) -> Result<()> {
        let binding = self.allocate(&domain.channel(channel).uri)?;
        domain.bind_channel(channel, binding);
        Ok(())
    }
}

/// Binds remote artifacts over JMS, deriving destination names from URIs
pub struct JmsBindingProvider {
    enabled: AtomicBool,
}

impl JmsBindingProvider {
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn check(&self) -> BindingMatchResult {
        if self.enabled.load(Ordering::SeqCst) {
            BindingMatchResult::matched(BindingKind::Jms)
        } else {
            BindingMatchResult::no_match(BindingKind::Jms, "JMS binding provider is disabled")
        }
    }
}

impl Default for JmsBindingProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// `component.endpoint` plus a suffix naming the destination type
fn destination_name(uri: &Uri, suffix: &str) -> String {
    match uri.fragment() {
        Some(fragment) => format!("{}.{}{}", uri.last_segment(), fragment, suffix),
        None => format!("{}{}", uri.last_segment(), suffix),
    }
}

impl BindingProvider for JmsBindingProvider {
    fn binding_type(&self) -> BindingKind {
        BindingKind::Jms
    }

    fn can_bind_wire(&self, _domain: &LogicalDomain, _wire: WireId) -> BindingMatchResult {
        self.check()
    }

    fn can_bind_service(&self, _domain: &LogicalDomain, _service: ServiceId) -> BindingMatchResult {
        self.check()
    }

    fn can_bind_channel(&self, _domain: &LogicalDomain, _channel: ChannelId) -> BindingMatchResult {
        self.check()
    }

    fn bind_wire(&self, domain: &mut LogicalDomain, wire: WireId) -> Result<()> {
        let service_uri = domain.service(domain.wire(wire).target).uri.clone();
        let queue = destination_name(&service_uri, "Queue");
        let source = LogicalBinding::assigned(BindingKind::Jms)
            .with_target(service_uri.clone())
            .with_config("destination", queue.clone())
            .with_config("destination.type", "queue");
        let target = LogicalBinding::assigned(BindingKind::Jms)
            .with_config("destination", queue)
            .with_config("destination.type", "queue");
        domain.bind_wire(wire, source, target);
        Ok(())
    }

    fn bind_service(&self, domain: &mut LogicalDomain, service: ServiceId) -> Result<()> {
        let queue = destination_name(&domain.service(service).uri, "Queue");
        domain.bind_service(
            service,
            LogicalBinding::assigned(BindingKind::Jms)
                .with_config("destination", queue)
                .with_config("destination.type", "queue"),
        );
        Ok(())
    }

    fn bind_channel(&self, domain: &mut LogicalDomain, channel: ChannelId) -> Result<()> {
        let topic = destination_name(&domain.channel(channel).uri, "Topic");
        domain.bind_channel(
            channel,
            LogicalBinding::assigned(BindingKind::Jms)
                .with_config("destination", topic)
                .with_config("destination.type", "topic"),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_logical::ComponentDefinition;
    use fabric_types::{ImplementationKind, Multiplicity, ServiceContract};

    fn remote_wire() -> (LogicalDomain, WireId) {
        let mut domain = LogicalDomain::new("fabric3://domain");
        let root = domain.root();
        let client = domain
            .add_component(
                root,
                "client",
                ComponentDefinition::new(ImplementationKind::Java, "app").in_zone("zone1"),
            )
            .unwrap();
        let server = domain
            .add_component(
                root,
                "server",
                ComponentDefinition::new(ImplementationKind::Java, "app").in_zone("zone2"),
            )
            .unwrap();
        let contract = ServiceContract::java("org.acme.Echo");
        let reference = domain
            .add_reference(client, "echo", contract.clone(), Multiplicity::OneOne)
            .unwrap();
        let service = domain.add_service(server, "echo", contract).unwrap();
        let wire = domain.add_wire(root, reference, service).unwrap();
        (domain, wire)
    }

    #[test]
    fn test_zeromq_assigns_distinct_ports() {
        let provider = ZeroMqBindingProvider::new("10.0.0.1", 9000);
        let (mut domain, wire) = remote_wire();
        provider.bind_wire(&mut domain, wire).unwrap();

        let bound = domain.wire(wire);
        let target = bound.target_binding.as_ref().unwrap();
        assert_eq!(target.config.get("port").map(String::as_str), Some("9000"));
        let source = bound.source_binding.as_ref().unwrap();
        assert_eq!(
            source.config.get("address").map(String::as_str),
            Some("tcp://10.0.0.1:9000")
        );
        assert!(source.assigned && target.assigned);

        let service = domain.wire(wire).target;
        provider.bind_service(&mut domain, service).unwrap();
        let last = domain.service(service).bindings.last().unwrap();
        assert_eq!(last.config.get("port").map(String::as_str), Some("9001"));
    }

    #[test]
    fn test_zeromq_port_range_exhausted() {
        let provider = ZeroMqBindingProvider::new("localhost", u16::MAX);
        let (mut domain, wire) = remote_wire();
        provider.bind_wire(&mut domain, wire).unwrap();
        let target = domain.wire(wire).target_binding.clone().unwrap();
        assert_eq!(target.config.get("port").map(String::as_str), Some("65535"));

        let service = domain.wire(wire).target;
        let bound = domain.service(service).bindings.len();
        let error = provider.bind_service(&mut domain, service).unwrap_err();
        assert_eq!(
            error,
            BindingSelectionError::PortsExhausted {
                host: "localhost".to_string(),
                artifact: Uri::new("fabric3://domain/server#echo"),
            }
        );
        // the counter stays exhausted instead of wrapping to port 0
        assert!(provider.bind_service(&mut domain, service).is_err());
        assert_eq!(domain.service(service).bindings.len(), bound);
    }

    #[test]
    fn test_jms_destination_names() {
        let provider = JmsBindingProvider::new();
        let (mut domain, wire) = remote_wire();
        provider.bind_wire(&mut domain, wire).unwrap();

        let target = domain.wire(wire).target_binding.clone().unwrap();
        assert_eq!(
            target.config.get("destination").map(String::as_str),
            Some("server.echoQueue")
        );
    }

    #[test]
    fn test_disabled_provider_declines() {
        let provider = ZeroMqBindingProvider::default();
        provider.set_enabled(false);
        let (domain, wire) = remote_wire();
        let result = provider.can_bind_wire(&domain, wire);
        assert!(!result.is_match());
        assert_eq!(result.binding(), &BindingKind::ZeroMq.qname());
    }
}

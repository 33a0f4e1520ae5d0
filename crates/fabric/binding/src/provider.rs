//! Binding provider contract

use crate::error::Result;
use fabric_logical::{ChannelId, LogicalDomain, ServiceId, WireId};
use fabric_types::{BindingKind, QName};

/// Outcome of asking a provider whether it can bind an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingMatchResult {
    Match { binding: QName },
    NoMatch { binding: QName, reasons: Vec<String> },
}

impl BindingMatchResult {
    pub fn matched(kind: BindingKind) -> Self {
        Self::Match {
            binding: kind.qname(),
        }
    }

    pub fn no_match(kind: BindingKind, reason: impl Into<String>) -> Self {
        Self::NoMatch {
            binding: kind.qname(),
            reasons: vec![reason.into()],
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match { .. })
    }

    /// Binding type the provider attempted
    pub fn binding(&self) -> &QName {
        match self {
            Self::Match { binding } | Self::NoMatch { binding, .. } => binding,
        }
    }

    pub fn reasons(&self) -> &[String] {
        match self {
            Self::Match { .. } => &[],
            Self::NoMatch { reasons, .. } => reasons,
        }
    }
}

/// A transport extension able to carry remote wires, callback services and
/// distributed channels
///
/// `can_bind_*` must not mutate the domain. `bind_*` attaches a concrete
/// binding (with addresses, ports or destination names filled in) through the
/// domain's binding hooks.
pub trait BindingProvider: Send + Sync {
    /// Binding type this provider attaches
    fn binding_type(&self) -> BindingKind;

    fn can_bind_wire(&self, domain: &LogicalDomain, wire: WireId) -> BindingMatchResult;

    fn can_bind_service(&self, domain: &LogicalDomain, service: ServiceId) -> BindingMatchResult;

    fn can_bind_channel(&self, domain: &LogicalDomain, channel: ChannelId) -> BindingMatchResult;

    fn bind_wire(&self, domain: &mut LogicalDomain, wire: WireId) -> Result<()>;

    fn bind_service(&self, domain: &mut LogicalDomain, service: ServiceId) -> Result<()>;

    fn bind_channel(&self, domain: &mut LogicalDomain, channel: ChannelId) -> Result<()>;
}

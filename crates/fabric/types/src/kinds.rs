//! Closed sets of supported binding, implementation and contract kinds
//!
//! Generators are registered against these enums at startup. A kind with no
//! registered generator is reported as an "unsupported kind" error.

use crate::ids::QName;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transport binding types understood by the core
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingKind {
    /// Default SCA binding (runtime-selected transport)
    Sca,
    Http,
    Jms,
    Ftp,
    ZeroMq,
    /// SOAP web services
    Ws,
    Rest,
}

impl BindingKind {
    pub const ALL: [BindingKind; 7] = [
        BindingKind::Sca,
        BindingKind::Http,
        BindingKind::Jms,
        BindingKind::Ftp,
        BindingKind::ZeroMq,
        BindingKind::Ws,
        BindingKind::Rest,
    ];

    /// Binding element name as it appears in composites
    pub fn qname(&self) -> QName {
        match self {
            BindingKind::Sca => QName::sca("binding.sca"),
            BindingKind::Ws => QName::sca("binding.ws"),
            BindingKind::Jms => QName::sca("binding.jms"),
            BindingKind::Http => QName::fabric3("binding.http"),
            BindingKind::Ftp => QName::fabric3("binding.ftp"),
            BindingKind::ZeroMq => QName::fabric3("binding.zeromq"),
            BindingKind::Rest => QName::fabric3("binding.rs"),
        }
    }

    pub fn from_qname(qname: &QName) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| &kind.qname() == qname)
    }
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qname())
    }
}

/// Component implementation types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImplementationKind {
    /// Nested composite; never instantiated itself
    Composite,
    /// Runtime system component
    System,
    Java,
    Timer,
    Web,
}

impl ImplementationKind {
    pub fn is_composite(&self) -> bool {
        matches!(self, ImplementationKind::Composite)
    }
}

impl fmt::Display for ImplementationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImplementationKind::Composite => "implementation.composite",
            ImplementationKind::System => "implementation.system",
            ImplementationKind::Java => "implementation.java",
            ImplementationKind::Timer => "implementation.timer",
            ImplementationKind::Web => "implementation.web",
        };
        f.write_str(name)
    }
}

/// Interface definition languages for service contracts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
    Java,
    Wsdl,
    JsonSchema,
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContractKind::Java => "interface.java",
            ContractKind::Wsdl => "interface.wsdl",
            ContractKind::JsonSchema => "interface.json",
        };
        f.write_str(name)
    }
}

//! Lifecycle and cardinality enums shared by logical artifacts

use serde::{Deserialize, Serialize};

/// Deployment state of a logical artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LogicalState {
    /// Introduced by the current deployment request
    #[default]
    New,
    /// Already deployed to its zone
    Provisioned,
    /// Pending removal
    Marked,
}

/// Reference multiplicity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Multiplicity {
    ZeroOne,
    #[default]
    OneOne,
    ZeroN,
    OneN,
}

impl Multiplicity {
    /// `0..n` and `1..n` references may be reinjected when targets change
    pub fn is_multi_valued(&self) -> bool {
        matches!(self, Multiplicity::ZeroN | Multiplicity::OneN)
    }

    pub fn is_required(&self) -> bool {
        matches!(self, Multiplicity::OneOne | Multiplicity::OneN)
    }
}

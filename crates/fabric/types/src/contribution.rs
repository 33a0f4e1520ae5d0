//! Contributions: deployable artifacts and their import wires

use crate::ids::QName;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a contribution
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContributionUri(String);

impl ContributionUri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContributionUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContributionUri {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A resolved import: `import` is satisfied by an export of `exporter`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContributionWire {
    /// Imported symbol (package name, namespace, ...)
    pub import: String,
    pub exporter: ContributionUri,
}

/// A deployable artifact. Immutable once stored; the URI is its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub uri: ContributionUri,
    pub wires: Vec<ContributionWire>,
    /// Deployable composites contained in the artifact
    pub deployables: Vec<QName>,
}

impl Contribution {
    pub fn new(uri: impl Into<ContributionUri>) -> Self {
        Self {
            uri: uri.into(),
            wires: Vec::new(),
            deployables: Vec::new(),
        }
    }

    pub fn with_wire(mut self, import: impl Into<String>, exporter: impl Into<ContributionUri>) -> Self {
        self.wires.push(ContributionWire {
            import: import.into(),
            exporter: exporter.into(),
        });
        self
    }

    pub fn with_deployable(mut self, deployable: QName) -> Self {
        self.deployables.push(deployable);
        self
    }

    /// Distinct contributions this one imports from, in wire order
    pub fn imported_contributions(&self) -> Vec<&ContributionUri> {
        let mut imported: Vec<&ContributionUri> = Vec::new();
        for wire in &self.wires {
            if wire.exporter != self.uri && !imported.contains(&&wire.exporter) {
                imported.push(&wire.exporter);
            }
        }
        imported
    }
}

impl From<String> for ContributionUri {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imported_contributions_are_distinct() {
        let contribution = Contribution::new("app")
            .with_wire("org.acme.api", "api")
            .with_wire("org.acme.api.model", "api")
            .with_wire("org.acme.app.internal", "app")
            .with_wire("org.acme.util", "util");

        let imported: Vec<&str> = contribution
            .imported_contributions()
            .into_iter()
            .map(ContributionUri::as_str)
            .collect();
        assert_eq!(imported, vec!["api", "util"]);
    }
}

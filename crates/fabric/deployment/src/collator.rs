//! Contribution collation
//!
//! Groups the contributions owning a set of components by the zone that
//! must provision them. Imported contributions are pulled in transitively and
//! always precede their importers in a zone's list.

use crate::error::{DeploymentError, Result};
use crate::store::MetaDataStore;
use fabric_logical::{ComponentId, LogicalDomain};
use fabric_types::{Contribution, ContributionUri, LogicalState, ZoneName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Which components a generation pass covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenerationType {
    /// Every listed component regardless of state
    Full,
    /// Components not yet provisioned
    Incremental,
    /// Components pending removal
    Undeploy,
}

impl GenerationType {
    pub fn includes(&self, state: LogicalState) -> bool {
        match self {
            GenerationType::Full => true,
            GenerationType::Incremental => state != LogicalState::Provisioned,
            GenerationType::Undeploy => state == LogicalState::Marked,
        }
    }

    /// Whether a wire, channel or component in `state` produces commands.
    /// Stricter than [`includes`](Self::includes): a full pass never
    /// re-attaches marked artifacts, an incremental one never touches them.
    pub fn generates(&self, state: LogicalState) -> bool {
        match self {
            GenerationType::Full => state != LogicalState::Marked,
            GenerationType::Incremental => state == LogicalState::New,
            GenerationType::Undeploy => state == LogicalState::Marked,
        }
    }

    pub(crate) fn is_undeploy(&self) -> bool {
        matches!(self, GenerationType::Undeploy)
    }
}

impl fmt::Display for GenerationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationType::Full => write!(f, "full"),
            GenerationType::Incremental => write!(f, "incremental"),
            GenerationType::Undeploy => write!(f, "undeploy"),
        }
    }
}

/// Contributions per zone, dependencies first
pub type CollatedContributions = BTreeMap<ZoneName, Vec<Contribution>>;

pub struct ContributionCollator {
    store: Arc<dyn MetaDataStore>,
}

impl ContributionCollator {
    pub fn new(store: Arc<dyn MetaDataStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, domain, components), fields(components = components.len()))]
    pub fn collate(
        &self,
        domain: &LogicalDomain,
        components: &[ComponentId],
        generation_type: GenerationType,
    ) -> Result<CollatedContributions> {
        let mut collated = CollatedContributions::new();

        for &id in components {
            let component = domain.component(id);
            // the domain root is not backed by a stored contribution
            if component.parent.is_none() || !generation_type.includes(component.state) {
                continue;
            }
            let zone = collated.entry(component.zone.clone()).or_default();
            self.collect(&component.contribution, zone, &mut Vec::new())?;
        }

        debug!(zones = collated.len(), "Collated contributions");
        Ok(collated)
    }

    fn collect(
        &self,
        uri: &ContributionUri,
        into: &mut Vec<Contribution>,
        visiting: &mut Vec<ContributionUri>,
    ) -> Result<()> {
        if visiting.contains(uri) || into.iter().any(|c| &c.uri == uri) {
            return Ok(());
        }
        let contribution = self
            .store
            .find(uri)
            .ok_or_else(|| DeploymentError::ContributionNotFound(uri.clone()))?;

        visiting.push(uri.clone());
        for imported in contribution.imported_contributions() {
            self.collect(imported, into, visiting)?;
        }
        visiting.pop();

        into.push(contribution);
        Ok(())
    }
}

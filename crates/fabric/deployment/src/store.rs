//! Contribution metadata lookup
//!
//! Contributions are immutable once stored, so the store can be shared by
//! concurrent collations without further coordination.

use dashmap::DashMap;
use fabric_types::{Contribution, ContributionUri};

pub trait MetaDataStore: Send + Sync {
    fn find(&self, uri: &ContributionUri) -> Option<Contribution>;
}

/// Store backed by a concurrent map
#[derive(Debug, Default)]
pub struct InMemoryMetaDataStore {
    contributions: DashMap<ContributionUri, Contribution>,
}

impl InMemoryMetaDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, contribution: Contribution) {
        self.contributions.insert(contribution.uri.clone(), contribution);
    }

    pub fn with(self, contribution: Contribution) -> Self {
        self.store(contribution);
        self
    }

    pub fn len(&self) -> usize {
        self.contributions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contributions.is_empty()
    }
}

impl MetaDataStore for InMemoryMetaDataStore {
    fn find(&self, uri: &ContributionUri) -> Option<Contribution> {
        self.contributions.get(uri).map(|entry| entry.value().clone())
    }
}

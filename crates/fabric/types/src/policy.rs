//! Resolved policy values
//!
//! Policy resolution itself happens upstream; generation only reads the
//! resulting intents and policy sets.

use crate::ids::QName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known intents
pub mod intents {
    use crate::ids::QName;

    pub fn authorization() -> QName {
        QName::sca("authorization")
    }

    pub fn authentication() -> QName {
        QName::sca("authentication")
    }

    pub fn confidentiality() -> QName {
        QName::sca("confidentiality")
    }

    pub fn managed_transaction() -> QName {
        QName::sca("managedTransaction")
    }

    /// Policy set metadata key carrying the roles required by `authorization`
    pub const ROLES_METADATA: &str = "roles";
}

/// A policy set that provides one or more intents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySet {
    pub name: QName,
    pub provides: Vec<QName>,
    pub metadata: BTreeMap<String, Vec<String>>,
}

impl PolicySet {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            provides: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn providing(mut self, intent: QName) -> Self {
        self.provides.push(intent);
        self
    }

    pub fn with_metadata<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata
            .insert(key.into(), values.into_iter().map(Into::into).collect());
        self
    }
}

/// Intents and policy sets in effect at one point (endpoint or operation)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePolicy {
    pub intents: Vec<QName>,
    pub policy_sets: Vec<PolicySet>,
}

impl EffectivePolicy {
    pub fn is_empty(&self) -> bool {
        self.intents.is_empty() && self.policy_sets.is_empty()
    }

    pub fn with_intent(mut self, intent: QName) -> Self {
        self.intents.push(intent);
        self
    }

    pub fn with_policy_set(mut self, policy_set: PolicySet) -> Self {
        self.policy_sets.push(policy_set);
        self
    }

    /// Intents declared directly or provided by an attached policy set
    pub fn required_intents(&self) -> Vec<QName> {
        let mut required: Vec<QName> = Vec::new();
        let provided = self.policy_sets.iter().flat_map(|set| set.provides.iter());
        for intent in self.intents.iter().chain(provided) {
            if !required.contains(intent) {
                required.push(intent.clone());
            }
        }
        required
    }

    /// Metadata published by the policy sets providing `intent`
    pub fn metadata_for(&self, intent: &QName, key: &str) -> Option<&[String]> {
        self.policy_sets
            .iter()
            .filter(|set| set.provides.contains(intent))
            .find_map(|set| set.metadata.get(key))
            .map(Vec::as_slice)
    }

    fn merge(&self, other: &EffectivePolicy) -> EffectivePolicy {
        let mut merged = self.clone();
        for intent in &other.intents {
            if !merged.intents.contains(intent) {
                merged.intents.push(intent.clone());
            }
        }
        for set in &other.policy_sets {
            if !merged.policy_sets.iter().any(|s| s.name == set.name) {
                merged.policy_sets.push(set.clone());
            }
        }
        merged
    }
}

/// Policy resolved for a wire or channel connection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyResult {
    /// Applies to every operation
    pub endpoint: EffectivePolicy,
    /// Operation-specific additions, keyed by operation name
    pub operations: BTreeMap<String, EffectivePolicy>,
}

impl PolicyResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_endpoint(mut self, policy: EffectivePolicy) -> Self {
        self.endpoint = policy;
        self
    }

    pub fn with_operation(mut self, operation: impl Into<String>, policy: EffectivePolicy) -> Self {
        self.operations.insert(operation.into(), policy);
        self
    }

    /// Endpoint policy merged with the policy specific to `operation`
    pub fn for_operation(&self, operation: &str) -> EffectivePolicy {
        match self.operations.get(operation) {
            Some(specific) => self.endpoint.merge(specific),
            None => self.endpoint.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_policy_merges_endpoint() {
        let roles = PolicySet::new(QName::fabric3("adminRoles"))
            .providing(intents::authorization())
            .with_metadata(intents::ROLES_METADATA, ["admin"]);

        let result = PolicyResult::empty()
            .with_endpoint(EffectivePolicy::default().with_intent(intents::confidentiality()))
            .with_operation("delete", EffectivePolicy::default().with_policy_set(roles));

        let delete = result.for_operation("delete");
        let required = delete.required_intents();
        assert!(required.contains(&intents::confidentiality()));
        assert!(required.contains(&intents::authorization()));
        assert_eq!(
            delete.metadata_for(&intents::authorization(), intents::ROLES_METADATA),
            Some(&["admin".to_string()][..])
        );

        let read = result.for_operation("read");
        assert_eq!(read.required_intents(), vec![intents::confidentiality()]);
    }
}

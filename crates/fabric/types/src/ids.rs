//! Identifiers used throughout the logical and physical models
//!
//! URIs are kept as plain strings with a small set of structural helpers; the
//! core never needs full RFC 3986 parsing, only hierarchy and fragment handling.

use crate::error::{Result, TypesError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SCA 1.1 assembly namespace
pub const SCA_NS: &str = "http://docs.oasis-open.org/ns/opencsa/sca/200912";

/// Fabric3 extension namespace
pub const FABRIC3_NS: &str = "urn:fabric3.org";

/// Hierarchical artifact URI, e.g. `fabric3://domain/composite/component#service`
///
/// Component URIs mirror composite containment: a child's URI is always its
/// parent composite's URI plus one path segment. Endpoints (services,
/// references, producers, consumers) are addressed with a fragment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uri(String);

impl Uri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The fragment after `#`, if present and non-empty
    pub fn fragment(&self) -> Option<&str> {
        match self.0.split_once('#') {
            Some((_, fragment)) if !fragment.is_empty() => Some(fragment),
            _ => None,
        }
    }

    /// This URI with any fragment removed
    pub fn defragment(&self) -> Uri {
        match self.0.split_once('#') {
            Some((base, _)) => Uri(base.to_string()),
            None => self.clone(),
        }
    }

    /// Replace (or add) the fragment
    pub fn with_fragment(&self, fragment: &str) -> Uri {
        Uri(format!("{}#{}", self.defragment().0, fragment))
    }

    /// Append a path segment to the defragmented URI
    pub fn child(&self, name: &str) -> Uri {
        Uri(format!("{}/{}", self.defragment().0, name))
    }

    /// The containing URI, or `None` for a root (`scheme://authority`)
    pub fn parent(&self) -> Option<Uri> {
        let base = self.defragment().0;
        let path_start = base.find("://").map(|i| i + 3).unwrap_or(0);
        let (_, path) = base.split_at(path_start);
        path.rfind('/')
            .map(|idx| Uri(base[..path_start + idx].to_string()))
    }

    /// The last path segment of the defragmented URI
    pub fn last_segment(&self) -> &str {
        let base = match self.0.split_once('#') {
            Some((base, _)) => base,
            None => self.0.as_str(),
        };
        base.rsplit('/').next().unwrap_or(base)
    }

    /// True when `other` is strictly contained in this URI's hierarchy
    pub fn is_ancestor_of(&self, other: &Uri) -> bool {
        let base = self.defragment();
        let other = other.defragment();
        other.0.len() > base.0.len()
            && other.0.starts_with(&base.0)
            && other.0.as_bytes()[base.0.len()] == b'/'
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Uri {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Qualified name in Clark notation: `{namespace}local`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QName {
    pub namespace: String,
    pub local: String,
}

impl QName {
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
        }
    }

    pub fn sca(local: impl Into<String>) -> Self {
        Self::new(SCA_NS, local)
    }

    pub fn fabric3(local: impl Into<String>) -> Self {
        Self::new(FABRIC3_NS, local)
    }

    /// Parse `{namespace}local`, or a bare `local` in the empty namespace
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(TypesError::InvalidQName(value.to_string()));
        }
        match value.strip_prefix('{') {
            Some(rest) => {
                let (namespace, local) = rest
                    .split_once('}')
                    .ok_or_else(|| TypesError::InvalidQName(value.to_string()))?;
                if local.is_empty() {
                    return Err(TypesError::InvalidQName(value.to_string()));
                }
                Ok(Self::new(namespace, local))
            }
            None if value.contains('}') => Err(TypesError::InvalidQName(value.to_string())),
            None => Ok(Self::new("", value)),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(&self.local)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local)
        }
    }
}

/// Name of a zone: a group of runtimes in a federated domain
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneName(String);

impl ZoneName {
    /// Zone used by single-runtime deployments
    pub const LOCAL: &'static str = "LocalZone";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn local() -> Self {
        Self(Self::LOCAL.to_string())
    }

    pub fn is_local(&self) -> bool {
        self.0 == Self::LOCAL
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ZoneName {
    fn default() -> Self {
        Self::local()
    }
}

impl fmt::Display for ZoneName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ZoneName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

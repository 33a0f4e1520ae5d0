//! Binding selection configuration

use serde::{Deserialize, Serialize};

/// Provider ordering for binding selection
///
/// ```toml
/// [binding]
/// priority = ["{urn:fabric3.org}binding.zeromq", "{http://docs.oasis-open.org/ns/opencsa/sca/200912}binding.jms"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
    /// Binding type QNames in Clark notation, most preferred first.
    /// Providers not listed sort after listed ones in registration order.
    pub priority: Vec<String>,

    /// Ignore priority entries that match no registered provider instead of
    /// failing startup
    pub allow_unknown: bool,
}

impl BindingConfig {
    pub fn with_priority<I, S>(priority: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            priority: priority.into_iter().map(Into::into).collect(),
            allow_unknown: false,
        }
    }
}

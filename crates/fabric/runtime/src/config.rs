//! Runtime configuration
//!
//! ```toml
//! runtime_name = "vm1"
//! zone = "zone1"
//! role = "participant"
//!
//! [binding]
//! priority = ["{urn:fabric3.org}binding.zeromq"]
//!
//! [logging]
//! level = "debug"
//! json = true
//!
//! [protocol]
//! update_timeout_ms = 2000
//! ```

use crate::error::{DomainError, Result};
use fabric_binding::BindingConfig;
use fabric_types::ZoneName;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Name this runtime reports in protocol messages
    #[serde(default = "default_runtime_name")]
    pub runtime_name: String,

    /// Zone this runtime belongs to
    #[serde(default)]
    pub zone: ZoneName,

    #[serde(default)]
    pub role: RuntimeRole,

    /// URI of the domain root composite
    #[serde(default = "default_domain_uri")]
    pub domain_uri: String,

    #[serde(default)]
    pub binding: BindingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub protocol: ProtocolConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            runtime_name: default_runtime_name(),
            zone: ZoneName::default(),
            role: RuntimeRole::default(),
            domain_uri: default_domain_uri(),
            binding: BindingConfig::default(),
            logging: LoggingConfig::default(),
            protocol: ProtocolConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(DomainError::ConfigIo {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn is_controller(&self) -> bool {
        self.role == RuntimeRole::Controller
    }
}

/// Whether this runtime holds the authoritative domain state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeRole {
    #[default]
    Controller,
    Participant,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Update protocol configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// How long a request waits for its response
    #[serde(default = "default_update_timeout")]
    pub update_timeout_ms: u64,

    /// Requests buffered per transport
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Increments the controller keeps per zone
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl ProtocolConfig {
    pub fn update_timeout(&self) -> Duration {
        Duration::from_millis(self.update_timeout_ms)
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            update_timeout_ms: default_update_timeout(),
            channel_capacity: default_channel_capacity(),
            history_limit: default_history_limit(),
        }
    }
}

// Default value helpers
fn default_runtime_name() -> String {
    "vm".to_string()
}

fn default_domain_uri() -> String {
    "fabric3://domain".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_update_timeout() -> u64 {
    5_000
}

fn default_channel_capacity() -> usize {
    64
}

fn default_history_limit() -> usize {
    fabric_deployment::DEFAULT_HISTORY_LIMIT
}

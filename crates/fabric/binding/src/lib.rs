//! Fabric3 Binding Selection
//!
//! Wires and channels that cross zone boundaries need a concrete transport.
//! When the composite does not declare one, the [`BindingSelector`] asks each
//! registered [`BindingProvider`] in priority order whether it can carry the
//! wire, and lets the first that can attach its binding to both endpoints.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod config;
pub mod error;
pub mod provider;
pub mod providers;
pub mod selector;

pub use config::BindingConfig;
pub use error::{BindingConfigError, BindingSelectionError, Result};
pub use provider::{BindingMatchResult, BindingProvider};
pub use providers::{JmsBindingProvider, ZeroMqBindingProvider};
pub use selector::BindingSelector;

//! Fabric3 Runtime
//!
//! Assembles the generation pipeline into a [`Domain`] that deploys and
//! undeploys components and keeps zone participants current. Also carries
//! the runtime's [`RuntimeConfig`] and its tracing setup.
//!
//! ```no_run
//! use fabric_deployment::InMemoryMetaDataStore;
//! use fabric_runtime::{init_tracing, Domain, DomainServices, RuntimeConfig};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # fn main() -> fabric_runtime::Result<()> {
//! let config = RuntimeConfig::load(Some(Path::new("fabric3.toml")))?;
//! init_tracing(&config.logging);
//! let domain = Domain::new(
//!     &config,
//!     DomainServices::standard(Arc::new(InMemoryMetaDataStore::new())),
//! )?;
//! # let _ = domain;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod config;
pub mod domain;
pub mod error;
pub mod telemetry;

pub use config::{LoggingConfig, ProtocolConfig, RuntimeConfig, RuntimeRole};
pub use domain::{DeploymentReport, Domain, DomainServices};
pub use error::{DomainError, Result};
pub use telemetry::init_tracing;

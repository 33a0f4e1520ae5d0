//! Accumulated validation errors
//!
//! Promotion failures do not abort a pass. Each one is recorded in a
//! [`ValidationContext`] so a single deployment attempt reports every problem
//! it can find; [`ValidationReport`] groups them per artifact for display.

use fabric_types::Uri;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// A promotion that could not be resolved
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Promoted component not found: {promoted} (promoted by {promoting})")]
    PromotedComponentNotFound { promoting: Uri, promoted: Uri },

    #[error("Reference not found: {promoted} (promoted by {promoting})")]
    ReferenceNotFound { promoting: Uri, promoted: Uri },

    #[error("Promoted reference is ambiguous, specify one of {candidates:?}: {promoted} (promoted by {promoting})")]
    AmbiguousReference {
        promoting: Uri,
        promoted: Uri,
        candidates: Vec<String>,
    },

    #[error("Service not found: {promoted} (promoted by {promoting})")]
    ServiceNotFound { promoting: Uri, promoted: Uri },

    #[error("Promoted service is ambiguous, specify one of {candidates:?}: {promoted} (promoted by {promoting})")]
    AmbiguousService {
        promoting: Uri,
        promoted: Uri,
        candidates: Vec<String>,
    },

    #[error("No services available on component: {promoted} (promoted by {promoting})")]
    NoServiceOnComponent { promoting: Uri, promoted: Uri },
}

impl ValidationError {
    /// The artifact whose declaration is in error
    pub fn artifact(&self) -> &Uri {
        match self {
            Self::PromotedComponentNotFound { promoting, .. }
            | Self::ReferenceNotFound { promoting, .. }
            | Self::AmbiguousReference { promoting, .. }
            | Self::ServiceNotFound { promoting, .. }
            | Self::AmbiguousService { promoting, .. }
            | Self::NoServiceOnComponent { promoting, .. } => promoting,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::PromotedComponentNotFound { .. } => "PromotedComponentNotFound",
            Self::ReferenceNotFound { .. } => "ReferenceNotFound",
            Self::AmbiguousReference { .. } => "AmbiguousReference",
            Self::ServiceNotFound { .. } => "ServiceNotFound",
            Self::AmbiguousService { .. } => "AmbiguousService",
            Self::NoServiceOnComponent { .. } => "NoServiceOnComponent",
        }
    }
}

/// Collects errors across a resolution pass
#[derive(Debug, Default, Clone)]
pub struct ValidationContext {
    errors: Vec<ValidationError>,
}

impl ValidationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }

    pub fn report(&self) -> ValidationReport {
        ValidationReport::new(&self.errors)
    }
}

/// Errors grouped by the artifact that declared them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    by_artifact: BTreeMap<Uri, Vec<ValidationError>>,
    total: usize,
}

impl ValidationReport {
    pub fn new(errors: &[ValidationError]) -> Self {
        let mut by_artifact: BTreeMap<Uri, Vec<ValidationError>> = BTreeMap::new();
        for error in errors {
            by_artifact
                .entry(error.artifact().clone())
                .or_default()
                .push(error.clone());
        }
        Self {
            by_artifact,
            total: errors.len(),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn artifact_count(&self) -> usize {
        self.by_artifact.len()
    }

    pub fn for_artifact(&self, artifact: &Uri) -> &[ValidationError] {
        self.by_artifact
            .get(artifact)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.total == 1 { "error" } else { "errors" };
        writeln!(
            f,
            "{} {} found in {} artifact(s)",
            self.total,
            noun,
            self.by_artifact.len()
        )?;
        for (artifact, errors) in &self.by_artifact {
            writeln!(f, "  {} ({})", artifact, errors.len())?;
            for error in errors {
                writeln!(f, "    [{}] {}", error.kind(), error)?;
            }
        }
        Ok(())
    }
}

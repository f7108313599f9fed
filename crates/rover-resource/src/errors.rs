//! Error types for resource operations.

use crate::name::ResourceName;
use rover_error::CommonError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for resource operations.
pub type Result<T> = std::result::Result<T, ResourceError>;

/// Errors that can occur while building, reconfiguring, or looking up
/// resources.
///
/// Every per-resource failure is stored on the owning graph node as its last
/// error and surfaced to `resource(name)` callers wrapped in
/// [`ResourceError::NotAvailable`].
#[derive(Debug, Error)]
pub enum ResourceError {
    /// A shared cross-crate failure kind.
    #[error(transparent)]
    Common(#[from] CommonError),

    /// An edge or dependency addition would create a cycle.
    #[error("circular dependency detected involving '{0}'")]
    Cycle(String),

    /// The named resource does not exist.
    #[error("resource \"{0}\" not found")]
    NotFound(String),

    /// The node exists but its object is not ready.
    #[error("resource \"{name}\" not available: {cause}")]
    NotAvailable {
        /// The resource that was requested.
        name: ResourceName,
        /// The underlying build or lookup failure.
        cause: Arc<ResourceError>,
    },

    /// A short name matched resources on more than one remote.
    #[error("more than one resource named \"{0}\"; use a remote prefix to disambiguate")]
    Clash(String),

    /// Config-level validation failed before any build was attempted.
    #[error("config validation error for \"{name}\": {reason}")]
    ValidationFailed {
        /// The offending resource or config entry.
        name: String,
        /// Why validation failed.
        reason: String,
    },

    /// A constructor returned an error.
    #[error("resource build error for \"{name}\": {reason}")]
    BuildFailed {
        /// The resource being built.
        name: String,
        /// The constructor's error.
        reason: String,
    },

    /// An in-place reconfigure returned an error.
    #[error("resource reconfigure error for \"{name}\": {reason}")]
    ReconfigureFailed {
        /// The resource being reconfigured.
        name: String,
        /// The reconfigure error.
        reason: String,
    },

    /// Sentinel returned from `Resource::reconfigure` asking the engine to
    /// close the object and build a fresh one from the new config.
    #[error("resource must be rebuilt")]
    MustRebuild,

    /// A constructor or reconfigure exceeded the per-resource timeout.
    #[error("resource \"{0}\" did not complete (re)configuration within {1:?}")]
    BuildTimeout(String, Duration),

    /// A remote machine could not be dialed or queried.
    #[error("remote \"{name}\" unreachable: {reason}")]
    RemoteUnreachable {
        /// The remote's configured name.
        name: String,
        /// The dial or status failure.
        reason: String,
    },

    /// A shell-API resource was rejected because the environment is untrusted.
    #[error("shell service disabled in an untrusted environment")]
    ShellDisabled,

    /// A remote dial was refused by the insecure-credentials policy.
    #[error(
        "remote \"{0}\" rejected: must allow insecure credentials to connect \
         to a non-TLS secured machine"
    )]
    InsecureCredsRejected(String),

    /// Several independent errors, aggregated.
    #[error("{}", join_errors(.0))]
    Multiple(Vec<ResourceError>),
}

fn join_errors(errs: &[ResourceError]) -> String {
    errs.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ResourceError {
    /// Creates a validation failure.
    #[must_use]
    pub fn validation_failed(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::ValidationFailed {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a build failure.
    #[must_use]
    pub fn build_failed(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::BuildFailed {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a reconfigure failure.
    #[must_use]
    pub fn reconfigure_failed(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::ReconfigureFailed {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a remote unreachable error.
    #[must_use]
    pub fn remote_unreachable(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::RemoteUnreachable {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Wraps a failure as a not-available error for the given name.
    #[must_use]
    pub fn not_available(name: ResourceName, cause: Arc<ResourceError>) -> Self {
        Self::NotAvailable { name, cause }
    }

    /// Combines errors into one, flattening nested aggregates.
    ///
    /// Returns `None` when the input is empty, the single error when there is
    /// exactly one, and [`ResourceError::Multiple`] otherwise.
    #[must_use]
    pub fn combine(errs: Vec<ResourceError>) -> Option<ResourceError> {
        let mut flat = Vec::new();
        for err in errs {
            match err {
                Self::Multiple(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ => Some(Self::Multiple(flat)),
        }
    }

    /// Returns true for the rebuild-request sentinel.
    #[must_use]
    pub const fn is_must_rebuild(&self) -> bool {
        matches!(self, Self::MustRebuild)
    }

    /// Returns true if this is a cycle error.
    #[must_use]
    pub const fn is_cycle(&self) -> bool {
        matches!(self, Self::Cycle(_))
    }

    /// Returns true if this is a not found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if this is a short-name clash error.
    #[must_use]
    pub const fn is_clash(&self) -> bool {
        matches!(self, Self::Clash(_))
    }

    /// Returns true if this is a build timeout.
    #[must_use]
    pub const fn is_build_timeout(&self) -> bool {
        matches!(self, Self::BuildTimeout(_, _))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Api;

    #[test]
    fn test_combine_empty_and_single() {
        assert!(ResourceError::combine(Vec::new()).is_none());
        let combined = ResourceError::combine(vec![ResourceError::MustRebuild]).unwrap();
        assert!(combined.is_must_rebuild());
    }

    #[test]
    fn test_combine_flattens_nested() {
        let nested = ResourceError::Multiple(vec![
            ResourceError::ShellDisabled,
            ResourceError::MustRebuild,
        ]);
        let combined =
            ResourceError::combine(vec![nested, ResourceError::Cycle("a".into())]).unwrap();
        match combined {
            ResourceError::Multiple(errs) => assert_eq!(errs.len(), 3),
            other => panic!("expected aggregate, got {other}"),
        }
    }

    #[test]
    fn test_not_available_display_includes_cause() {
        let name = ResourceName::new(Api::component("motor"), "motor1");
        let cause = Arc::new(ResourceError::build_failed("motor1", "no such pin"));
        let err = ResourceError::not_available(name, cause);
        let msg = err.to_string();
        assert!(msg.contains("not available"));
        assert!(msg.contains("no such pin"));
    }
}

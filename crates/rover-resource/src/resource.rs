//! The capability set every live resource exposes.

use crate::config::ResourceConfig;
use crate::errors::ResourceError;
use crate::name::ResourceName;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// The resources a constructor or reconfigure call may depend on, keyed by
/// fully-qualified name.
pub type Dependencies = HashMap<ResourceName, Arc<dyn Resource>>;

/// A live, named object managed by the resource graph.
///
/// Implementations are free to be local drivers, service objects, or client
/// stubs for resources owned by a remote machine; the engine treats them all
/// identically and never downcasts.
#[async_trait]
pub trait Resource: Send + Sync {
    /// The resource's fully-qualified name.
    fn name(&self) -> ResourceName;

    /// Applies a new configuration in place.
    ///
    /// The default implementation requests a rebuild, which is the correct
    /// behaviour for resources that cannot reconfigure without being
    /// reconstructed.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::MustRebuild`] to ask the engine to close this
    /// object and construct a replacement from the new config; any other
    /// error is recorded on the node as a reconfiguration failure.
    async fn reconfigure(
        &self,
        deps: &Dependencies,
        conf: &ResourceConfig,
    ) -> Result<(), ResourceError> {
        let _ = (deps, conf);
        Err(ResourceError::MustRebuild)
    }

    /// Releases the resource.
    ///
    /// Called exactly once per object incarnation.
    ///
    /// # Errors
    ///
    /// Returns an error if shutdown fails; the node unsets the object either
    /// way.
    async fn close(&self) -> Result<(), ResourceError>;
}

impl std::fmt::Debug for dyn Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource").field("name", &self.name()).finish()
    }
}

//! The host-side callbacks the engine drives.

use async_trait::async_trait;
use rover_resource::{Api, Dependencies, Resource, ResourceConfig, ResourceError};
use std::sync::Arc;

/// Capabilities the embedding host supplies to the reconfiguration engine.
///
/// The engine owns marking, ordering, timeouts, and graph mutation; the host
/// owns what a resource actually *is*: it constructs native resources from
/// configs and maintains any weak-dependent bookkeeping of its own.
#[async_trait]
pub trait RuntimeHost: Send + Sync {
    /// Constructs a resource from its config and resolved dependencies.
    ///
    /// Called for resources no module provides. The dependencies map holds a
    /// live object for every resolved parent.
    ///
    /// # Errors
    ///
    /// Returns the constructor's error; the engine records it on the node.
    async fn new_resource(
        &self,
        conf: &ResourceConfig,
        deps: Dependencies,
    ) -> Result<Arc<dyn Resource>, ResourceError>;

    /// Brings weak and optional dependents up to date.
    ///
    /// Invoked before a topological level is processed when some node in the
    /// level observes weak collaborators and the graph has changed since the
    /// last pass, so constructors always see weak collaborators in a state
    /// consistent with their own level.
    async fn update_weak_and_optional_dependents(&self);

    /// Notification that a connected remote reported a structural change.
    /// Hosts typically react by scheduling a reconfiguration pass.
    fn notify_remote_change(&self, remote_name: &str) {
        let _ = remote_name;
    }

    /// Maximum live instances permitted for the API, or 0 for no cap.
    ///
    /// Nodes of a capped API are processed synchronously so the cap can be
    /// enforced with an accurate creation count.
    fn api_max_instance(&self, api: &Api) -> usize {
        let _ = api;
        0
    }
}

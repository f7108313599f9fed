//! The capability set of a connected remote machine.

use async_trait::async_trait;
use rover_resource::{Resource, ResourceError, ResourceName};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Callback invoked by a remote client when the peer reports a structural
/// change, so the host can trigger a local reconfiguration. Notification is
/// a callback, not a graph edge; the graph stays acyclic.
pub type ParentNotifier = Box<dyn Fn() + Send + Sync>;

/// Cloud metadata reported by a machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudMetadata {
    /// Machine identity in the cloud.
    pub machine_id: String,
    /// Identity of this part of the machine.
    pub machine_part_id: String,
    /// Organisation owning the machine.
    pub primary_org_id: String,
    /// Location the machine is registered under.
    pub location_id: String,
}

/// Status of a single resource as reported by a remote machine.
///
/// Names come back without the remote's own prefix; callers re-prefix them
/// before merging into local state.
#[derive(Debug, Clone)]
pub struct ResourceStatus {
    /// The resource's name on the remote machine.
    pub name: ResourceName,
    /// Cloud metadata of the machine owning the resource, which may differ
    /// per resource when the remote itself federates further machines.
    pub cloud_metadata: CloudMetadata,
}

/// Machine-wide status reported by a remote, including resources nested
/// behind its own remotes.
#[derive(Debug, Clone, Default)]
pub struct MachineStatus {
    /// Per-resource statuses.
    pub resources: Vec<ResourceStatus>,
}

/// A connected peer machine.
///
/// The engine holds remotes behind this trait and forwards all interaction
/// with the peer's resources through the client stubs it hands out.
#[async_trait]
pub trait RemoteRobot: Send + Sync {
    /// Names of the resources the peer currently advertises, without the
    /// local remote-name prefix.
    ///
    /// Returns `None` when the connection to the peer is broken; the caller
    /// marks the remote's subtree unreachable and changes nothing else.
    async fn resource_names(&self) -> Option<Vec<ResourceName>>;

    /// Returns a client stub for the named resource.
    ///
    /// # Errors
    ///
    /// Returns an error when the peer does not advertise the resource or no
    /// client can be built for its API.
    async fn resource_by_name(
        &self,
        name: &ResourceName,
    ) -> Result<Arc<dyn Resource>, ResourceError>;

    /// The peer's cloud metadata.
    ///
    /// # Errors
    ///
    /// Returns an error when the peer cannot be queried.
    async fn cloud_metadata(&self) -> Result<CloudMetadata, ResourceError>;

    /// The peer's machine status, including nested remote resources.
    ///
    /// Callers bound this with a deadline to keep remote-to-remote cycles
    /// from blocking local status assembly.
    ///
    /// # Errors
    ///
    /// Returns an error when the peer cannot be queried.
    async fn machine_status(&self) -> Result<MachineStatus, ResourceError>;

    /// Registers a callback fired when the peer reports structural changes.
    fn set_parent_notifier(&self, notifier: ParentNotifier);

    /// Closes the connection to the peer.
    ///
    /// # Errors
    ///
    /// Returns an error when teardown fails.
    async fn close(&self) -> Result<(), ResourceError>;
}

/// Adapter installing a [`RemoteRobot`] into the resource graph as the
/// remote's own node object.
pub struct RemoteResource {
    name: ResourceName,
    client: Arc<dyn RemoteRobot>,
}

impl RemoteResource {
    /// Wraps a connected remote client as a graph resource under the given
    /// remote node name.
    #[must_use]
    pub fn new(name: ResourceName, client: Arc<dyn RemoteRobot>) -> Self {
        Self { name, client }
    }
}

#[async_trait]
impl Resource for RemoteResource {
    fn name(&self) -> ResourceName {
        self.name.clone()
    }

    // The default reconfigure applies: a changed remote config means
    // redialing, which the engine expresses as close + rebuild.

    async fn close(&self) -> Result<(), ResourceError> {
        self.client.close().await
    }
}

//! Per-resource graph node state machine.

use crate::config::ResourceConfig;
use crate::errors::ResourceError;
use crate::model::Model;
use crate::name::ResourceName;
use crate::resource::Resource;
use rover_error::CommonError;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Bounded deadline for a single resource's `close` call. When exceeded, the
/// node considers the object released and unsets it anyway.
pub const RESOURCE_CLOSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Observable lifecycle state of a node, as serialised into graph snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// No config and no object; a placeholder awaiting configuration.
    Unconfigured,
    /// A config is pending and the object has not (re)converged to it.
    Configuring,
    /// The object matches the committed config.
    Ready,
    /// The last build, reconfigure, or resolution attempt failed.
    Unhealthy,
    /// Marked for removal; the next sweep will close and drop the node.
    Removing,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconfigured => write!(f, "unconfigured"),
            Self::Configuring => write!(f, "configuring"),
            Self::Ready => write!(f, "ready"),
            Self::Unhealthy => write!(f, "unhealthy"),
            Self::Removing => write!(f, "removing"),
        }
    }
}

#[derive(Default)]
struct NodeInner {
    /// Config the current object was built against.
    config: Option<ResourceConfig>,
    /// Config awaiting a (re)build; differs from `config` only during a
    /// reconfiguration window.
    pending_config: Option<ResourceConfig>,
    /// Declared dependency names, resolved into edges by the graph.
    deps: Vec<String>,
    model: Option<Model>,
    resource: Option<Arc<dyn Resource>>,
    last_error: Option<Arc<ResourceError>>,
    marked_for_removal: bool,
    needs_reconfigure: bool,
    needs_rebuild: bool,
    deps_unresolved: bool,
    unreachable: bool,
    revision: String,
    pending_revision: String,
    updated_at: u64,
    clock: Option<Arc<AtomicU64>>,
    span: Option<tracing::Span>,
}

/// A node in the resource graph.
///
/// The graph exclusively owns every node; each node exclusively owns its
/// current object's lifecycle. All state lives behind a per-node mutex so
/// config, error, and object swaps are atomic relative to observers.
pub struct GraphNode {
    name: ResourceName,
    inner: Mutex<NodeInner>,
}

impl GraphNode {
    /// Creates a node for a resource that has a config but no object yet.
    #[must_use]
    pub fn unconfigured(conf: ResourceConfig, deps: Vec<String>) -> Self {
        let name = conf.resource_name();
        let node = Self::empty(name);
        {
            let mut inner = node.lock();
            inner.pending_config = Some(conf);
            inner.deps = deps;
            inner.needs_reconfigure = true;
        }
        node
    }

    /// Creates a node that already holds a live object, e.g. a client stub
    /// for a resource advertised by a remote machine.
    #[must_use]
    pub fn configured(
        name: ResourceName,
        conf: Option<ResourceConfig>,
        resource: Arc<dyn Resource>,
        model: Model,
    ) -> Self {
        let node = Self::empty(name);
        {
            let mut inner = node.lock();
            inner.deps = conf
                .as_ref()
                .map(ResourceConfig::dependencies)
                .unwrap_or_default();
            inner.config = conf;
            inner.resource = Some(resource);
            inner.model = Some(model);
        }
        node
    }

    /// Creates an uninitialized placeholder so a child's dependency edge can
    /// be wired before the parent's own config arrives.
    #[must_use]
    pub fn placeholder(name: ResourceName) -> Self {
        Self::empty(name)
    }

    fn empty(name: ResourceName) -> Self {
        Self {
            name,
            inner: Mutex::new(NodeInner::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NodeInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The node's fully-qualified name.
    #[must_use]
    pub fn name(&self) -> &ResourceName {
        &self.name
    }

    /// Binds the graph's logical clock so object swaps can be stamped.
    pub(crate) fn bind_clock(&self, clock: Arc<AtomicU64>) {
        self.lock().clock = Some(clock);
    }

    /// Installs the node's sub-logger span. Called once when the node first
    /// enters configuration.
    pub fn init_logger(&self) {
        let mut inner = self.lock();
        if inner.span.is_none() {
            inner.span = Some(tracing::info_span!("resource", name = %self.name));
        }
    }

    /// Returns true if the node has never held an object.
    #[must_use]
    pub fn is_uninitialized(&self) -> bool {
        self.lock().resource.is_none()
    }

    /// Returns true if the node currently holds an object.
    #[must_use]
    pub fn has_resource(&self) -> bool {
        self.lock().resource.is_some()
    }

    /// The config a (re)build should converge to: the pending config when one
    /// exists, otherwise the committed one.
    #[must_use]
    pub fn config(&self) -> Option<ResourceConfig> {
        let inner = self.lock();
        inner.pending_config.clone().or_else(|| inner.config.clone())
    }

    /// The declared dependency names awaiting resolution into edges.
    #[must_use]
    pub fn dependency_names(&self) -> Vec<String> {
        self.lock().deps.clone()
    }

    /// The model of the current object, if any.
    #[must_use]
    pub fn model(&self) -> Option<Model> {
        self.lock().model.clone()
    }

    /// The config revision the node was last successfully brought to.
    #[must_use]
    pub fn revision(&self) -> String {
        self.lock().revision.clone()
    }

    /// The logical clock value recorded at the last object swap.
    #[must_use]
    pub fn updated_at(&self) -> u64 {
        self.lock().updated_at
    }

    /// Returns true if an identical `(config, deps)` pair is already
    /// committed and healthy, meaning a re-mark would be a no-op. Applying
    /// the same diff twice must not trigger extra constructor or reconfigure
    /// calls.
    #[must_use]
    pub fn config_matches(&self, conf: &ResourceConfig, deps: &[String]) -> bool {
        let inner = self.lock();
        inner.resource.is_some()
            && !inner.needs_reconfigure
            && !inner.needs_rebuild
            && !inner.marked_for_removal
            && inner.last_error.is_none()
            && inner.config.as_ref() == Some(conf)
            && inner.deps == deps
    }

    /// Stages a new config and dependency list, opening a reconfiguration
    /// window.
    pub fn set_new_config(&self, conf: ResourceConfig, deps: Vec<String>) {
        let mut inner = self.lock();
        inner.pending_config = Some(conf);
        inner.deps = deps;
        inner.needs_reconfigure = true;
        inner.marked_for_removal = false;
    }

    /// Records the revision tag that produced the pending config.
    pub fn update_pending_revision(&self, revision: impl Into<String>) {
        self.lock().pending_revision = revision.into();
    }

    /// Directly commits a revision tag without reconfiguring. Used when a new
    /// config generation leaves this node untouched.
    pub fn update_revision(&self, revision: impl Into<String>) {
        self.lock().revision = revision.into();
    }

    /// Installs a freshly built or reconfigured object, committing the
    /// pending config and revision and clearing the last error.
    ///
    /// Closing any previous object is the caller's responsibility; swapping
    /// never closes.
    pub fn swap_resource(&self, resource: Arc<dyn Resource>, model: Model) {
        let mut inner = self.lock();
        inner.resource = Some(resource);
        inner.model = Some(model);
        inner.last_error = None;
        inner.needs_reconfigure = false;
        inner.needs_rebuild = false;
        inner.deps_unresolved = false;
        if let Some(pending) = inner.pending_config.take() {
            inner.config = Some(pending);
        }
        if !inner.pending_revision.is_empty() {
            inner.revision = std::mem::take(&mut inner.pending_revision);
        }
        let clock = inner.clock.clone();
        if let Some(clock) = clock {
            inner.updated_at = clock.fetch_add(1, Ordering::SeqCst) + 1;
        }
    }

    /// Drops the object reference without closing it. Used after the object
    /// was closed (or its provider vanished) so a later close cannot touch it
    /// again.
    pub fn unset_resource(&self) {
        self.lock().resource = None;
    }

    /// Closes the current object, unsetting it even when close fails or
    /// exceeds [`RESOURCE_CLOSE_TIMEOUT`].
    ///
    /// # Errors
    ///
    /// Returns the close error, or a timeout error if the deadline elapsed.
    pub async fn close(&self) -> Result<(), ResourceError> {
        let Some(resource) = self.lock().resource.take() else {
            return Ok(());
        };
        match tokio::time::timeout(RESOURCE_CLOSE_TIMEOUT, resource.close()).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    resource = %self.name,
                    timeout = ?RESOURCE_CLOSE_TIMEOUT,
                    "resource close exceeded deadline; treating object as released"
                );
                Err(CommonError::timeout(format!(
                    "closing resource \"{}\" exceeded {:?}",
                    self.name, RESOURCE_CLOSE_TIMEOUT
                ))
                .into())
            }
        }
    }

    /// Marks the node for removal by the next sweep.
    pub fn mark_for_removal(&self) {
        self.lock().marked_for_removal = true;
    }

    /// Returns true if the node is awaiting removal.
    #[must_use]
    pub fn is_marked_for_removal(&self) -> bool {
        self.lock().marked_for_removal
    }

    /// Requests a full rebuild (close + construct) instead of an in-place
    /// reconfigure on the next pass.
    pub fn set_needs_rebuild(&self) {
        let mut inner = self.lock();
        inner.needs_rebuild = true;
        inner.needs_reconfigure = true;
    }

    /// Returns true if the next pass must rebuild rather than reconfigure.
    #[must_use]
    pub fn needs_rebuild(&self) -> bool {
        self.lock().needs_rebuild
    }

    /// Flags the node for reprocessing on the next pass, keeping its current
    /// config. Used to rebind children after a parent was rebuilt.
    pub fn set_needs_update(&self) {
        self.lock().needs_reconfigure = true;
    }

    /// Returns true if the node is awaiting (re)configuration.
    #[must_use]
    pub fn needs_reconfigure(&self) -> bool {
        self.lock().needs_reconfigure
    }

    /// Records whether the last dependency resolution attempt failed.
    /// Unresolved nodes are skipped by the build pass.
    pub fn set_dependencies_unresolved(&self, unresolved: bool) {
        self.lock().deps_unresolved = unresolved;
    }

    /// Returns true if the node's declared dependencies failed to resolve.
    #[must_use]
    pub fn dependencies_unresolved(&self) -> bool {
        self.lock().deps_unresolved
    }

    /// Sets the reachability flag. Unreachable nodes remain structurally
    /// present but are excluded from reachable-name enumeration.
    pub fn set_reachable(&self, reachable: bool) {
        self.lock().unreachable = !reachable;
    }

    /// Returns true unless the node was marked unreachable.
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        !self.lock().unreachable
    }

    /// The most recent build, reconfigure, or resolution failure.
    #[must_use]
    pub fn last_error(&self) -> Option<Arc<ResourceError>> {
        self.lock().last_error.clone()
    }

    /// Logs the error under the node's sub-logger and records it as the
    /// node's last error.
    pub fn log_and_set_last_error(&self, err: ResourceError) {
        let err = Arc::new(err);
        let mut inner = self.lock();
        match &inner.span {
            Some(span) => {
                let _guard = span.enter();
                tracing::error!(error = %err, "resource failed");
            }
            None => {
                tracing::error!(resource = %self.name, error = %err, "resource failed");
            }
        }
        inner.last_error = Some(err);
    }

    /// The current object, if the node is healthy.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotAvailable`] wrapping the last error when
    /// the node is errored, pending removal, or has no object.
    pub fn resource(&self) -> Result<Arc<dyn Resource>, ResourceError> {
        let inner = self.lock();
        if inner.marked_for_removal {
            return Err(ResourceError::not_available(
                self.name.clone(),
                Arc::new(CommonError::invalid_state("resource is pending removal").into()),
            ));
        }
        if let Some(err) = &inner.last_error {
            return Err(ResourceError::not_available(self.name.clone(), err.clone()));
        }
        inner.resource.clone().ok_or_else(|| {
            ResourceError::not_available(
                self.name.clone(),
                Arc::new(CommonError::invalid_state("resource not initialized").into()),
            )
        })
    }

    /// The current object regardless of error state. Returns an error only
    /// when the node holds no object at all.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotAvailable`] when the node has no object.
    pub fn unsafe_resource(&self) -> Result<Arc<dyn Resource>, ResourceError> {
        self.lock().resource.clone().ok_or_else(|| {
            ResourceError::not_available(
                self.name.clone(),
                Arc::new(CommonError::invalid_state("resource not initialized").into()),
            )
        })
    }

    /// The node's observable lifecycle state.
    #[must_use]
    pub fn state(&self) -> NodeState {
        let inner = self.lock();
        if inner.marked_for_removal {
            return NodeState::Removing;
        }
        if inner.last_error.is_some() {
            return NodeState::Unhealthy;
        }
        if inner.resource.is_none() {
            if inner.config.is_some() || inner.pending_config.is_some() {
                return NodeState::Configuring;
            }
            return NodeState::Unconfigured;
        }
        if inner.needs_reconfigure {
            return NodeState::Configuring;
        }
        NodeState::Ready
    }
}

impl fmt::Debug for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphNode")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

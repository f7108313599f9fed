//! The resource manager: graph ownership, diff application, and teardown.

use rover_config::{Config, ConfigDiff, RemoteConfig};
use rover_error::CommonError;
use rover_module::ModuleManager;
use rover_remote::{Dialer, RemoteRobot};
use rover_resource::node::RESOURCE_CLOSE_TIMEOUT;
use rover_resource::{
    Api, Graph, GraphNode, Resource, ResourceConfig, ResourceError, ResourceName, SnapshotInfo,
    Visualizer,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex, Once, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// Default per-resource (re)configuration timeout.
pub const DEFAULT_RESOURCE_CONFIGURATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variable overriding the per-resource (re)configuration
/// timeout, in integer seconds.
pub const RESOURCE_CONFIGURATION_TIMEOUT_ENV: &str = "ROVER_RESOURCE_CONFIGURATION_TIMEOUT";

/// Deadline for a remote's machine-status call, bounding remote-to-remote
/// cycles out of local status assembly.
pub const REMOTE_MACHINE_STATUS_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum nodes (re)configured concurrently within one topological level.
pub(crate) const LEVEL_PARALLELISM: usize = 10;

/// Maximum remotes dialed concurrently.
pub(crate) const REMOTE_DIAL_PARALLELISM: usize = 5;

/// Interval after which an in-flight build or close logs a progress warning.
pub(crate) const SLOW_OPERATION_WARNING: Duration = Duration::from_secs(10);

/// Name of the internal web service node. The manager must never close it
/// during its own teardown: the embedding host tears it down explicitly
/// last, after every other resource is gone.
#[must_use]
pub fn web_service_name() -> ResourceName {
    ResourceName::new(Api::internal_service("web"), "builtin")
}

/// Behavioural options for the resource manager.
#[derive(Debug, Clone, Default)]
pub struct ResourceManagerOptions {
    /// Emit verbose dial diagnostics.
    pub debug: bool,
    /// Permit sending credentials to remotes over non-TLS channels.
    pub allow_insecure_creds: bool,
    /// The machine runs user-supplied config it does not trust; shell-API
    /// resources are rejected at mark time.
    pub untrusted_env: bool,
    /// TLS material applied to remote dials without explicit TLS config.
    pub tls: Option<rover_config::TlsOptions>,
}

/// Manages the live parts that make up a machine.
///
/// All shared state sits behind a graph lock (structural mutation), a
/// module-manager lock (handle swaps only), and per-node mutexes inside the
/// nodes themselves. Lock guards are never held across await points.
pub struct ResourceManager {
    resources: RwLock<Graph>,
    /// Guards swapping the module manager handle itself; individual calls
    /// are not serialised through it.
    module_manager: Mutex<Option<Arc<dyn ModuleManager>>>,
    /// Live remote clients by remote name, kept alongside their graph nodes
    /// so federation calls get the typed handle without downcasting.
    remote_clients: RwLock<HashMap<String, Arc<dyn RemoteRobot>>>,
    dialer: Arc<dyn Dialer>,
    opts: ResourceManagerOptions,
    viz: Visualizer,
    /// Logical clock value of the last completed weak-dependent update pass.
    pub(crate) weak_round: AtomicU64,
    pub(crate) configuration_timeout: Duration,
}

impl ResourceManager {
    /// Creates a resource manager.
    ///
    /// The first manager constructed in the process also reverts any
    /// AppImage launcher environment changes so spawned module processes
    /// inherit a clean environment.
    #[must_use]
    pub fn new(dialer: Arc<dyn Dialer>, opts: ResourceManagerOptions) -> Self {
        static ENV_CLEANUP: Once = Once::new();
        ENV_CLEANUP.call_once(|| {
            if let Err(err) = rover_module::clean_app_image_env() {
                tracing::warn!(error = %err, "failed to clean application image environment");
            }
        });

        Self {
            resources: RwLock::new(Graph::new()),
            module_manager: Mutex::new(None),
            remote_clients: RwLock::new(HashMap::new()),
            dialer,
            opts,
            viz: Visualizer::new(),
            weak_round: AtomicU64::new(0),
            configuration_timeout: resource_configuration_timeout(),
        }
    }

    pub(crate) fn graph(&self) -> RwLockReadGuard<'_, Graph> {
        self.resources.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn graph_mut(&self) -> RwLockWriteGuard<'_, Graph> {
        self.resources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn module_manager(&self) -> Option<Arc<dyn ModuleManager>> {
        self.module_manager
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn remote_client(&self, name: &str) -> Option<Arc<dyn RemoteRobot>> {
        self.remote_clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub(crate) fn set_remote_client(&self, name: String, client: Arc<dyn RemoteRobot>) {
        self.remote_clients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, client);
    }

    pub(crate) fn drop_remote_client(&self, name: &str) {
        self.remote_clients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }

    /// The manager's behavioural options.
    #[must_use]
    pub fn options(&self) -> &ResourceManagerOptions {
        &self.opts
    }

    /// The dialer used for remote federation.
    #[must_use]
    pub(crate) fn dialer(&self) -> &Arc<dyn Dialer> {
        &self.dialer
    }

    /// Installs the module manager. Until this is called, the manager treats
    /// every resource as native.
    pub fn start_module_manager(&self, module_manager: Arc<dyn ModuleManager>) {
        *self
            .module_manager
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(module_manager);
    }

    /// The graph's logical clock.
    #[must_use]
    pub fn logical_clock(&self) -> u64 {
        self.graph().logical_clock()
    }

    /// Captures a snapshot of the current graph into the snapshot ring.
    pub fn save_snapshot(&self) {
        let graph = self.graph();
        self.viz.save_snapshot(&graph);
    }

    /// Returns the DOT snapshot at `index` (0 is the most recent).
    ///
    /// # Errors
    ///
    /// Returns a not-found error when no snapshot exists at `index`.
    pub fn export_dot(&self, index: usize) -> Result<SnapshotInfo, ResourceError> {
        self.viz.snapshot(index).map_err(Into::into)
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// All node names in the graph, including remote nodes, internal
    /// services, and foreign resources.
    #[must_use]
    pub fn names(&self) -> Vec<ResourceName> {
        self.graph().names()
    }

    /// Names of all public resources: excludes remote machine nodes,
    /// internal services, and nodes that hold no object.
    #[must_use]
    pub fn resource_names(&self) -> Vec<ResourceName> {
        let graph = self.graph();
        graph
            .names()
            .into_iter()
            .filter(|name| is_public_resource(&graph, name))
            .collect()
    }

    /// Like [`ResourceManager::resource_names`], additionally excluding
    /// resources that are currently unreachable through their remote.
    #[must_use]
    pub fn reachable_resource_names(&self) -> Vec<ResourceName> {
        let graph = self.graph();
        graph
            .reachable_names()
            .into_iter()
            .filter(|name| is_public_resource(&graph, name))
            .collect()
    }

    /// Names in the reserved internal namespace. The embedding host closes
    /// these explicitly, last.
    #[must_use]
    pub fn internal_resource_names(&self) -> Vec<ResourceName> {
        self.graph()
            .names()
            .into_iter()
            .filter(|name| name.api.is_internal())
            .collect()
    }

    /// Names of all remotes that currently hold a live client.
    #[must_use]
    pub fn remote_names(&self) -> Vec<String> {
        let graph = self.graph();
        graph
            .find_by_api(&Api::remote())
            .into_iter()
            .filter(|name| graph.node(name).is_some_and(|node| node.has_resource()))
            .map(|name| name.name)
            .collect()
    }

    /// Returns true while any node still needs (re)configuration. Hosts use
    /// this to decide whether to schedule another pass.
    #[must_use]
    pub fn any_resources_not_configured(&self) -> bool {
        let graph = self.graph();
        graph
            .names()
            .iter()
            .any(|name| graph.node(name).is_some_and(|node| node.needs_reconfigure()))
    }

    /// Returns the named resource's live object.
    ///
    /// An exact match is preferred. A local (non-prefixed) name additionally
    /// matches a foreign resource when exactly one remote advertises that
    /// short name; two or more candidates is a clash.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`], [`ResourceError::Clash`], or
    /// [`ResourceError::NotAvailable`] wrapping the node's last error.
    pub fn resource_by_name(&self, name: &ResourceName) -> Result<Arc<dyn Resource>, ResourceError> {
        let graph = self.graph();
        if let Some(node) = graph.node(name) {
            return node.resource();
        }
        if !name.is_foreign() {
            let matches = graph.find_by_short_name_and_api(name);
            if matches.len() > 1 {
                return Err(ResourceError::Clash(name.name.clone()));
            }
            if let Some(found) = matches.first() {
                if let Some(node) = graph.node(found) {
                    return node.resource();
                }
            }
        }
        Err(ResourceError::NotFound(name.to_string()))
    }

    /// The live client for a named remote, if connected.
    #[must_use]
    pub fn remote_by_name(&self, name: &str) -> Option<Arc<dyn RemoteRobot>> {
        let node_name = ResourceName::remote_node(name);
        let has_node = self
            .graph()
            .node(&node_name)
            .is_some_and(|node| node.has_resource());
        if !has_node {
            return None;
        }
        self.remote_client(name)
    }

    // =========================================================================
    // Diff application
    // =========================================================================

    /// Applies a config diff to the graph by marking nodes; builds nothing.
    ///
    /// Added and modified components, services, and remotes are marked
    /// pending. Module changes are forwarded to the module bridge, and
    /// resources affected by a module restart are marked for rebuild. After
    /// this returns, [`ResourceManager::complete_config`] drives
    /// construction.
    ///
    /// # Errors
    ///
    /// Returns the combined per-entry marking errors; the rest of the diff
    /// is still applied.
    pub async fn update_resources(&self, diff: &ConfigDiff) -> Result<(), ResourceError> {
        let mut diff = diff.clone();
        diff.normalize();

        // Modules live with the bridge, not in the resource graph.
        if let Some(module_manager) = self.module_manager() {
            if !diff.added.modules.is_empty() {
                if let Err(err) = module_manager.add_modules(&diff.added.modules).await {
                    tracing::error!(error = %err, "error adding modules");
                }
            }
            for module in &diff.modified.modules {
                // The config was already validated, but we must check again
                // before attempting to reconfigure.
                if let Err(err) = module.validate() {
                    tracing::error!(module = %module.name, error = %err,
                        "module config validation error; skipping");
                    continue;
                }
                match module_manager.reconfigure_module(module).await {
                    // The module already closed the affected resources; the
                    // rebuild pass must not close them again.
                    Ok(affected) => self.mark_rebuild_resources(&affected),
                    Err(err) => {
                        tracing::error!(module = %module.name, error = %err,
                            "error reconfiguring module");
                    }
                }
            }
            if let Err(err) = module_manager.resolve_implicit_dependencies(&mut diff).await {
                tracing::error!(error = %err, "error adding implicit dependencies");
            }
        }

        let revision = diff.new_revision.clone();
        let mut errs = Vec::new();

        for conf in diff.added.services.iter().chain(&diff.modified.services) {
            if self.opts.untrusted_env && conf.api == Api::shell() {
                errs.push(ResourceError::ShellDisabled);
                continue;
            }
            if let Err(err) = self.mark_resource_for_update(conf.clone(), &revision) {
                errs.push(err);
            }
        }
        for conf in diff.added.components.iter().chain(&diff.modified.components) {
            if let Err(err) = self.mark_resource_for_update(conf.clone(), &revision) {
                errs.push(err);
            }
        }
        for remote in diff.added.remotes.iter().chain(&diff.modified.remotes) {
            match remote.to_resource_config() {
                Ok(conf) => {
                    if let Err(err) = self.mark_resource_for_update(conf, &revision) {
                        errs.push(err);
                    }
                }
                Err(err) => errs.push(err),
            }
        }

        ResourceError::combine(errs).map_or(Ok(()), Err)
    }

    /// Marks one resource in the graph to be (re)built by the next pass,
    /// inserting a new node when none exists. Re-marking an identical,
    /// healthy `(config, deps)` pair only commits the new revision, so
    /// applying the same diff twice triggers no extra constructor or
    /// reconfigure calls.
    fn mark_resource_for_update(
        &self,
        conf: ResourceConfig,
        revision: &str,
    ) -> Result<(), ResourceError> {
        let name = conf.resource_name();
        let deps = conf.dependencies();
        let mut graph = self.graph_mut();
        if let Some(node) = graph.node(&name) {
            if node.config_matches(&conf, &deps) {
                node.update_revision(revision);
                return Ok(());
            }
            node.set_new_config(conf, deps);
            node.update_pending_revision(revision);
            // Reset parentage; resolution will rebuild the edges.
            for parent in graph.parents_of(&name) {
                graph.remove_child(&name, &parent);
            }
            return Ok(());
        }
        let node = GraphNode::unconfigured(conf, deps);
        node.update_pending_revision(revision);
        graph.add_node(node).map_err(|err| {
            ResourceError::build_failed(
                name.to_string(),
                format!("failed to add new node for unconfigured resource: {err}"),
            )
        })?;
        Ok(())
    }

    /// Commits a revision tag on a node untouched by the current generation.
    pub fn update_revision(&self, name: &ResourceName, revision: &str) {
        if let Some(node) = self.graph().node(name) {
            node.update_revision(revision);
        }
    }

    /// Marks every descendant of `name` as needing reconfiguration so the
    /// next level walk rebinds it to the new parent object. Foreign
    /// resources are skipped: their state belongs to their remote.
    pub(crate) fn mark_children_for_update(&self, name: &ResourceName) {
        let graph = self.graph();
        let Ok(descendants) = graph.subgraph_from(name) else {
            return;
        };
        for member in descendants {
            if &member == name || member.is_foreign() {
                continue;
            }
            if let Some(node) = graph.node(&member) {
                node.set_needs_update();
            }
        }
    }

    /// Marks resources as needing a full rebuild and invalidates their
    /// descendants. The caller is responsible for having closed the objects
    /// if needed.
    pub fn mark_rebuild_resources(&self, names: &[ResourceName]) {
        for name in names {
            if self.opts.untrusted_env && name.api == Api::shell() {
                continue;
            }
            let Some(node) = self.graph().node(name) else {
                continue;
            };
            node.set_needs_rebuild();
            self.mark_children_for_update(name);
        }
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Marks everything named by a removed-config for removal.
    ///
    /// Must be called before [`ResourceManager::update_resources`] for the
    /// same generation; entries that reappear in the new config are
    /// resurrected by the later marking. Returns:
    ///
    /// - nodes whose objects must close before the build pass re-adds
    ///   same-named nodes,
    /// - the set of names marked for removal (for close exclusion),
    /// - names of module-provided resources whose module went away and that
    ///   must rebuild if still configured.
    ///
    /// Local dependents of a removed resource are *not* removed; they are
    /// marked for update so the next pass surfaces their missing
    /// dependencies. Foreign descendants of a removed remote go away with
    /// the remote itself.
    pub async fn mark_removed(
        &self,
        conf: &Config,
    ) -> (
        Vec<Arc<GraphNode>>,
        HashSet<ResourceName>,
        Vec<ResourceName>,
    ) {
        let mut rebuild = Vec::new();
        if let Some(module_manager) = self.module_manager() {
            for module in &conf.modules {
                match module_manager.remove_module(&module.name).await {
                    Ok(affected) => rebuild.extend(affected),
                    Err(err) => {
                        tracing::error!(module = %module.name, error = %err,
                            "error removing module");
                    }
                }
            }
        }

        let mut to_mark: Vec<ResourceName> = conf
            .remotes
            .iter()
            .map(|remote| ResourceName::remote_node(&remote.name))
            .collect();
        to_mark.extend(
            conf.components
                .iter()
                .chain(&conf.services)
                .map(ResourceConfig::resource_name),
        );

        let mut marked = HashSet::new();
        let mut close_first = Vec::new();
        let graph = self.graph();
        for name in to_mark {
            // Changes to shell are ignored outright in untrusted mode.
            if self.opts.untrusted_env && name.api == Api::shell() {
                continue;
            }
            let Some(node) = graph.node(&name) else {
                continue;
            };
            node.mark_for_removal();
            marked.insert(name.clone());
            close_first.push(node);
            let Ok(descendants) = graph.subgraph_from(&name) else {
                continue;
            };
            for member in descendants {
                if member == name {
                    continue;
                }
                let Some(child) = graph.node(&member) else {
                    continue;
                };
                if member.is_foreign() {
                    child.mark_for_removal();
                    marked.insert(member);
                } else {
                    child.set_needs_update();
                }
            }
        }

        // Resources orphaned by a removed module: the module already tore
        // their objects down, so only the nodes are marked. A later
        // update_resources resurrects any that remain configured.
        for name in &rebuild {
            let Some(node) = graph.node(name) else {
                continue;
            };
            node.unset_resource();
            node.mark_for_removal();
            marked.insert(name.clone());
            if let Ok(descendants) = graph.subgraph_from(name) {
                for member in descendants {
                    if &member == name || member.is_foreign() {
                        continue;
                    }
                    if let Some(child) = graph.node(&member) {
                        child.set_needs_update();
                    }
                }
            }
        }

        (close_first, marked, rebuild)
    }

    /// Removes every node currently marked for removal and closes the
    /// ejected objects, except members of `exclude`. Never short-circuits;
    /// per-resource close failures are aggregated.
    ///
    /// # Errors
    ///
    /// Returns the combined close errors.
    pub async fn remove_marked_and_close(
        &self,
        exclude: &HashSet<ResourceName>,
    ) -> Result<(), ResourceError> {
        let (ejected, removed_remotes) = {
            let mut graph = self.graph_mut();
            let removed_remotes: Vec<String> = graph
                .find_by_api(&Api::remote())
                .into_iter()
                .filter(|name| {
                    graph
                        .node(name)
                        .is_some_and(|node| node.is_marked_for_removal())
                })
                .map(|name| name.name)
                .collect();
            (graph.remove_marked(), removed_remotes)
        };
        for name in removed_remotes {
            self.drop_remote_client(&name);
        }
        let mut errs = Vec::new();
        for (name, resource) in ejected {
            if exclude.contains(&name) {
                continue;
            }
            if let Err(err) = self.close_resource(&name, resource).await {
                errs.push(err);
            }
        }
        self.save_snapshot();
        ResourceError::combine(errs).map_or(Ok(()), Err)
    }

    /// Closes a single ejected object, then removes it from its module if it
    /// was module-provided.
    pub(crate) async fn close_resource(
        &self,
        name: &ResourceName,
        resource: Arc<dyn Resource>,
    ) -> Result<(), ResourceError> {
        tracing::info!(resource = %name, "now removing resource");
        let _slow = SlowLogGuard::new(name.clone(), "waiting for resource to close");

        let mut errs = Vec::new();
        match tokio::time::timeout(RESOURCE_CLOSE_TIMEOUT, resource.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => errs.push(err),
            Err(_) => {
                tracing::warn!(resource = %name, timeout = ?RESOURCE_CLOSE_TIMEOUT,
                    "resource close exceeded deadline");
                errs.push(
                    CommonError::timeout(format!(
                        "closing resource \"{name}\" exceeded {RESOURCE_CLOSE_TIMEOUT:?}"
                    ))
                    .into(),
                );
            }
        }

        if let Some(module_manager) = self.module_manager() {
            if module_manager.is_modular_resource(name) {
                if let Err(err) = module_manager.remove_resource(name).await {
                    errs.push(
                        CommonError::internal(format!(
                            "error removing modular resource \"{name}\" for closure: {err}"
                        ))
                        .into(),
                    );
                }
            }
        }

        ResourceError::combine(errs).map_or(Ok(()), Err)
    }

    /// Marks the entire graph for removal and closes every resource, then
    /// shuts down the module bridge. Internal-namespace services are left
    /// for the embedding host to close explicitly, last.
    ///
    /// # Errors
    ///
    /// Returns the combined close errors; close never short-circuits.
    pub async fn close(&self) -> Result<(), ResourceError> {
        let exclude: HashSet<ResourceName> = {
            let graph = self.graph();
            let names = graph.names();
            graph.mark_for_removal(names.iter().cloned());
            names
                .into_iter()
                .filter(|name| name.api.is_internal())
                .collect()
        };

        let mut errs = Vec::new();
        if let Err(err) = self.remove_marked_and_close(&exclude).await {
            errs.push(err);
        }

        // Modules must go down last, after the resources they host.
        if let Some(module_manager) = self.module_manager() {
            if let Err(err) = module_manager.close().await {
                errs.push(
                    CommonError::internal(format!("error closing module manager: {err}")).into(),
                );
            }
        }

        ResourceError::combine(errs).map_or(Ok(()), Err)
    }

    /// Kills all module processes without a graceful close.
    pub fn kill(&self) {
        if let Some(module_manager) = self.module_manager() {
            module_manager.kill();
        }
    }

    // =========================================================================
    // Config reassembly
    // =========================================================================

    /// Reassembles a machine config from the current graph state and the
    /// module bridge. Foreign resources are the remotes' business and are
    /// not included.
    #[must_use]
    pub fn create_config(&self) -> Config {
        let mut conf = Config::default();
        {
            let graph = self.graph();
            for name in graph.names() {
                if name.is_foreign() {
                    continue;
                }
                let Some(node) = graph.node(&name) else {
                    continue;
                };
                let Some(res_conf) = node.config() else {
                    continue;
                };
                if name.api.is_remote() {
                    match RemoteConfig::from_resource_config(&res_conf) {
                        Ok(remote) => conf.remotes.push(remote),
                        Err(err) => {
                            tracing::error!(remote = %name, error = %err,
                                "error reading remote config from node");
                        }
                    }
                } else if name.api.is_component() {
                    conf.components.push(res_conf);
                } else if name.api.is_service() && !name.api.is_internal() {
                    conf.services.push(res_conf);
                }
            }
        }
        if let Some(module_manager) = self.module_manager() {
            conf.modules = module_manager.module_configs();
        }
        conf
    }
}

fn is_public_resource(graph: &Graph, name: &ResourceName) -> bool {
    if name.api.is_remote() || name.api.is_internal() {
        return false;
    }
    graph.node(name).is_some_and(|node| node.has_resource())
}

/// Reads the per-resource configuration timeout, honoring the environment
/// override.
fn resource_configuration_timeout() -> Duration {
    match std::env::var(RESOURCE_CONFIGURATION_TIMEOUT_ENV) {
        Ok(raw) => match raw.parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(_) => {
                tracing::warn!(
                    value = %raw,
                    "invalid {RESOURCE_CONFIGURATION_TIMEOUT_ENV}; using default"
                );
                DEFAULT_RESOURCE_CONFIGURATION_TIMEOUT
            }
        },
        Err(_) => DEFAULT_RESOURCE_CONFIGURATION_TIMEOUT,
    }
}

/// Logs a periodic warning while an operation is still in flight; aborted
/// on drop.
pub(crate) struct SlowLogGuard {
    handle: tokio::task::JoinHandle<()>,
}

impl SlowLogGuard {
    pub(crate) fn new(name: ResourceName, message: &'static str) -> Self {
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(SLOW_OPERATION_WARNING).await;
                tracing::warn!(resource = %name, "{message}");
            }
        });
        Self { handle }
    }
}

impl Drop for SlowLogGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

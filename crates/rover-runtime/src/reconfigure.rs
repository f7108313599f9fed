//! The reconfiguration pass: level-ordered, bounded-parallel resource
//! (re)construction.

use crate::host::RuntimeHost;
use crate::manager::{ResourceManager, SlowLogGuard, LEVEL_PARALLELISM};
use rover_module::ModuleManager;
use rover_resource::node::RESOURCE_CLOSE_TIMEOUT;
use rover_resource::{
    Dependencies, GraphNode, Model, Resource, ResourceConfig, ResourceError, ResourceName,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// One node's worth of pending work within a level.
struct WorkItem {
    name: ResourceName,
    node: Arc<GraphNode>,
    conf: ResourceConfig,
}

/// Inputs describing the node's current object for the build task.
struct ExistingResource {
    resource: Arc<dyn Resource>,
    model: Option<Model>,
    needs_rebuild: bool,
}

/// What a build task produced. The supervising future applies the outcome to
/// the graph; the task itself never touches graph state, so a task that
/// outlives its timeout can only ever have its result discarded.
enum BuildOutcome {
    Success {
        resource: Arc<dyn Resource>,
        newly_built: bool,
    },
    Failure {
        err: ResourceError,
        old_closed: bool,
    },
}

impl ResourceManager {
    /// Drives construction and reconfiguration of every pending node to
    /// completion.
    ///
    /// Remotes are processed first since they may reveal unresolved
    /// dependencies; then dependencies are resolved and nodes are processed
    /// level by level in topological order, in parallel within a level.
    /// Individual failures are recorded on their nodes; only cancellation of
    /// `ctx` aborts the pass. A graph snapshot is saved on exit either way.
    pub async fn complete_config(
        &self,
        ctx: &CancellationToken,
        host: &Arc<dyn RuntimeHost>,
        force_sync: bool,
    ) {
        self.complete_config_inner(ctx, host, force_sync).await;
        self.save_snapshot();
    }

    async fn complete_config_inner(
        &self,
        ctx: &CancellationToken,
        host: &Arc<dyn RuntimeHost>,
        force_sync: bool,
    ) {
        // Remotes first: mounting their resources may satisfy local
        // dependencies.
        self.complete_config_for_remotes(ctx, host).await;
        if ctx.is_cancelled() {
            return;
        }

        // Resolve before sorting in case remotes revealed anything new.
        if let Err(err) = self.graph_mut().resolve_dependencies() {
            // The resolver already logged per-node details.
            tracing::debug!(error = %err, "error resolving dependencies");
        }

        let levels = self.graph().topological_sort_in_levels();
        for level in levels {
            if ctx.is_cancelled() {
                return;
            }
            let items = self.collect_level_work(&level);
            if items.is_empty() {
                continue;
            }

            // Weak and optional dependents must be consistent with all
            // resources constructed before this level.
            self.run_weak_update_if_stale(host, &items).await;

            let semaphore = Arc::new(Semaphore::new(LEVEL_PARALLELISM));
            let mut parallel = Vec::new();
            for item in items {
                if ctx.is_cancelled() {
                    break;
                }
                let synchronous =
                    force_sync || host.api_max_instance(&item.name.api) > 0;
                if synchronous {
                    self.process_node(ctx, host, item).await;
                } else {
                    let semaphore = semaphore.clone();
                    parallel.push(async move {
                        let _permit = semaphore.acquire().await.ok();
                        self.process_node(ctx, host, item).await;
                    });
                }
            }
            // All of level k completes (or times out) before level k+1.
            futures::future::join_all(parallel).await;
        }
    }

    fn collect_level_work(&self, level: &[ResourceName]) -> Vec<WorkItem> {
        let graph = self.graph();
        level
            .iter()
            .filter(|name| name.api.is_component() || name.api.is_service())
            .filter_map(|name| {
                let node = graph.node(name)?;
                if !node.needs_reconfigure()
                    || node.is_marked_for_removal()
                    || node.dependencies_unresolved()
                {
                    return None;
                }
                let conf = node.config()?;
                Some(WorkItem {
                    name: name.clone(),
                    node,
                    conf,
                })
            })
            .collect()
    }

    /// Runs the host's weak-dependent update when some node in the level
    /// observes weak collaborators and the graph has changed since the last
    /// pass. The logical-clock guard keeps this to at most one run per
    /// reconfiguration.
    async fn run_weak_update_if_stale(&self, host: &Arc<dyn RuntimeHost>, items: &[WorkItem]) {
        if !items
            .iter()
            .any(|item| item.conf.has_optional_dependencies())
        {
            return;
        }
        let clock = self.graph().logical_clock();
        if self.weak_round.load(Ordering::SeqCst) >= clock {
            return;
        }
        host.update_weak_and_optional_dependents().await;
        self.weak_round.store(clock, Ordering::SeqCst);
    }

    /// Processes one node: gathers dependencies, runs the build task under
    /// the per-resource timeout, and applies the outcome.
    ///
    /// The graph is only mutated here, by the supervising future, within the
    /// timeout window. A task that exceeds the timeout keeps running on the
    /// runtime but its result is discarded.
    async fn process_node(
        &self,
        ctx: &CancellationToken,
        host: &Arc<dyn RuntimeHost>,
        item: WorkItem,
    ) {
        let WorkItem { name, node, conf } = item;
        node.init_logger();
        let prefix = if node.is_uninitialized() { "" } else { "re" };
        tracing::info!(resource = %name, model = %conf.model, "now {prefix}configuring resource");

        // The config was validated when it arrived, but check again before
        // attempting to build.
        if let Err(err) = conf.validate() {
            node.log_and_set_last_error(err);
            return;
        }

        let deps = match self.dependencies_for(&name) {
            Ok(deps) => deps,
            Err(err) => {
                // An initialized node whose dependencies can no longer be
                // gathered cannot keep serving; close and unset it.
                if node.has_resource() {
                    if let Err(close_err) = node.close().await {
                        tracing::error!(resource = %name, error = %close_err,
                            "failed to close resource with missing dependencies");
                    }
                }
                node.log_and_set_last_error(err);
                self.mark_children_for_update(&name);
                return;
            }
        };
        let dep_names: Vec<String> = deps.keys().map(ToString::to_string).collect();
        let existing = node.unsafe_resource().ok().map(|resource| ExistingResource {
            resource,
            model: node.model(),
            needs_rebuild: node.needs_rebuild(),
        });

        let handle = tokio::spawn(build_resource(
            name.clone(),
            conf.clone(),
            deps,
            dep_names,
            existing,
            self.module_manager(),
            host.clone(),
        ));
        let _slow = SlowLogGuard::new(
            name.clone(),
            "waiting for resource to complete (re)configuration",
        );

        let result = tokio::select! {
            () = ctx.cancelled() => return,
            result = tokio::time::timeout(self.configuration_timeout, handle) => result,
        };

        match result {
            Err(_elapsed) => {
                // The task may still be running; it is barred from the graph
                // and whatever it produces is dropped with it.
                let err = ResourceError::BuildTimeout(name.to_string(), self.configuration_timeout);
                tracing::warn!(resource = %name, error = %err,
                    "timed out processing resource; discarding any late result");
                node.log_and_set_last_error(err);
            }
            Ok(Err(join_err)) => {
                node.log_and_set_last_error(ResourceError::build_failed(
                    &conf.name,
                    format!("resource build task failed: {join_err}"),
                ));
                self.mark_children_for_update(&name);
            }
            Ok(Ok(BuildOutcome::Success {
                resource,
                newly_built,
            })) => {
                node.swap_resource(resource, conf.model.clone());
                if newly_built {
                    self.mark_children_for_update(&name);
                }
                tracing::info!(resource = %name, model = %conf.model,
                    "successfully {prefix}configured resource");
            }
            Ok(Ok(BuildOutcome::Failure { err, old_closed })) => {
                if old_closed {
                    node.unset_resource();
                }
                node.log_and_set_last_error(err);
                self.mark_children_for_update(&name);
            }
        }
    }

    /// Gathers live objects for every resolved parent of `name`.
    fn dependencies_for(&self, name: &ResourceName) -> Result<Dependencies, ResourceError> {
        let graph = self.graph();
        let mut deps = Dependencies::new();
        for parent in graph.parents_of(name) {
            let node = graph
                .node(&parent)
                .ok_or_else(|| ResourceError::NotFound(parent.to_string()))?;
            let resource = node.resource().map_err(|err| {
                ResourceError::build_failed(
                    name.to_string(),
                    format!("dependency \"{parent}\" is not ready: {err}"),
                )
            })?;
            deps.insert(parent, resource);
        }
        Ok(deps)
    }
}

/// The build task proper. Runs detached from the graph: its only inputs are
/// snapshots taken by the supervisor, and its only output is the returned
/// outcome.
async fn build_resource(
    name: ResourceName,
    conf: ResourceConfig,
    deps: Dependencies,
    dep_names: Vec<String>,
    existing: Option<ExistingResource>,
    module_manager: Option<Arc<dyn ModuleManager>>,
    host: Arc<dyn RuntimeHost>,
) -> BuildOutcome {
    let modular = module_manager
        .as_ref()
        .is_some_and(|mm| mm.provides(&conf));
    if modular {
        if let Some(mm) = &module_manager {
            if let Err(err) = mm.validate_config(&conf).await {
                return BuildOutcome::Failure {
                    err: ResourceError::validation_failed(
                        &conf.name,
                        format!("modular resource config validation error: {err}"),
                    ),
                    old_closed: false,
                };
            }
        }
    }
    let module_for_build = if modular { module_manager } else { None };

    let Some(existing) = existing else {
        return match construct_resource(&conf, &deps, &dep_names, module_for_build.as_ref(), &host)
            .await
        {
            Ok(resource) => BuildOutcome::Success {
                resource,
                newly_built: true,
            },
            Err(err) => BuildOutcome::Failure {
                err,
                old_closed: false,
            },
        };
    };

    let same_model = existing.model.as_ref() == Some(&conf.model);
    if same_model && !existing.needs_rebuild {
        if let Some(mm) = &module_for_build {
            return match mm.reconfigure_resource(&conf, &dep_names).await {
                Ok(()) => BuildOutcome::Success {
                    resource: existing.resource,
                    newly_built: false,
                },
                Err(err) => BuildOutcome::Failure {
                    err: ResourceError::reconfigure_failed(&conf.name, err),
                    old_closed: false,
                },
            };
        }
        match existing.resource.reconfigure(&deps, &conf).await {
            Ok(()) => {
                return BuildOutcome::Success {
                    resource: existing.resource,
                    newly_built: false,
                }
            }
            Err(err) if err.is_must_rebuild() => {
                tracing::debug!(resource = %name, "in-place reconfigure requested a rebuild");
            }
            Err(err) => {
                return BuildOutcome::Failure {
                    err: ResourceError::reconfigure_failed(&conf.name, err),
                    old_closed: false,
                }
            }
        }
    } else if !same_model {
        tracing::info!(resource = %name, old_model = ?existing.model, new_model = %conf.model,
            "resource models differ so resource must be rebuilt");
    }

    // Rebuild path: close the old object (unless its module already tore it
    // down during the module's own reconfiguration), then construct fresh.
    if existing.needs_rebuild && modular {
        tracing::debug!(resource = %name, "object already closed by its module; skipping close");
    } else {
        match tokio::time::timeout(RESOURCE_CLOSE_TIMEOUT, existing.resource.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::error!(resource = %name, error = %err,
                    "error closing resource before rebuild");
            }
            Err(_) => {
                tracing::warn!(resource = %name, timeout = ?RESOURCE_CLOSE_TIMEOUT,
                    "close before rebuild exceeded deadline");
            }
        }
    }

    match construct_resource(&conf, &deps, &dep_names, module_for_build.as_ref(), &host).await {
        Ok(resource) => BuildOutcome::Success {
            resource,
            newly_built: true,
        },
        Err(err) => BuildOutcome::Failure {
            err,
            old_closed: true,
        },
    }
}

async fn construct_resource(
    conf: &ResourceConfig,
    deps: &Dependencies,
    dep_names: &[String],
    module: Option<&Arc<dyn ModuleManager>>,
    host: &Arc<dyn RuntimeHost>,
) -> Result<Arc<dyn Resource>, ResourceError> {
    if let Some(mm) = module {
        mm.add_resource(conf, dep_names)
            .await
            .map_err(|err| ResourceError::build_failed(&conf.name, err))
    } else {
        host.new_resource(conf, deps.clone())
            .await
            .map_err(|err| ResourceError::build_failed(&conf.name, err))
    }
}

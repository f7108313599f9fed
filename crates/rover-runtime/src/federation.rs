//! Remote machine federation: dialing peers and mounting their resources.

use crate::host::RuntimeHost;
use crate::manager::{ResourceManager, REMOTE_DIAL_PARALLELISM, REMOTE_MACHINE_STATUS_TIMEOUT};
use rover_config::RemoteConfig;
use rover_remote::{CloudMetadata, DialError, DialOptions, RemoteResource, RemoteRobot};
use rover_resource::{Api, GraphNode, Model, ResourceError, ResourceName};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

impl ResourceManager {
    /// Dials every remote node that needs (re)configuration, with bounded
    /// parallelism. Useful when many remotes are offline or slow to start.
    pub(crate) async fn complete_config_for_remotes(
        &self,
        ctx: &CancellationToken,
        host: &Arc<dyn RuntimeHost>,
    ) {
        let pending: Vec<(ResourceName, Arc<GraphNode>)> = {
            let graph = self.graph();
            graph
                .find_by_api(&Api::remote())
                .into_iter()
                .filter_map(|name| {
                    let node = graph.node(&name)?;
                    (node.needs_reconfigure() && !node.is_marked_for_removal())
                        .then_some((name, node))
                })
                .collect()
        };
        if pending.is_empty() {
            return;
        }

        let semaphore = Arc::new(Semaphore::new(REMOTE_DIAL_PARALLELISM));
        let dials: Vec<_> = pending
            .into_iter()
            .map(|(name, node)| {
                let semaphore = semaphore.clone();
                async move {
                    let _permit = semaphore.acquire().await.ok();
                    if ctx.is_cancelled() {
                        return;
                    }
                    self.process_remote_node(ctx, host, name, node).await;
                }
            })
            .collect();
        futures::future::join_all(dials).await;
    }

    /// Dials one remote and mounts its advertised resources.
    async fn process_remote_node(
        &self,
        ctx: &CancellationToken,
        host: &Arc<dyn RuntimeHost>,
        name: ResourceName,
        node: Arc<GraphNode>,
    ) {
        node.init_logger();
        let verb = if node.is_uninitialized() {
            "configuring"
        } else {
            "reconfiguring"
        };
        tracing::info!(remote = %name, "now {verb} a remote");

        let Some(conf) = node.config() else {
            node.log_and_set_last_error(ResourceError::validation_failed(
                name.to_string(),
                "remote node has no config",
            ));
            return;
        };
        let remote_conf = match RemoteConfig::from_resource_config(&conf) {
            Ok(remote_conf) => remote_conf,
            Err(err) => {
                node.log_and_set_last_error(err);
                return;
            }
        };
        // The config was validated when it arrived, but check again before
        // attempting to dial.
        if let Err(err) = remote_conf.validate() {
            node.log_and_set_last_error(err);
            return;
        }

        // A modified remote keeps its node; close the old client before
        // making a new one.
        if node.has_resource() {
            self.drop_remote_client(&remote_conf.name);
            if let Err(err) = node.close().await {
                tracing::error!(remote = %name, error = %err,
                    "failed to close previous remote client");
            }
        }

        let mut opts =
            DialOptions::from_remote(&remote_conf, self.options().allow_insecure_creds, self.options().debug);
        if opts.tls.is_none() {
            opts.tls = self.options().tls.clone();
        }
        tracing::info!(remote = %remote_conf.name, address = %remote_conf.address,
            "connecting now to remote");
        let client = match self.dialer().dial(&remote_conf, opts).await {
            Ok(client) => client,
            Err(DialError::InsecureCredentials) => {
                node.log_and_set_last_error(ResourceError::InsecureCredsRejected(
                    remote_conf.name.clone(),
                ));
                return;
            }
            Err(err) => {
                node.log_and_set_last_error(ResourceError::remote_unreachable(
                    &remote_conf.name,
                    format!(
                        "couldn't connect to machine remote ({}): {err}",
                        remote_conf.address
                    ),
                ));
                return;
            }
        };
        tracing::info!(remote = %remote_conf.name, "connected now to remote");

        node.swap_resource(
            Arc::new(RemoteResource::new(name.clone(), client.clone())),
            Model::builtin(),
        );
        self.set_remote_client(remote_conf.name.clone(), client.clone());
        self.update_remote_resource_names(ctx, &name, &client, true)
            .await;

        // Structural changes on the peer come back as a callback to the
        // host, never as a graph edge; the graph stays acyclic.
        let notify_host = host.clone();
        let remote_name = remote_conf.name.clone();
        client.set_parent_notifier(Box::new(move || {
            notify_host.notify_remote_change(&remote_name);
        }));
    }

    /// Names of the resources currently mounted under `remote`.
    pub(crate) fn remote_resource_names(&self, remote: &ResourceName) -> Vec<ResourceName> {
        let graph = self.graph();
        if graph.node(remote).is_none() {
            tracing::error!(remote = %remote,
                "trying to get remote resources of a non existing remote");
            return Vec::new();
        }
        graph
            .children_of(remote)
            .into_iter()
            .filter(ResourceName::is_foreign)
            .collect()
    }

    /// Pulls the remote's current resource names and updates the graph,
    /// adding, refreshing, or removing foreign nodes accordingly. Names are
    /// mounted prefixed with the remote's name and wired as children of the
    /// remote node.
    ///
    /// With `recreate_all` set (a reconfiguration), existing duplicate-name
    /// clients are closed and re-added; otherwise (a steady-state refresh)
    /// they are left alone.
    ///
    /// When the peer reports no names at all, the connection is broken: the
    /// remote's subtree is marked unreachable and nothing else changes.
    ///
    /// Returns true if the resource graph changed.
    pub async fn update_remote_resource_names(
        &self,
        ctx: &CancellationToken,
        remote_name: &ResourceName,
        client: &Arc<dyn RemoteRobot>,
        recreate_all: bool,
    ) -> bool {
        tracing::debug!(remote = %remote_name, recreate_all, "updating remote resource names");

        let Some(new_resources) = client.resource_names().await else {
            if let Err(err) = self.graph().mark_reachability(remote_name, false) {
                tracing::error!(remote = %remote_name, error = %err,
                    "unable to mark remote resources as unreachable");
            }
            return false;
        };
        if let Err(err) = self.graph().mark_reachability(remote_name, true) {
            tracing::error!(remote = %remote_name, error = %err,
                "unable to mark remote resources as reachable");
        }

        let mut active: HashMap<ResourceName, bool> = self
            .remote_resource_names(remote_name)
            .into_iter()
            .map(|name| (name, false))
            .collect();
        let mut changed = false;

        for res_name in new_resources {
            if ctx.is_cancelled() {
                return changed;
            }
            let stub = match client.resource_by_name(&res_name).await {
                Ok(stub) => stub,
                Err(err) => {
                    tracing::debug!(remote = %remote_name, resource = %res_name, error = %err,
                        "couldn't obtain remote resource interface");
                    continue;
                }
            };
            let prefixed = res_name.prepend_remote(remote_name.name.clone());

            if let Some(seen) = active.get_mut(&prefixed) {
                *seen = true;
                let existing = self.graph().node(&prefixed);
                if let Some(existing) = existing.filter(|node| !node.is_uninitialized()) {
                    if !recreate_all {
                        // Steady-state tick; no need to churn duplicate-name
                        // clients.
                        continue;
                    }
                    // The remote may have changed across a reconfiguration;
                    // close the old client and install the new one below.
                    self.mark_children_for_update(&prefixed);
                    if let Err(err) = existing.close().await {
                        tracing::error!(resource = %prefixed, error = %err,
                            "failed to close remote resource node");
                    }
                }
            }

            let mut graph = self.graph_mut();
            if let Some(existing) = graph.node(&prefixed) {
                existing.swap_resource(stub, Model::unknown());
            } else {
                let node = GraphNode::configured(prefixed.clone(), None, stub, Model::unknown());
                if let Err(err) = graph.add_node(node) {
                    tracing::error!(resource = %prefixed, error = %err,
                        "failed to add remote resource node");
                    continue;
                }
            }
            match graph.add_child(&prefixed, remote_name) {
                Ok(()) => changed = true,
                Err(err) => {
                    tracing::error!(resource = %prefixed, error = %err,
                        "error while trying to add node as a dependency of remote");
                }
            }
        }

        // Anything previously mounted that did not come back is gone from
        // the peer: close it and remove its node.
        for (res_name, seen) in active {
            if seen {
                continue;
            }
            tracing::debug!(resource = %res_name, "attempting to remove remote resource");
            let node = self.graph().node(&res_name);
            let Some(node) = node else {
                continue;
            };
            if node.is_uninitialized() {
                tracing::debug!(resource = %res_name, "remote resource already removed");
            } else {
                self.mark_children_for_update(&res_name);
                if let Err(err) = node.close().await {
                    tracing::error!(resource = %res_name, error = %err,
                        "failed to close remote resource node");
                }
            }
            self.graph_mut().remove_node(&res_name);
            changed = true;
        }

        if changed {
            tracing::debug!(remote = %remote_name,
                "remote resource names update completed with changes to resource graph");
        }
        changed
    }

    /// Steady-state refresh of every connected remote's resource names,
    /// without recreating existing clients. Returns true if anything
    /// changed.
    pub async fn refresh_remote_resource_names(&self, ctx: &CancellationToken) -> bool {
        let remotes = self.graph().find_by_api(&Api::remote());
        let mut changed = false;
        for name in remotes {
            if ctx.is_cancelled() {
                break;
            }
            let Some(client) = self.remote_client(&name.name) else {
                continue;
            };
            changed |= self
                .update_remote_resource_names(ctx, &name, &client, false)
                .await;
        }
        changed
    }

    /// Collects cloud metadata for every connected remote and, through each
    /// remote's machine status, for the resources nested behind it. Status
    /// calls are bounded by [`REMOTE_MACHINE_STATUS_TIMEOUT`] so
    /// remote-to-remote cycles cannot block local status assembly.
    pub async fn remote_resource_metadata(&self) -> HashMap<ResourceName, CloudMetadata> {
        let mut out = HashMap::new();
        for name in self.graph().find_by_api(&Api::remote()) {
            let Some(client) = self.remote_client(&name.name) else {
                continue;
            };
            match tokio::time::timeout(REMOTE_MACHINE_STATUS_TIMEOUT, client.cloud_metadata()).await
            {
                Ok(Ok(metadata)) => {
                    out.insert(name.clone(), metadata);
                }
                Ok(Err(err)) => {
                    tracing::debug!(remote = %name, error = %err,
                        "error getting remote cloud metadata");
                }
                Err(_) => {
                    tracing::debug!(remote = %name, "timed out getting remote cloud metadata");
                }
            }
            match tokio::time::timeout(REMOTE_MACHINE_STATUS_TIMEOUT, client.machine_status()).await
            {
                Ok(Ok(status)) => {
                    // Names come back without the remote prefix; add it back.
                    for resource in status.resources {
                        out.insert(
                            resource.name.prepend_remote(name.name.clone()),
                            resource.cloud_metadata,
                        );
                    }
                }
                Ok(Err(err)) => {
                    tracing::debug!(remote = %name, error = %err,
                        "error getting remote machine status");
                }
                Err(_) => {
                    tracing::debug!(remote = %name, "timed out getting remote machine status");
                }
            }
        }
        out
    }
}

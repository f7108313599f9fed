//! Shared test doubles for resource manager integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use rover_config::{ConfigDiff, ModuleConfig, RemoteConfig};
use rover_module::{ModuleError, ModuleManager, ValidationReport};
use rover_remote::{
    CloudMetadata, DialError, DialOptions, Dialer, MachineStatus, ParentNotifier, RemoteRobot,
    ResourceStatus,
};
use rover_resource::{
    Api, Dependencies, Model, Resource, ResourceConfig, ResourceError, ResourceName,
};
use rover_runtime::{ResourceManager, ResourceManagerOptions, RuntimeHost};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Shared counters recording constructor, reconfigure, and close calls.
#[derive(Default)]
pub struct BuildCounters {
    built: Mutex<Vec<String>>,
    reconfigured: Mutex<Vec<String>>,
    closed: Mutex<Vec<String>>,
    double_closes: AtomicUsize,
}

impl BuildCounters {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn key(conf: &ResourceConfig) -> String {
        format!("{}:{}", conf.name, conf.model)
    }

    pub fn record_build(&self, conf: &ResourceConfig) {
        self.built.lock().unwrap().push(Self::key(conf));
    }

    pub fn builds(&self, key: &str) -> usize {
        self.built.lock().unwrap().iter().filter(|k| k == &key).count()
    }

    pub fn total_builds(&self) -> usize {
        self.built.lock().unwrap().len()
    }

    pub fn reconfigures(&self, key: &str) -> usize {
        self.reconfigured
            .lock()
            .unwrap()
            .iter()
            .filter(|k| k == &key)
            .count()
    }

    pub fn total_reconfigures(&self) -> usize {
        self.reconfigured.lock().unwrap().len()
    }

    pub fn closes(&self, key: &str) -> usize {
        self.closed.lock().unwrap().iter().filter(|k| k == &key).count()
    }

    pub fn total_closes(&self) -> usize {
        self.closed.lock().unwrap().len()
    }

    /// Number of objects that received more than one close call.
    pub fn double_closes(&self) -> usize {
        self.double_closes.load(Ordering::SeqCst)
    }
}

/// A fake resource whose reconfigure behaviour is driven by config
/// attributes:
///
/// - `"must_rebuild": true` makes reconfigure request a rebuild;
/// - `"fail_reconfigure": true` makes reconfigure fail outright.
pub struct FakeResource {
    name: ResourceName,
    key: String,
    counters: Arc<BuildCounters>,
    closed: AtomicBool,
}

impl FakeResource {
    pub fn new(conf: &ResourceConfig, counters: Arc<BuildCounters>) -> Self {
        Self {
            name: conf.resource_name(),
            key: BuildCounters::key(conf),
            counters,
            closed: AtomicBool::new(false),
        }
    }

    pub fn stub(name: ResourceName, counters: Arc<BuildCounters>) -> Self {
        Self {
            key: format!("stub:{name}"),
            name,
            counters,
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Resource for FakeResource {
    fn name(&self) -> ResourceName {
        self.name.clone()
    }

    async fn reconfigure(
        &self,
        _deps: &Dependencies,
        conf: &ResourceConfig,
    ) -> Result<(), ResourceError> {
        if conf
            .attributes
            .get("must_rebuild")
            .is_some_and(|v| v.as_bool() == Some(true))
        {
            return Err(ResourceError::MustRebuild);
        }
        if conf
            .attributes
            .get("fail_reconfigure")
            .is_some_and(|v| v.as_bool() == Some(true))
        {
            return Err(ResourceError::reconfigure_failed(&conf.name, "induced"));
        }
        self.counters
            .reconfigured
            .lock()
            .unwrap()
            .push(BuildCounters::key(conf));
        Ok(())
    }

    async fn close(&self) -> Result<(), ResourceError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            self.counters.double_closes.fetch_add(1, Ordering::SeqCst);
        }
        self.counters.closed.lock().unwrap().push(self.key.clone());
        Ok(())
    }
}

/// Host double building [`FakeResource`]s, with per-name hang/fail hooks.
#[derive(Default)]
pub struct FakeHost {
    pub counters: Arc<BuildCounters>,
    pub hang_builds: Mutex<HashSet<String>>,
    pub fail_builds: Mutex<HashSet<String>>,
    pub weak_updates: AtomicUsize,
    pub remote_changes: Mutex<Vec<String>>,
}

impl FakeHost {
    pub fn new(counters: Arc<BuildCounters>) -> Arc<Self> {
        Arc::new(Self {
            counters,
            ..Self::default()
        })
    }

    pub fn hang_build(&self, name: &str) {
        self.hang_builds.lock().unwrap().insert(name.to_string());
    }

    pub fn fail_build(&self, name: &str) {
        self.fail_builds.lock().unwrap().insert(name.to_string());
    }

    pub fn weak_updates(&self) -> usize {
        self.weak_updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RuntimeHost for FakeHost {
    async fn new_resource(
        &self,
        conf: &ResourceConfig,
        _deps: Dependencies,
    ) -> Result<Arc<dyn Resource>, ResourceError> {
        if self.hang_builds.lock().unwrap().contains(&conf.name) {
            tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
        }
        if self.fail_builds.lock().unwrap().contains(&conf.name) {
            return Err(ResourceError::build_failed(&conf.name, "induced build failure"));
        }
        self.counters.record_build(conf);
        Ok(Arc::new(FakeResource::new(conf, self.counters.clone())))
    }

    async fn update_weak_and_optional_dependents(&self) {
        self.weak_updates.fetch_add(1, Ordering::SeqCst);
    }

    fn notify_remote_change(&self, remote_name: &str) {
        self.remote_changes
            .lock()
            .unwrap()
            .push(remote_name.to_string());
    }
}

/// A fake connected peer with a mutable advertised-resource set.
#[derive(Default)]
pub struct FakeRemoteRobot {
    advertised: Mutex<Option<Vec<ResourceName>>>,
    pub counters: Arc<BuildCounters>,
    notifier: Mutex<Option<ParentNotifier>>,
    pub close_count: AtomicUsize,
}

impl FakeRemoteRobot {
    pub fn new(counters: Arc<BuildCounters>, advertised: Vec<ResourceName>) -> Arc<Self> {
        Arc::new(Self {
            advertised: Mutex::new(Some(advertised)),
            counters,
            ..Self::default()
        })
    }

    /// Simulates a broken connection: resource enumeration returns nothing.
    pub fn disconnect(&self) {
        *self.advertised.lock().unwrap() = None;
    }

    /// Restores the connection with a new advertised set.
    pub fn reconnect(&self, advertised: Vec<ResourceName>) {
        *self.advertised.lock().unwrap() = Some(advertised);
    }

    /// Fires the registered parent notifier, as the peer would on a
    /// structural change.
    pub fn trigger_change(&self) {
        if let Some(notifier) = self.notifier.lock().unwrap().as_ref() {
            notifier();
        }
    }
}

#[async_trait]
impl RemoteRobot for FakeRemoteRobot {
    async fn resource_names(&self) -> Option<Vec<ResourceName>> {
        self.advertised.lock().unwrap().clone()
    }

    async fn resource_by_name(
        &self,
        name: &ResourceName,
    ) -> Result<Arc<dyn Resource>, ResourceError> {
        Ok(Arc::new(FakeResource::stub(
            name.clone(),
            self.counters.clone(),
        )))
    }

    async fn cloud_metadata(&self) -> Result<CloudMetadata, ResourceError> {
        Ok(CloudMetadata {
            machine_id: "machine-1".to_string(),
            ..CloudMetadata::default()
        })
    }

    async fn machine_status(&self) -> Result<MachineStatus, ResourceError> {
        let resources = self
            .advertised
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_default()
            .into_iter()
            .map(|name| ResourceStatus {
                name,
                cloud_metadata: CloudMetadata::default(),
            })
            .collect();
        Ok(MachineStatus { resources })
    }

    fn set_parent_notifier(&self, notifier: ParentNotifier) {
        *self.notifier.lock().unwrap() = Some(notifier);
    }

    async fn close(&self) -> Result<(), ResourceError> {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Dialer double handing out pre-registered [`FakeRemoteRobot`]s.
#[derive(Default)]
pub struct FakeDialer {
    remotes: Mutex<HashMap<String, Arc<FakeRemoteRobot>>>,
    unreachable: Mutex<HashSet<String>>,
    insecure_rejected: Mutex<HashSet<String>>,
    pub dial_count: AtomicUsize,
}

impl FakeDialer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, name: &str, robot: Arc<FakeRemoteRobot>) {
        self.remotes.lock().unwrap().insert(name.to_string(), robot);
    }

    pub fn set_unreachable(&self, name: &str) {
        self.unreachable.lock().unwrap().insert(name.to_string());
    }

    pub fn set_insecure_rejected(&self, name: &str) {
        self.insecure_rejected
            .lock()
            .unwrap()
            .insert(name.to_string());
    }
}

#[async_trait]
impl Dialer for FakeDialer {
    async fn dial(
        &self,
        conf: &RemoteConfig,
        _opts: DialOptions,
    ) -> Result<Arc<dyn RemoteRobot>, DialError> {
        self.dial_count.fetch_add(1, Ordering::SeqCst);
        if self.insecure_rejected.lock().unwrap().contains(&conf.name) {
            return Err(DialError::InsecureCredentials);
        }
        if self.unreachable.lock().unwrap().contains(&conf.name) {
            return Err(DialError::Unreachable(format!(
                "no route to {}",
                conf.address
            )));
        }
        let robot = self
            .remotes
            .lock()
            .unwrap()
            .get(&conf.name)
            .cloned()
            .ok_or_else(|| DialError::Unreachable(format!("unknown remote {}", conf.name)))?;
        Ok(robot)
    }
}

/// Module bridge double. Provides every config whose model namespace is
/// `modfam`.
#[derive(Default)]
pub struct FakeModuleManager {
    pub counters: Arc<BuildCounters>,
    resources: Mutex<HashSet<ResourceName>>,
    modules: Mutex<Vec<ModuleConfig>>,
    removed_resources: Mutex<Vec<ResourceName>>,
    pub killed: AtomicBool,
    pub closed: AtomicBool,
}

impl FakeModuleManager {
    pub fn new(counters: Arc<BuildCounters>) -> Arc<Self> {
        Arc::new(Self {
            counters,
            ..Self::default()
        })
    }

    pub fn removed_resources(&self) -> Vec<ResourceName> {
        self.removed_resources.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModuleManager for FakeModuleManager {
    fn provides(&self, conf: &ResourceConfig) -> bool {
        conf.model.namespace == "modfam"
    }

    async fn validate_config(
        &self,
        _conf: &ResourceConfig,
    ) -> Result<ValidationReport, ModuleError> {
        Ok(ValidationReport::default())
    }

    async fn add_resource(
        &self,
        conf: &ResourceConfig,
        _deps: &[String],
    ) -> Result<Arc<dyn Resource>, ModuleError> {
        self.counters.record_build(conf);
        self.resources.lock().unwrap().insert(conf.resource_name());
        Ok(Arc::new(FakeResource::new(conf, self.counters.clone())))
    }

    async fn reconfigure_resource(
        &self,
        conf: &ResourceConfig,
        _deps: &[String],
    ) -> Result<(), ModuleError> {
        self.counters
            .reconfigured
            .lock()
            .unwrap()
            .push(format!("{}:{}", conf.name, conf.model));
        Ok(())
    }

    async fn remove_resource(&self, name: &ResourceName) -> Result<(), ModuleError> {
        self.resources.lock().unwrap().remove(name);
        self.removed_resources.lock().unwrap().push(name.clone());
        Ok(())
    }

    fn is_modular_resource(&self, name: &ResourceName) -> bool {
        self.resources.lock().unwrap().contains(name)
    }

    async fn add_modules(&self, confs: &[ModuleConfig]) -> Result<(), ModuleError> {
        self.modules.lock().unwrap().extend(confs.iter().cloned());
        Ok(())
    }

    async fn reconfigure_module(
        &self,
        _conf: &ModuleConfig,
    ) -> Result<Vec<ResourceName>, ModuleError> {
        // The real bridge restarts the process, closing served resources.
        Ok(self.resources.lock().unwrap().iter().cloned().collect())
    }

    async fn remove_module(&self, name: &str) -> Result<Vec<ResourceName>, ModuleError> {
        self.modules.lock().unwrap().retain(|m| m.name != name);
        Ok(self.resources.lock().unwrap().iter().cloned().collect())
    }

    async fn resolve_implicit_dependencies(
        &self,
        _diff: &mut ConfigDiff,
    ) -> Result<(), ModuleError> {
        Ok(())
    }

    fn module_configs(&self) -> Vec<ModuleConfig> {
        self.modules.lock().unwrap().clone()
    }

    fn kill(&self) {
        self.killed.store(true, Ordering::SeqCst);
    }

    async fn close(&self) -> Result<(), ModuleError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// Assembly helpers
// =============================================================================

pub fn new_manager(dialer: Arc<FakeDialer>) -> ResourceManager {
    ResourceManager::new(dialer, ResourceManagerOptions::default())
}

pub fn component(name: &str, subtype: &str, model: &str, deps: &[&str]) -> ResourceConfig {
    let mut conf = ResourceConfig::new(
        Api::component(subtype),
        model.parse::<Model>().unwrap(),
        name,
    );
    conf.depends_on = deps.iter().map(ToString::to_string).collect();
    conf
}

pub fn component_name(subtype: &str, name: &str) -> ResourceName {
    ResourceName::new(Api::component(subtype), name)
}

/// Runs one full reconfiguration round the way an embedding host does:
/// mark removals, close removed objects, apply the diff, drive construction,
/// sweep marked nodes.
pub async fn reconfigure(
    manager: &ResourceManager,
    host: &Arc<dyn RuntimeHost>,
    diff: &ConfigDiff,
) -> Result<(), ResourceError> {
    let ctx = CancellationToken::new();
    let (close_first, _marked, _rebuild) = manager.mark_removed(&diff.removed).await;
    for node in close_first {
        if let Err(err) = node.close().await {
            tracing::debug!(error = %err, "error closing removed resource");
        }
    }
    let marked_result = manager.update_resources(diff).await;
    manager.complete_config(&ctx, host, false).await;
    let _ = manager.remove_marked_and_close(&HashSet::new()).await;
    marked_result
}

//! Module bridge scenarios: delegated construction, module restarts, and
//! module removal.

mod common;

use common::{
    component, component_name, new_manager, reconfigure, BuildCounters, FakeDialer, FakeHost,
    FakeModuleManager,
};
use rover_config::{ConfigDiff, ModuleConfig};
use rover_module::ModuleManager;
use rover_runtime::RuntimeHost;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn modular_diff() -> ConfigDiff {
    let mut diff = ConfigDiff::default();
    diff.new_revision = "rev-1".to_string();
    diff.added.modules = vec![ModuleConfig::new("acme-mod", "/opt/acme/bin/module")];
    diff.added.components = vec![component("gizmo1", "gizmo", "modfam:widget:gizmo", &[])];
    diff
}

#[tokio::test]
async fn test_modular_resource_is_built_through_the_bridge() {
    let counters = BuildCounters::new();
    let host_counters = BuildCounters::new();
    let host: Arc<dyn RuntimeHost> = FakeHost::new(host_counters.clone());
    let manager = new_manager(FakeDialer::new());
    let bridge = FakeModuleManager::new(counters.clone());
    manager.start_module_manager(bridge.clone());

    reconfigure(&manager, &host, &modular_diff()).await.unwrap();

    // The bridge built it; the host constructor was never consulted.
    assert_eq!(counters.builds("gizmo1:modfam:widget:gizmo"), 1);
    assert_eq!(host_counters.total_builds(), 0);
    assert!(manager
        .resource_by_name(&component_name("gizmo", "gizmo1"))
        .is_ok());
    assert!(bridge.is_modular_resource(&component_name("gizmo", "gizmo1")));
}

#[tokio::test]
async fn test_module_reconfigure_rebuilds_without_closing_again() {
    let counters = BuildCounters::new();
    let host: Arc<dyn RuntimeHost> = FakeHost::new(BuildCounters::new());
    let manager = new_manager(FakeDialer::new());
    let bridge = FakeModuleManager::new(counters.clone());
    manager.start_module_manager(bridge.clone());
    reconfigure(&manager, &host, &modular_diff()).await.unwrap();

    // Restarting the module invalidates its resources; the module closes
    // them itself, so the rebuild must not close them a second time.
    let mut restart = ConfigDiff::default();
    restart.new_revision = "rev-2".to_string();
    restart.modified.modules = vec![ModuleConfig::new("acme-mod", "/opt/acme/bin/module-v2")];
    reconfigure(&manager, &host, &restart).await.unwrap();

    assert_eq!(counters.builds("gizmo1:modfam:widget:gizmo"), 2);
    assert_eq!(counters.closes("gizmo1:modfam:widget:gizmo"), 0);
    assert!(manager
        .resource_by_name(&component_name("gizmo", "gizmo1"))
        .is_ok());
}

#[tokio::test]
async fn test_module_removal_tears_down_resources_until_reconfigured() {
    let counters = BuildCounters::new();
    let host: Arc<dyn RuntimeHost> = FakeHost::new(BuildCounters::new());
    let manager = new_manager(FakeDialer::new());
    let bridge = FakeModuleManager::new(counters.clone());
    manager.start_module_manager(bridge.clone());
    reconfigure(&manager, &host, &modular_diff()).await.unwrap();

    // Removing the module and its component drops the node entirely.
    let mut removal = ConfigDiff::default();
    removal.new_revision = "rev-2".to_string();
    removal.removed.modules = vec![ModuleConfig::new("acme-mod", "/opt/acme/bin/module")];
    removal.removed.components = vec![component("gizmo1", "gizmo", "modfam:widget:gizmo", &[])];
    reconfigure(&manager, &host, &removal).await.unwrap();

    assert!(!manager.names().contains(&component_name("gizmo", "gizmo1")));
    assert!(bridge.module_configs().is_empty());
}

#[tokio::test]
async fn test_added_module_wins_over_modified_entry() {
    let counters = BuildCounters::new();
    let host: Arc<dyn RuntimeHost> = FakeHost::new(BuildCounters::new());
    let manager = new_manager(FakeDialer::new());
    let bridge = FakeModuleManager::new(counters.clone());
    manager.start_module_manager(bridge.clone());

    // The same module name in both lists: added wins, so no module restart
    // (and thus no resource invalidation) happens.
    let mut diff = modular_diff();
    diff.modified.modules = vec![ModuleConfig::new("acme-mod", "/somewhere/else")];
    reconfigure(&manager, &host, &diff).await.unwrap();

    assert_eq!(counters.builds("gizmo1:modfam:widget:gizmo"), 1);
    let registered = bridge.module_configs();
    assert_eq!(registered.len(), 1);
    assert_eq!(
        registered[0].exe_path.to_str(),
        Some("/opt/acme/bin/module")
    );
}

#[tokio::test]
async fn test_manager_close_shuts_down_bridge_last_and_kill_forwards() {
    let counters = BuildCounters::new();
    let host: Arc<dyn RuntimeHost> = FakeHost::new(BuildCounters::new());
    let manager = new_manager(FakeDialer::new());
    let bridge = FakeModuleManager::new(counters.clone());
    manager.start_module_manager(bridge.clone());
    reconfigure(&manager, &host, &modular_diff()).await.unwrap();

    manager.close().await.unwrap();
    assert!(bridge.closed.load(Ordering::SeqCst));
    // The modular resource was detached from its module during the sweep.
    assert_eq!(bridge.removed_resources().len(), 1);

    manager.kill();
    assert!(bridge.killed.load(Ordering::SeqCst));
}

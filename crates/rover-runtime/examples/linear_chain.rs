//! Builds a three-resource dependency chain, reconfigures it, and prints the
//! resulting graph as DOT.
//!
//! ```sh
//! cargo run --example linear_chain
//! ```

use async_trait::async_trait;
use rover_config::{ConfigDiff, RemoteConfig};
use rover_remote::{DialError, DialOptions, Dialer, RemoteRobot};
use rover_resource::{Api, Dependencies, Model, Resource, ResourceConfig, ResourceError, ResourceName};
use rover_runtime::{ResourceManager, ResourceManagerOptions, RuntimeHost};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

struct DemoResource {
    name: ResourceName,
}

#[async_trait]
impl Resource for DemoResource {
    fn name(&self) -> ResourceName {
        self.name.clone()
    }

    async fn reconfigure(
        &self,
        _deps: &Dependencies,
        conf: &ResourceConfig,
    ) -> Result<(), ResourceError> {
        tracing::info!(resource = %conf.name, "demo resource reconfigured in place");
        Ok(())
    }

    async fn close(&self) -> Result<(), ResourceError> {
        tracing::info!(resource = %self.name, "demo resource closed");
        Ok(())
    }
}

struct DemoHost;

#[async_trait]
impl RuntimeHost for DemoHost {
    async fn new_resource(
        &self,
        conf: &ResourceConfig,
        deps: Dependencies,
    ) -> Result<Arc<dyn Resource>, ResourceError> {
        tracing::info!(resource = %conf.name, deps = deps.len(), "demo constructor invoked");
        Ok(Arc::new(DemoResource {
            name: conf.resource_name(),
        }))
    }

    async fn update_weak_and_optional_dependents(&self) {}
}

/// This demo has no peers to dial.
struct NoRemotes;

#[async_trait]
impl Dialer for NoRemotes {
    async fn dial(
        &self,
        conf: &RemoteConfig,
        _opts: DialOptions,
    ) -> Result<Arc<dyn RemoteRobot>, DialError> {
        Err(DialError::Unreachable(format!(
            "demo cannot reach {}",
            conf.address
        )))
    }
}

fn component(name: &str, subtype: &str, deps: &[&str]) -> ResourceConfig {
    let mut conf = ResourceConfig::new(
        Api::component(subtype),
        Model::new("demo", subtype, "fake"),
        name,
    );
    conf.depends_on = deps.iter().map(ToString::to_string).collect();
    conf
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let manager = ResourceManager::new(Arc::new(NoRemotes), ResourceManagerOptions::default());
    let host: Arc<dyn RuntimeHost> = Arc::new(DemoHost);
    let ctx = CancellationToken::new();

    let mut diff = ConfigDiff {
        new_revision: "demo-rev-1".to_string(),
        ..ConfigDiff::default()
    };
    diff.added.components = vec![
        component("board1", "board", &[]),
        component("encoder1", "encoder", &["board1"]),
        component("motor1", "motor", &["board1", "encoder1"]),
    ];

    manager.update_resources(&diff).await?;
    manager.complete_config(&ctx, &host, false).await;

    println!("{}", manager.export_dot(0)?.snapshot.dot);

    manager.close().await?;
    Ok(())
}

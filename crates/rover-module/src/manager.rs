//! The interface the reconfiguration engine consumes to reach modules.

use async_trait::async_trait;
use rover_config::{ConfigDiff, ModuleConfig};
use rover_error::CommonError;
use rover_resource::{Resource, ResourceConfig, ResourceName};
use std::sync::Arc;
use thiserror::Error;

/// Errors from module bridge operations.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// A shared cross-crate failure kind.
    #[error(transparent)]
    Common(#[from] CommonError),

    /// The module process crashed or refused the request.
    #[error("module \"{module}\": {reason}")]
    Module {
        /// The module's configured name.
        module: String,
        /// What went wrong.
        reason: String,
    },

    /// The bridge does not provide the requested resource.
    #[error("no module provides \"{0}\"")]
    NotProvided(String),
}

impl ModuleError {
    /// Creates a module-process error.
    #[must_use]
    pub fn module(module: impl Into<String>, reason: impl ToString) -> Self {
        Self::Module {
            module: module.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result of validating a resource config against its providing module.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Dependencies the module requires; they order the build like explicit
    /// dependencies.
    pub implicit_deps: Vec<String>,
    /// Dependencies the module observes without requiring build ordering.
    pub optional_deps: Vec<String>,
}

/// Bridge to out-of-process resource providers.
///
/// The engine treats modular resources identically to native ones for graph
/// purposes; only construction, reconfiguration, and removal are delegated
/// through this trait. When a module is reconfigured or removed, the bridge
/// returns the names of resources the engine must rebuild.
///
/// When two modules advertise the same API and model, the first registration
/// wins; the bridge arbitrates, the engine only asks `provides`.
#[async_trait]
pub trait ModuleManager: Send + Sync {
    /// Returns true if some registered module provides implementations for
    /// this config's API and model.
    fn provides(&self, conf: &ResourceConfig) -> bool;

    /// Validates the config with its providing module, returning the
    /// dependencies the module declares.
    ///
    /// # Errors
    ///
    /// Returns an error when no module provides the config or the module
    /// rejects it.
    async fn validate_config(&self, conf: &ResourceConfig) -> Result<ValidationReport, ModuleError>;

    /// Asks the providing module to construct the resource.
    ///
    /// The returned object is a client stub for the module-hosted resource;
    /// the engine installs it into the graph like any locally built object.
    ///
    /// # Errors
    ///
    /// Returns an error when construction fails in the module.
    async fn add_resource(
        &self,
        conf: &ResourceConfig,
        deps: &[String],
    ) -> Result<Arc<dyn Resource>, ModuleError>;

    /// Asks the providing module to reconfigure the resource in place.
    ///
    /// # Errors
    ///
    /// Returns an error when the module rejects the new config.
    async fn reconfigure_resource(
        &self,
        conf: &ResourceConfig,
        deps: &[String],
    ) -> Result<(), ModuleError>;

    /// Asks the owning module to tear down the resource.
    ///
    /// # Errors
    ///
    /// Returns an error when teardown fails in the module.
    async fn remove_resource(&self, name: &ResourceName) -> Result<(), ModuleError>;

    /// Returns true if the named resource is managed by a module.
    fn is_modular_resource(&self, name: &ResourceName) -> bool;

    /// Registers and starts module processes.
    ///
    /// # Errors
    ///
    /// Returns an error when a module fails to start; already-registered
    /// names are skipped (first registration wins).
    async fn add_modules(&self, confs: &[ModuleConfig]) -> Result<(), ModuleError>;

    /// Restarts a module with a new config, returning the names of resources
    /// it was serving. The module closes those resources itself; the engine
    /// marks them for rebuild but must not close them again.
    ///
    /// # Errors
    ///
    /// Returns an error when the module fails to restart.
    async fn reconfigure_module(&self, conf: &ModuleConfig)
        -> Result<Vec<ResourceName>, ModuleError>;

    /// Stops and removes a module, returning the names of resources it was
    /// serving.
    ///
    /// # Errors
    ///
    /// Returns an error when the module fails to stop.
    async fn remove_module(&self, name: &str) -> Result<Vec<ResourceName>, ModuleError>;

    /// Annotates configs in the diff with module-declared implicit and
    /// optional dependencies before the diff is applied to the graph.
    ///
    /// # Errors
    ///
    /// Returns an error when a providing module rejects a config.
    async fn resolve_implicit_dependencies(&self, diff: &mut ConfigDiff)
        -> Result<(), ModuleError>;

    /// Current module configs, for reassembling a machine config.
    fn module_configs(&self) -> Vec<ModuleConfig>;

    /// Kills all module processes without a graceful close.
    fn kill(&self);

    /// Gracefully shuts down all modules.
    ///
    /// # Errors
    ///
    /// Returns the combined per-module shutdown errors.
    async fn close(&self) -> Result<(), ModuleError>;
}

//! Out-of-process module configuration.

use rover_resource::ResourceError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Where a module's executable comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleType {
    /// Downloaded from the module registry.
    #[default]
    Registry,
    /// A local executable path supplied by the user.
    Local,
}

/// Configuration of an out-of-process resource provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Name the module registers under.
    pub name: String,
    /// Path to the module executable.
    pub exe_path: PathBuf,
    /// Source of the executable.
    #[serde(default, rename = "type")]
    pub module_type: ModuleType,
    /// Arguments for the module's one-time first-run setup hook.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub first_run_args: Vec<String>,
    /// Extra environment for the module process.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
    /// Log level forwarded to the module process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl ModuleConfig {
    /// Creates a module config with a name and executable path.
    #[must_use]
    pub fn new(name: impl Into<String>, exe_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            exe_path: exe_path.into(),
            ..Self::default()
        }
    }

    /// Validates the module config.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::ValidationFailed`] when the name or
    /// executable path is empty.
    pub fn validate(&self) -> Result<(), ResourceError> {
        if self.name.is_empty() {
            return Err(ResourceError::validation_failed(
                "<unnamed module>",
                "module name must not be empty",
            ));
        }
        if self.exe_path.as_os_str().is_empty() {
            return Err(ResourceError::validation_failed(
                &self.name,
                "module executable path must not be empty",
            ));
        }
        Ok(())
    }
}

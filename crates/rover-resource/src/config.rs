//! Per-resource configuration.

use crate::api::Api;
use crate::errors::ResourceError;
use crate::model::Model;
use crate::name::ResourceName;
use serde::{Deserialize, Serialize};

/// Free-form attribute map carried by a resource config.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Declarative configuration of a single resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Name unique within the owning machine.
    pub name: String,
    /// The API this resource implements.
    #[serde(default)]
    pub api: Api,
    /// The implementation to instantiate.
    #[serde(default)]
    pub model: Model,
    /// Implementation-specific attributes, passed through opaquely.
    #[serde(default)]
    pub attributes: Attributes,
    /// Names of resources this one depends on, as written by the user.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Dependencies inferred by the module bridge during validation.
    /// These order the build exactly like explicit dependencies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implicit_depends_on: Vec<String>,
    /// Weak/optional dependencies. These never affect build order but do
    /// trigger the host's weak-dependent update pass.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optional_depends_on: Vec<String>,
}

impl ResourceConfig {
    /// Creates a config with the given identity and no attributes.
    #[must_use]
    pub fn new(api: Api, model: Model, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api,
            model,
            ..Self::default()
        }
    }

    /// The fully-qualified name this config materialises as.
    #[must_use]
    pub fn resource_name(&self) -> ResourceName {
        ResourceName::new(self.api.clone(), self.name.clone())
    }

    /// All build-ordering dependencies: explicit first, then implicit.
    #[must_use]
    pub fn dependencies(&self) -> Vec<String> {
        let mut deps = self.depends_on.clone();
        for dep in &self.implicit_depends_on {
            if !deps.contains(dep) {
                deps.push(dep.clone());
            }
        }
        deps
    }

    /// Returns true if this config declares weak/optional dependencies.
    #[must_use]
    pub fn has_optional_dependencies(&self) -> bool {
        !self.optional_depends_on.is_empty()
    }

    /// Validates the config before any build is attempted.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::ValidationFailed`] if the name is empty or
    /// contains reserved separator characters, if the API is incomplete, or
    /// if the config depends on itself.
    pub fn validate(&self) -> Result<(), ResourceError> {
        if self.name.is_empty() {
            return Err(ResourceError::validation_failed(
                "<unnamed>",
                "resource name must not be empty",
            ));
        }
        if self.name.contains(':') || self.name.contains('/') {
            return Err(ResourceError::validation_failed(
                &self.name,
                "resource name must not contain ':' or '/'",
            ));
        }
        if self.api.namespace.is_empty() || self.api.kind.is_empty() || self.api.subtype.is_empty()
        {
            return Err(ResourceError::validation_failed(
                &self.name,
                "api must have namespace, type, and subtype",
            ));
        }
        if self.depends_on.iter().any(|d| d == &self.name) {
            return Err(ResourceError::validation_failed(
                &self.name,
                "resource cannot depend on itself",
            ));
        }
        Ok(())
    }
}

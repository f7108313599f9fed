//! Resource API triples.

use crate::errors::ResourceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Namespace for resources shipped with the runtime.
pub const NAMESPACE_RDK: &str = "rdk";

/// Reserved namespace for services internal to the runtime.
///
/// Resources in this namespace are excluded from public name enumeration
/// and from default close sweeps during host-driven teardown.
pub const NAMESPACE_RDK_INTERNAL: &str = "rdk-internal";

/// An API identifies the protocol a resource speaks.
///
/// Wire-level tag `namespace:type:subtype`, e.g. `rdk:component:motor`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Api {
    /// Organisational namespace, e.g. `rdk`.
    pub namespace: String,
    /// Broad category: `component`, `service`, or `client`.
    pub kind: String,
    /// Concrete protocol within the category, e.g. `motor`.
    pub subtype: String,
}

impl Api {
    /// Creates an API from its three parts.
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        kind: impl Into<String>,
        subtype: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            kind: kind.into(),
            subtype: subtype.into(),
        }
    }

    /// The API of a component in the standard namespace.
    #[must_use]
    pub fn component(subtype: impl Into<String>) -> Self {
        Self::new(NAMESPACE_RDK, "component", subtype)
    }

    /// The API of a service in the standard namespace.
    #[must_use]
    pub fn service(subtype: impl Into<String>) -> Self {
        Self::new(NAMESPACE_RDK, "service", subtype)
    }

    /// The API of an internal service that cannot be removed via configuration.
    #[must_use]
    pub fn internal_service(subtype: impl Into<String>) -> Self {
        Self::new(NAMESPACE_RDK_INTERNAL, "service", subtype)
    }

    /// The API assigned to remote machine nodes.
    #[must_use]
    pub fn remote() -> Self {
        Self::new(NAMESPACE_RDK, "client", "remote")
    }

    /// The API of the shell service, rejected in untrusted environments.
    #[must_use]
    pub fn shell() -> Self {
        Self::service("shell")
    }

    /// Returns true if this API describes a component.
    #[must_use]
    pub fn is_component(&self) -> bool {
        self.kind == "component"
    }

    /// Returns true if this API describes a service.
    #[must_use]
    pub fn is_service(&self) -> bool {
        self.kind == "service"
    }

    /// Returns true if this API is the remote machine API.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        *self == Self::remote()
    }

    /// Returns true if this API lives in the reserved internal namespace.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.namespace == NAMESPACE_RDK_INTERNAL
    }
}

impl Default for Api {
    /// An empty API, rejected by config validation. Exists so configs can be
    /// built up field by field.
    fn default() -> Self {
        Self::new("", "", "")
    }
}

impl fmt::Display for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.kind, self.subtype)
    }
}

impl FromStr for Api {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(ResourceError::validation_failed(
                s,
                "API must have the form namespace:type:subtype",
            ));
        }
        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

impl TryFrom<String> for Api {
    type Error = ResourceError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Api> for String {
    fn from(api: Api) -> Self {
        api.to_string()
    }
}

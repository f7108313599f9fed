//! Fully-qualified resource names.

use crate::api::Api;
use crate::errors::ResourceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A fully-qualified resource identity.
///
/// A name is the triple `(api, remote chain, local name)`. The remote chain
/// is the ordered list of remote machine names traversed to reach the
/// resource; it is empty for local resources. The pair of API and
/// fully-qualified name is unique within a graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceName {
    /// The protocol this resource implements.
    pub api: Api,
    /// Remote machines traversed to reach this resource, outermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remote: Vec<String>,
    /// Name unique within the owning machine.
    pub name: String,
}

impl ResourceName {
    /// Creates a local resource name.
    #[must_use]
    pub fn new(api: Api, name: impl Into<String>) -> Self {
        Self {
            api,
            remote: Vec::new(),
            name: name.into(),
        }
    }

    /// Creates the graph node name for a remote machine.
    #[must_use]
    pub fn remote_node(name: impl Into<String>) -> Self {
        Self::new(Api::remote(), name)
    }

    /// Returns true if this name refers to a resource owned by a remote machine.
    #[must_use]
    pub fn is_foreign(&self) -> bool {
        !self.remote.is_empty()
    }

    /// Returns a copy of this name with `remote` prepended to the remote chain.
    #[must_use]
    pub fn prepend_remote(&self, remote: impl Into<String>) -> Self {
        let mut out = self.clone();
        out.remote.insert(0, remote.into());
        out
    }

    /// Removes the outermost remote from the chain, returning it alongside
    /// the shortened name. Returns `None` for local names.
    #[must_use]
    pub fn strip_remote(&self) -> Option<(String, Self)> {
        let mut out = self.clone();
        if out.remote.is_empty() {
            return None;
        }
        let first = out.remote.remove(0);
        Some((first, out))
    }

    /// The name including the remote chain but not the API,
    /// e.g. `gantry1:arm1` or `arm1`.
    #[must_use]
    pub fn short_name(&self) -> String {
        if self.remote.is_empty() {
            self.name.clone()
        } else {
            format!("{}:{}", self.remote.join(":"), self.name)
        }
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.api, self.short_name())
    }
}

impl FromStr for ResourceName {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((api_str, rest)) = s.split_once('/') else {
            return Err(ResourceError::validation_failed(
                s,
                "resource name must have the form api/name",
            ));
        };
        let api: Api = api_str.parse()?;
        let mut segments: Vec<&str> = rest.split(':').collect();
        if segments.iter().any(|seg| seg.is_empty()) {
            return Err(ResourceError::validation_failed(s, "empty name segment"));
        }
        let name = segments
            .pop()
            .ok_or_else(|| ResourceError::validation_failed(s, "missing name"))?;
        Ok(Self {
            api,
            remote: segments.into_iter().map(str::to_string).collect(),
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_parse_roundtrip() {
        let name = ResourceName::new(Api::component("motor"), "motor1");
        assert_eq!(name.to_string(), "rdk:component:motor/motor1");
        assert_eq!(name.to_string().parse::<ResourceName>().unwrap(), name);

        let foreign = name.prepend_remote("r2").prepend_remote("r1");
        assert_eq!(foreign.to_string(), "rdk:component:motor/r1:r2:motor1");
        assert_eq!(foreign.to_string().parse::<ResourceName>().unwrap(), foreign);
    }

    #[test]
    fn test_prepend_strip_roundtrip() {
        let name = ResourceName::new(Api::component("camera"), "camera1").prepend_remote("r1");
        let (outer, stripped) = name.strip_remote().unwrap();
        assert_eq!(outer, "r1");
        assert!(!stripped.is_foreign());
        assert_eq!(stripped.prepend_remote(outer), name);
    }

    #[test]
    fn test_strip_remote_on_local_name() {
        let name = ResourceName::new(Api::component("board"), "board1");
        assert!(name.strip_remote().is_none());
    }

    #[test]
    fn test_short_name() {
        let name = ResourceName::new(Api::component("arm"), "arm1");
        assert_eq!(name.short_name(), "arm1");
        assert_eq!(name.prepend_remote("r1").short_name(), "r1:arm1");
    }

    #[test]
    fn test_ordering_is_api_first() {
        let a = ResourceName::new(Api::component("arm"), "zzz");
        let b = ResourceName::new(Api::component("motor"), "aaa");
        assert!(a < b);
    }
}

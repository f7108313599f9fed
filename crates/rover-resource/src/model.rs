//! Resource model identifiers.

use crate::errors::ResourceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A model identifies a concrete implementation of an API.
///
/// Wire-level tag `namespace:family:name`, e.g. `acme:motor:stepper`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Model {
    /// Organisational namespace.
    pub namespace: String,
    /// Product family within the namespace.
    pub family: String,
    /// Concrete model name.
    pub name: String,
}

impl Model {
    /// Creates a model from its three parts.
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        family: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            family: family.into(),
            name: name.into(),
        }
    }

    /// Sentinel model for foreign resources whose implementation is unknown.
    #[must_use]
    pub fn unknown() -> Self {
        Self::new("rdk", "builtin", "unknown")
    }

    /// Sentinel model for objects internal to the runtime (e.g. remote clients).
    #[must_use]
    pub fn builtin() -> Self {
        Self::new("rdk", "builtin", "builtin")
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.family, self.name)
    }
}

impl FromStr for Model {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(ResourceError::validation_failed(
                s,
                "model must have the form namespace:family:name",
            ));
        }
        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

impl TryFrom<String> for Model {
    type Error = ResourceError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Model> for String {
    fn from(model: Model) -> Self {
        model.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        let model: Model = "acme:motor:stepper".parse().unwrap();
        assert_eq!(model, Model::new("acme", "motor", "stepper"));
        assert_eq!(model.to_string(), "acme:motor:stepper");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("stepper".parse::<Model>().is_err());
        assert!("acme:motor:".parse::<Model>().is_err());
    }

    #[test]
    fn test_sentinels_differ() {
        assert_ne!(Model::unknown(), Model::builtin());
    }
}

//! Whole-machine configuration and configuration diffs.

use crate::module::ModuleConfig;
use crate::remote::RemoteConfig;
use rover_resource::ResourceConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A full machine configuration generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Hardware component configs.
    #[serde(default)]
    pub components: Vec<ResourceConfig>,
    /// Software service configs.
    #[serde(default)]
    pub services: Vec<ResourceConfig>,
    /// Federated remote machines.
    #[serde(default)]
    pub remotes: Vec<RemoteConfig>,
    /// Out-of-process resource providers.
    #[serde(default)]
    pub modules: Vec<ModuleConfig>,
}

impl Config {
    /// Returns true if the config names nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
            && self.services.is_empty()
            && self.remotes.is_empty()
            && self.modules.is_empty()
    }
}

/// The difference between two configuration generations, as consumed by the
/// reconfiguration engine. The engine does not compute diffs; it applies
/// them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDiff {
    /// Entries present only in the new generation.
    #[serde(default)]
    pub added: Config,
    /// Entries present in both generations with differing configs.
    #[serde(default)]
    pub modified: Config,
    /// Entries present only in the old generation.
    #[serde(default)]
    pub removed: Config,
    /// Revision tag of the new generation, recorded per node.
    #[serde(default)]
    pub new_revision: String,
}

impl ConfigDiff {
    /// Returns true if the diff changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    /// Normalises module entries before the diff is applied:
    ///
    /// - a module named in both `added` and `modified` is treated as added
    ///   (the added entry wins, the modified entry is dropped);
    /// - modules listed more than once under one name within a list are
    ///   deduplicated, first entry wins.
    pub fn normalize(&mut self) {
        dedup_modules(&mut self.added.modules);
        dedup_modules(&mut self.modified.modules);
        dedup_modules(&mut self.removed.modules);
        let added: HashSet<String> = self
            .added
            .modules
            .iter()
            .map(|module| module.name.clone())
            .collect();
        self.modified
            .modules
            .retain(|module| !added.contains(&module.name));
    }
}

fn dedup_modules(modules: &mut Vec<ModuleConfig>) {
    let mut seen = HashSet::new();
    modules.retain(|module| seen.insert(module.name.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(name: &str, exe: &str) -> ModuleConfig {
        ModuleConfig::new(name, exe)
    }

    #[test]
    fn test_normalize_dedups_first_wins() {
        let mut diff = ConfigDiff::default();
        diff.added.modules = vec![
            module("acme", "/first"),
            module("acme", "/second"),
            module("other", "/other"),
        ];
        diff.normalize();
        assert_eq!(diff.added.modules.len(), 2);
        assert_eq!(diff.added.modules[0].exe_path.to_str(), Some("/first"));
    }

    #[test]
    fn test_normalize_added_wins_over_modified() {
        let mut diff = ConfigDiff::default();
        diff.added.modules = vec![module("acme", "/added")];
        diff.modified.modules = vec![module("acme", "/modified"), module("keep", "/keep")];
        diff.normalize();
        assert_eq!(diff.added.modules.len(), 1);
        assert_eq!(diff.modified.modules.len(), 1);
        assert_eq!(diff.modified.modules[0].name, "keep");
    }

    #[test]
    fn test_is_empty() {
        assert!(ConfigDiff::default().is_empty());
        let mut diff = ConfigDiff::default();
        diff.removed.remotes.push(RemoteConfig::new("r1", "addr"));
        assert!(!diff.is_empty());
    }
}

//! Playbook composition: the chosen set of features plus root-level
//! variable overrides, applied to one target directory.

use crate::error::{Error, Result};
use crate::feature::{Feature, FeatureRegistry};
use crate::tree::Tree;
use crate::variables::Variables;
use indexmap::IndexMap;
use log::info;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;

/// The top-level composition unit.
///
/// Holds the transitive closure of the activated features, each appearing
/// exactly once even when reachable via multiple paths, in dependency
/// order. Built once, applied any number of times; each application
/// creates its own fresh [`Tree`].
#[derive(Debug, Default)]
pub struct Playbook<'a> {
    features: IndexMap<String, &'a Feature>,
    variables: Variables,
}

impl<'a> Playbook<'a> {
    pub fn new() -> Self {
        Playbook::default()
    }

    /// Activates a feature: resolves its dependency graph into the
    /// playbook's feature ordering and records `overrides` as a root-level
    /// variable set under the feature's namespace.
    pub fn use_feature(
        &mut self,
        registry: &'a FeatureRegistry,
        name: &str,
        overrides: Mapping,
    ) -> Result<()> {
        let feature = registry.get(name)?;
        feature.using_features(registry, &mut self.features)?;
        if !overrides.is_empty() {
            self.set_variable(name, Value::Mapping(overrides))?;
        }
        Ok(())
    }

    /// Records a root-level variable; defining the same key twice is an
    /// error.
    pub fn set_variable(&mut self, key: &str, value: Value) -> Result<()> {
        if self.variables.contains_key(key) {
            return Err(Error::ConfigError(format!("variable '{}' is already defined", key)));
        }
        self.variables.insert(key.to_string(), value);
        Ok(())
    }

    /// Applies every resolved feature to a fresh tree, then materializes
    /// the tree under `directory` with the root overrides merged in.
    ///
    /// Any failure aborts the whole call; files written before the failing
    /// one are left in place.
    pub fn apply(&self, directory: &Path) -> Result<()> {
        fs::create_dir_all(directory)?;

        let mut tree = Tree::new();
        for (name, feature) in &self.features {
            info!("applying feature {}", name);
            feature.apply(&mut tree)?;
        }

        info!("applying tree to {}", directory.display());
        tree.apply(directory, &self.variables)
    }
}

//! Declarative source handling.
//!
//! This is the YAML adaptation layer: it deserializes `anatomy-features`
//! and `anatomy-playbook` documents into typed declarations and turns them
//! into registered features and playbooks. The core never parses YAML
//! anywhere else.

use crate::error::{Error, Result};
use crate::feature::{Command, Feature, FeatureRegistry};
use crate::playbook::Playbook;
use crate::variables::Variables;
use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;

/// Default playbook file name looked up in each target directory.
pub const PLAYBOOK_FILE: &str = "anatomy-playbook.yml";

/// Environment variable naming the features file when `--features-file`
/// is not given.
pub const FEATURES_ENV_VAR: &str = "ANATOMY_FEATURES";

/// One entry of the `anatomy-features` sequence. Unknown keys are
/// rejected with an error naming them.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct FeatureDecl {
    name: String,
    #[serde(default)]
    variables: Mapping,
    #[serde(default)]
    use_features: IndexMap<String, Mapping>,
    #[serde(default)]
    commands: Vec<Command>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct FeaturesDoc {
    anatomy_features: Vec<FeatureDecl>,
}

/// The `anatomy-playbook` structure. `use-features` must be a mapping of
/// feature name to per-use variable overrides; a plain list is a type
/// error.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PlaybookDecl {
    use_features: IndexMap<String, Mapping>,
    #[serde(default)]
    variables: Variables,
}

/// Parses a features document and registers every declared feature.
pub fn register_features_from_str(registry: &mut FeatureRegistry, contents: &str) -> Result<()> {
    let doc: FeaturesDoc = serde_yaml::from_str(contents)
        .map_err(|err| Error::ConfigError(format!("invalid feature declaration: {}", err)))?;

    for decl in doc.anatomy_features {
        let mut feature = Feature::with_variables(&decl.name, decl.variables, decl.use_features);
        for command in decl.commands {
            feature.add_command(command);
        }
        registry.register(feature)?;
    }
    Ok(())
}

pub fn register_features_from_file<P: AsRef<Path>>(
    registry: &mut FeatureRegistry,
    path: P,
) -> Result<()> {
    debug!("loading features from {}", path.as_ref().display());
    let contents = fs::read_to_string(path)?;
    register_features_from_str(registry, &contents)
}

/// Builds a playbook from a document. The playbook keys may sit under an
/// `anatomy-playbook` entry or at the top level of the document.
pub fn playbook_from_str<'a>(
    registry: &'a FeatureRegistry,
    contents: &str,
) -> Result<Playbook<'a>> {
    let value: Value = serde_yaml::from_str(contents)
        .map_err(|err| Error::ConfigError(format!("invalid playbook declaration: {}", err)))?;

    let playbook_key = Value::String("anatomy-playbook".to_string());
    let nested = match &value {
        Value::Mapping(mapping) => mapping.get(&playbook_key).cloned(),
        _ => None,
    };
    let value = nested.unwrap_or(value);

    let decl: PlaybookDecl = serde_yaml::from_value(value)
        .map_err(|err| Error::ConfigError(format!("invalid playbook declaration: {}", err)))?;

    let mut playbook = Playbook::new();
    for (name, overrides) in decl.use_features {
        playbook.use_feature(registry, &name, overrides)?;
    }
    for (key, value) in decl.variables {
        playbook.set_variable(&key, value)?;
    }
    Ok(playbook)
}

pub fn playbook_from_file<'a, P: AsRef<Path>>(
    registry: &'a FeatureRegistry,
    path: P,
) -> Result<Playbook<'a>> {
    debug!("loading playbook from {}", path.as_ref().display());
    let contents = fs::read_to_string(path)?;
    playbook_from_str(registry, &contents)
}

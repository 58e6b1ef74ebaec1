//! Features and the feature registry.
//!
//! A feature is a deferred script: it records commands at declaration time
//! and replays them, in order, against a [`Tree`] every time it is applied.
//! Features may depend on other features through `use-features`, carrying
//! per-dependency variable overrides.

use crate::error::{Error, Result};
use crate::tree::Tree;
use crate::variables::Variables;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

/// One recorded tree operation.
///
/// The operation set is closed: each variant maps to exactly one [`Tree`]
/// method. The `command` key of the declarative source selects the
/// variant; the remaining keys are its arguments, and an unexpected
/// argument is an error.
#[derive(Debug, Clone)]
pub enum Command {
    CreateFile {
        fileid: String,
        filename: String,
        contents: String,
        variables: Option<Mapping>,
        executable: bool,
    },
    CreateLink {
        filename: String,
        symlink: String,
        executable: bool,
    },
    AddFileBlock {
        fileid: String,
        contents: String,
    },
    AddVariables {
        variables: Variables,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateFileArgs {
    fileid: String,
    filename: String,
    contents: String,
    #[serde(default)]
    variables: Option<Mapping>,
    #[serde(default)]
    executable: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateLinkArgs {
    filename: String,
    symlink: String,
    #[serde(default)]
    executable: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AddFileBlockArgs {
    fileid: String,
    contents: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AddVariablesArgs {
    variables: Variables,
}

const COMMAND_KINDS: &[&str] = &["create-file", "create-link", "add-file-block", "add-variables"];

// Hand-rolled rather than internally tagged: serde's `deny_unknown_fields`
// does not combine with `tag = "command"`, and a misspelled argument must
// be rejected, not ignored.
impl<'de> serde::Deserialize<'de> for Command {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error as _;

        let mut map = Mapping::deserialize(deserializer)?;
        let tag_key = Value::String("command".to_string());
        let kind = match map.remove(&tag_key) {
            Some(Value::String(kind)) => kind,
            Some(_) => return Err(D::Error::custom("'command' must be a string")),
            None => return Err(D::Error::missing_field("command")),
        };

        let args = Value::Mapping(map);
        match kind.as_str() {
            "create-file" => {
                let args: CreateFileArgs =
                    serde_yaml::from_value(args).map_err(D::Error::custom)?;
                Ok(Command::CreateFile {
                    fileid: args.fileid,
                    filename: args.filename,
                    contents: args.contents,
                    variables: args.variables,
                    executable: args.executable,
                })
            }
            "create-link" => {
                let args: CreateLinkArgs =
                    serde_yaml::from_value(args).map_err(D::Error::custom)?;
                Ok(Command::CreateLink {
                    filename: args.filename,
                    symlink: args.symlink,
                    executable: args.executable,
                })
            }
            "add-file-block" => {
                let args: AddFileBlockArgs =
                    serde_yaml::from_value(args).map_err(D::Error::custom)?;
                Ok(Command::AddFileBlock { fileid: args.fileid, contents: args.contents })
            }
            "add-variables" => {
                let args: AddVariablesArgs =
                    serde_yaml::from_value(args).map_err(D::Error::custom)?;
                Ok(Command::AddVariables { variables: args.variables })
            }
            other => Err(D::Error::unknown_variant(other, COMMAND_KINDS)),
        }
    }
}

impl Command {
    /// Invokes the matching tree operation.
    pub fn apply(&self, tree: &mut Tree) -> Result<()> {
        match self {
            Command::CreateFile { fileid, filename, contents, variables, executable } => {
                tree.create_file(fileid, filename, contents, variables.clone(), *executable)
            }
            Command::CreateLink { filename, symlink, executable } => {
                tree.create_link(filename, symlink, *executable)
            }
            Command::AddFileBlock { fileid, contents } => tree.add_file_block(fileid, contents),
            Command::AddVariables { variables } => tree.add_variables(variables, false),
        }
    }
}

/// A named, reusable unit contributing files and variables to a tree.
///
/// A feature's own variables live under a namespace equal to its name.
/// Dependency overrides (`use-features`) may only refine variables inside
/// namespaces the dependency itself declares; the strict merge enforces
/// this when the feature is applied.
#[derive(Debug, Clone)]
pub struct Feature {
    name: String,
    commands: Vec<Command>,
    variables: Variables,
    use_features: Variables,
}

impl Feature {
    pub fn new(name: &str) -> Self {
        Feature::with_variables(name, Mapping::new(), IndexMap::new())
    }

    pub fn with_variables(
        name: &str,
        variables: Mapping,
        use_features: IndexMap<String, Mapping>,
    ) -> Self {
        let mut namespaced = Variables::new();
        namespaced.insert(name.to_string(), Value::Mapping(variables));
        let use_features = use_features
            .into_iter()
            .map(|(dependency, overrides)| (dependency, Value::Mapping(overrides)))
            .collect();
        Feature {
            name: name.to_string(),
            commands: Vec::new(),
            variables: namespaced,
            use_features,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn add_command(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn create_file(&mut self, fileid: &str, filename: &str, contents: &str) {
        self.add_command(Command::CreateFile {
            fileid: fileid.to_string(),
            filename: filename.to_string(),
            contents: contents.to_string(),
            variables: None,
            executable: false,
        });
    }

    pub fn create_link(&mut self, filename: &str, symlink: &str) {
        self.add_command(Command::CreateLink {
            filename: filename.to_string(),
            symlink: symlink.to_string(),
            executable: false,
        });
    }

    pub fn add_file_block(&mut self, fileid: &str, contents: &str) {
        self.add_command(Command::AddFileBlock {
            fileid: fileid.to_string(),
            contents: contents.to_string(),
        });
    }

    pub fn add_variables(&mut self, variables: Variables) {
        self.add_command(Command::AddVariables { variables });
    }

    /// Applies this feature to a tree: first the dependency overrides
    /// (strict, so an override of an undeclared namespace key fails), then
    /// the feature's own namespace, then every recorded command in order.
    pub fn apply(&self, tree: &mut Tree) -> Result<()> {
        tree.add_variables(&self.use_features, true)?;
        tree.add_variables(&self.variables, false)?;
        for command in &self.commands {
            command.apply(tree)?;
        }
        Ok(())
    }

    /// Resolves this feature's dependency graph depth-first in declared
    /// order, registering each feature into `output` exactly once.
    ///
    /// Dependencies resolve before the feature itself. A feature already
    /// present is not re-added, so diamond dependencies collapse to one
    /// application while each dependent still contributes its own
    /// overrides; later dependents merge over earlier ones.
    pub fn using_features<'a>(
        &'a self,
        registry: &'a FeatureRegistry,
        output: &mut IndexMap<String, &'a Feature>,
    ) -> Result<()> {
        for dependency_name in self.use_features.keys() {
            let dependency = registry.get(dependency_name)?;
            dependency.using_features(registry, output)?;
        }
        if !output.contains_key(&self.name) {
            output.insert(self.name.clone(), self);
        }
        Ok(())
    }
}

/// Catalog of every known feature, explicitly constructed and passed to
/// the playbook-building calls that need it.
///
/// The registry owns its features; playbooks hold references into it and
/// never mutate one.
#[derive(Debug, Default)]
pub struct FeatureRegistry {
    features: IndexMap<String, Feature>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        FeatureRegistry::default()
    }

    pub fn clear(&mut self) {
        self.features.clear();
    }

    pub fn get(&self, name: &str) -> Result<&Feature> {
        self.features.get(name).ok_or_else(|| Error::FeatureNotFound { name: name.to_string() })
    }

    /// Registers a feature; fails rather than silently overwriting.
    pub fn register(&mut self, feature: Feature) -> Result<()> {
        if self.features.contains_key(feature.name()) {
            return Err(Error::FeatureAlreadyRegistered { name: feature.name().to_string() });
        }
        self.features.insert(feature.name().to_string(), feature);
        Ok(())
    }

    /// Lists every (feature name, file-id, filename) triple contributed by
    /// `create-file` commands, letting a user discover file-ids before
    /// writing commands that reference them.
    pub fn tree(&self) -> Vec<(String, String, String)> {
        let mut result = Vec::new();
        for (name, feature) in &self.features {
            for command in feature.commands() {
                if let Command::CreateFile { fileid, filename, .. } = command {
                    result.push((name.clone(), fileid.clone(), filename.clone()));
                }
            }
        }
        result
    }

    /// Like [`FeatureRegistry::tree`], ordered for presentation: nested
    /// paths first, then by filename.
    pub fn tree_sorted(&self) -> Vec<(String, String, String)> {
        let mut items = self.tree();
        items.sort_by(|(a_feature, _, a_filename), (b_feature, _, b_filename)| {
            (!a_filename.contains('/'), a_filename, a_feature)
                .cmp(&(!b_filename.contains('/'), b_filename, b_feature))
        });
        items
    }
}

//! Text template expansion backed by MiniJinja.

use crate::error::Result;
use crate::variables::Variables;
use minijinja::{Environment, UndefinedBehavior};

/// Template engine used for every expansion in a tree: file contents,
/// target paths and symlink targets.
///
/// The environment is configured once and shared by all expansions:
/// * strict undefined behavior, so any reference to an undefined name or
///   attribute fails instead of rendering blank output;
/// * `trim_blocks`/`lstrip_blocks`, so a line holding only a control tag
///   leaves no stray blank line;
/// * the source's trailing newline is kept exactly once.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);
        Self { env }
    }

    /// Expands a template string against the given variables.
    ///
    /// Pure function of its two inputs; no template state is retained
    /// between calls.
    pub fn expand(&self, template: &str, variables: &Variables) -> Result<String> {
        let context = minijinja::Value::from_serialize(variables);
        Ok(self.env.render_str(template, context)?)
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        TemplateEngine::new()
    }
}

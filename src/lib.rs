//! anatomy renders a project's file tree from reusable, composable
//! features, each contributing file contents and variables, scoped and
//! merged through explicit rules before being expanded by a text
//! templating engine. It bootstraps and keeps synchronized boilerplate
//! project structures from a declarative description.

/// Command-line interface module for the anatomy application
pub mod cli;

/// Declarative source handling (anatomy-features / anatomy-playbook
/// documents)
pub mod config;

/// Error types and handling for the anatomy application
pub mod error;

/// Features, commands and the feature registry
pub mod feature;

/// Playbook composition and application
pub mod playbook;

/// Text template expansion
pub mod template;

/// The staging tree of pending files and its materialization
pub mod tree;

/// The variable model and the merge algorithm
pub mod variables;

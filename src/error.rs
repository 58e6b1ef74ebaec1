//! Error handling for the anatomy application.
//! Defines the error types and results used throughout the application.

use std::io;
use thiserror::Error;

/// Errors raised while composing features or materializing a tree.
///
/// Configuration errors surface at resolution time, before any file is
/// written. Merge and template errors surface while a playbook is being
/// applied; they abort the whole `apply` call and leave previously written
/// files in place.
#[derive(Error, Debug)]
pub enum Error {
    /// Represents errors that occur during file system operations
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    /// Represents errors raised by the template engine, including
    /// references to undefined variables
    #[error("Template error: {0}")]
    TemplateError(#[from] minijinja::Error),

    /// A template failure wrapped with the file it was rendering
    #[error("Error rendering '{path}': {source}")]
    RenderError {
        path: String,
        #[source]
        source: Box<Error>,
    },

    /// Represents errors in the declarative source (YAML shape, unknown
    /// keys, wrong types)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Feature not found: {name}")]
    FeatureNotFound { name: String },

    #[error("Feature already registered: {name}")]
    FeatureAlreadyRegistered { name: String },

    /// Two files declared with the same file-id within one tree
    #[error("Duplicate file-id: {fileid}")]
    DuplicateFileId { fileid: String },

    /// A command referenced a file-id no file was created under
    #[error("Unknown file-id: {fileid}")]
    UnknownFileId { fileid: String },

    /// Strict merge rejected keys absent from the base mapping
    #[error("Variables do not exist: {}", .keys.join(", "))]
    UndeclaredVariables { keys: Vec<String> },

    /// A symlink's target did not resolve to an existing regular file
    #[error("Symlink target does not exist: {path}")]
    LinkTargetMissing { path: String },
}

/// Convenience type alias for Results with anatomy's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Default error handler that prints the error and exits the program.
pub fn default_error_handler(err: Error) {
    eprintln!("{}", err);
    std::process::exit(1);
}

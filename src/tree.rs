//! The in-memory staging area of pending files and scoped variables, and
//! the materialization protocol that writes them to disk.

use crate::error::{Error, Result};
use crate::template::TemplateEngine;
use crate::variables::{merge_variables, Variables};
use indexmap::IndexMap;
use log::debug;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Component, Path, PathBuf};

/// One target file or symlink pending materialization.
///
/// A file accumulates content blocks; a link records the path its symlink
/// points at. The target path itself is a template and is expanded against
/// the merged variables at apply time.
#[derive(Debug, Clone)]
pub struct FileEntry {
    filename: String,
    executable: bool,
    kind: EntryKind,
}

#[derive(Debug, Clone)]
enum EntryKind {
    File { blocks: Vec<String> },
    Link { target: String },
}

impl FileEntry {
    pub fn file(filename: &str, contents: &str, executable: bool) -> Self {
        FileEntry {
            filename: filename.to_string(),
            executable,
            kind: EntryKind::File { blocks: vec![normalize_block(contents)] },
        }
    }

    pub fn link(filename: &str, target: &str, executable: bool) -> Self {
        FileEntry {
            filename: filename.to_string(),
            executable,
            kind: EntryKind::Link { target: target.to_string() },
        }
    }

    /// Appends a content block. Each block is normalized to end with a
    /// newline so blocks concatenate line-wise.
    pub fn add_block(&mut self, contents: &str) -> Result<()> {
        let blocks = match &mut self.kind {
            EntryKind::File { blocks } => blocks,
            EntryKind::Link { .. } => {
                return Err(Error::ConfigError(format!(
                    "cannot add a file-block to symlink '{}'",
                    self.filename
                )))
            }
        };
        blocks.push(normalize_block(contents));
        Ok(())
    }

    /// Materializes this entry under `directory`.
    ///
    /// The target path is `override_filename` when given, else the entry's
    /// own path template; either way it is expanded against `variables`.
    /// Content is written with exactly one trailing newline, overwriting
    /// any existing file. A link's target must resolve, relative to the
    /// link's own directory, to an existing regular file; the symlink
    /// stored on disk is relative so the tree stays relocatable.
    pub fn apply(
        &self,
        directory: &Path,
        engine: &TemplateEngine,
        variables: &Variables,
        override_filename: Option<&str>,
    ) -> Result<()> {
        let raw_filename = override_filename.unwrap_or(&self.filename);
        let filename = engine.expand(raw_filename, variables)?;
        let path = directory.join(&filename);

        match &self.kind {
            EntryKind::File { blocks } => self.write_file(&path, blocks, engine, variables)?,
            EntryKind::Link { target } => self.write_link(&path, target, engine, variables)?,
        }

        if self.executable {
            make_executable(&path)?;
        }
        Ok(())
    }

    fn write_file(
        &self,
        path: &Path,
        blocks: &[String],
        engine: &TemplateEngine,
        variables: &Variables,
    ) -> Result<()> {
        let mut contents = String::new();
        for block in blocks {
            let rendered = engine.expand(block, variables).map_err(|err| Error::RenderError {
                path: path.display().to_string(),
                source: Box::new(err),
            })?;
            contents.push_str(&rendered);
        }

        // Exactly one trailing newline, regardless of how the blocks ended.
        let mut contents = contents.trim_end_matches('\n').to_string();
        contents.push('\n');

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        debug!("writing file {}", path.display());
        fs::write(path, contents)?;
        Ok(())
    }

    fn write_link(
        &self,
        path: &Path,
        target: &str,
        engine: &TemplateEngine,
        variables: &Variables,
    ) -> Result<()> {
        let target = engine.expand(target, variables)?;
        let link_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        // Normalized lexically: the link's own directory may not exist yet.
        let target_path = normalize(&link_dir.join(&target));

        if !target_path.is_file() {
            return Err(Error::LinkTargetMissing { path: target_path.display().to_string() });
        }

        let relative = relative_path(&link_dir, &target_path);
        fs::create_dir_all(&link_dir)?;
        if fs::symlink_metadata(path).is_ok() {
            fs::remove_file(path)?;
        }
        debug!("writing symlink {} -> {}", path.display(), relative.display());
        std::os::unix::fs::symlink(relative, path)?;
        Ok(())
    }
}

/// An ordered collection of file entries plus a variable mapping scoped
/// per file-id or feature namespace.
///
/// Created fresh per playbook application, populated by replaying feature
/// commands, consumed exactly once by [`Tree::apply`].
#[derive(Debug, Default)]
pub struct Tree {
    files: IndexMap<String, FileEntry>,
    variables: Variables,
}

impl Tree {
    pub fn new() -> Self {
        Tree::default()
    }

    /// Registers a new file under `fileid`. File-ids are unique within one
    /// tree; a duplicate fails.
    pub fn create_file(
        &mut self,
        fileid: &str,
        filename: &str,
        contents: &str,
        variables: Option<Mapping>,
        executable: bool,
    ) -> Result<()> {
        if self.files.contains_key(fileid) {
            return Err(Error::DuplicateFileId { fileid: fileid.to_string() });
        }
        self.files.insert(fileid.to_string(), FileEntry::file(filename, contents, executable));
        if let Some(variables) = variables {
            self.variables.insert(fileid.to_string(), Value::Mapping(variables));
        }
        Ok(())
    }

    /// Registers a symlink. The filename doubles as the file-id.
    pub fn create_link(&mut self, filename: &str, target: &str, executable: bool) -> Result<()> {
        if self.files.contains_key(filename) {
            return Err(Error::DuplicateFileId { fileid: filename.to_string() });
        }
        self.files.insert(filename.to_string(), FileEntry::link(filename, target, executable));
        Ok(())
    }

    /// Appends a content block to an already-created file.
    pub fn add_file_block(&mut self, fileid: &str, contents: &str) -> Result<()> {
        match self.files.get_mut(fileid) {
            Some(entry) => entry.add_block(contents),
            None => Err(Error::UnknownFileId { fileid: fileid.to_string() }),
        }
    }

    /// Merges variables into the tree's accumulated mapping.
    pub fn add_variables(&mut self, variables: &Variables, left_join: bool) -> Result<()> {
        self.variables = merge_variables(&self.variables, variables, left_join)?;
        Ok(())
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    /// Materializes every entry under `directory`, after a final permissive
    /// merge of the accumulated variables with `variables`.
    pub fn apply(&self, directory: &Path, variables: &Variables) -> Result<()> {
        let merged = merge_variables(&self.variables, variables, false)?;
        let engine = TemplateEngine::new();
        for entry in self.files.values() {
            entry.apply(directory, &engine, &merged, None)?;
        }
        Ok(())
    }
}

fn normalize_block(contents: &str) -> String {
    let mut block = contents.to_string();
    if !block.ends_with('\n') {
        block.push('\n');
    }
    block
}

/// Grants execute permission wherever read is already granted.
fn make_executable(path: &Path) -> Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    let mode = permissions.mode();
    permissions.set_mode(mode | ((mode & 0o444) >> 2));
    fs::set_permissions(path, permissions)?;
    Ok(())
}

/// Lexically resolves `.` and `..` components without touching the
/// filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(parts.last(), Some(Component::Normal(_))) {
                    parts.pop();
                } else {
                    parts.push(component);
                }
            }
            other => parts.push(other),
        }
    }
    parts.iter().collect()
}

/// Computes the relative path from `from_dir` to `target`.
fn relative_path(from_dir: &Path, target: &Path) -> PathBuf {
    let from = normalize(from_dir);
    let to = normalize(target);
    let from_parts: Vec<Component> = from.components().collect();
    let to_parts: Vec<Component> = to.components().collect();
    let common = from_parts
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut result = PathBuf::new();
    for _ in common..from_parts.len() {
        result.push("..");
    }
    for part in &to_parts[common..] {
        result.push(part);
    }
    if result.as_os_str().is_empty() {
        result.push(".");
    }
    result
}

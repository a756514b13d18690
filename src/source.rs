//! Content sources
//!
//! Discovery reads file content through [`ContentSource`] and walks directories
//! through [`DirectoryTree`]. Both are implemented by [`LocalSource`] (the
//! working tree) and [`crate::revision::RevisionSource`] (a pinned git
//! revision), so a model can be built from either without the builder knowing
//! which one it holds.
//!
//! All paths are `/`-separated and relative to the source root.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{CorpusError, Result};

/// Read access to file content by path.
pub trait ContentSource {
    /// Return the text content of `path`, or `None` if it does not exist.
    fn get(&self, path: &str) -> Result<Option<String>>;

    /// Human-readable description of where content comes from.
    fn describe(&self) -> String;
}

/// Kind of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// A single child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl TreeEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// Directory traversal, kept apart from content retrieval.
pub trait DirectoryTree {
    /// List the children of `dir` sorted by name, or `None` if `dir` is not a directory.
    fn list_dir(&self, dir: &str) -> Result<Option<Vec<TreeEntry>>>;

    /// Whether `path` exists and is a regular file.
    fn is_file(&self, path: &str) -> Result<bool>;

    /// All files under `dir` (recursively) whose name ends in `.{extension}`.
    fn files_with_extension(&self, dir: &str, extension: &str) -> Result<Vec<String>>;
}

/// Join two `/`-separated relative paths
pub fn join(base: &str, name: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.is_empty() || base == "." {
        name.to_string()
    } else {
        format!("{}/{}", base, name)
    }
}

/// Parent directory of a `/`-separated path (`""` for top-level entries)
pub fn parent(path: &str) -> &str {
    path.rfind('/').map(|i| &path[..i]).unwrap_or("")
}

/// Normalize a filesystem path into the `/`-separated form used in models
pub fn normalize(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Reads from the local working tree
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        if path.is_empty() {
            self.root.clone()
        } else {
            self.root.join(path)
        }
    }
}

impl ContentSource for LocalSource {
    fn get(&self, path: &str) -> Result<Option<String>> {
        debug!("Loading local file: '{}'", path);
        match fs::read(self.resolve(path)) {
            Ok(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| CorpusError::Encoding(path.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self) -> String {
        format!("working tree at '{}'", self.root.display())
    }
}

impl DirectoryTree for LocalSource {
    fn list_dir(&self, dir: &str) -> Result<Option<Vec<TreeEntry>>> {
        let path = self.resolve(dir);
        if !path.is_dir() {
            return Ok(None);
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&path)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let kind = if file_type.is_dir() {
                EntryKind::Dir
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                continue;
            };
            entries.push(TreeEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                kind,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Some(entries))
    }

    fn is_file(&self, path: &str) -> Result<bool> {
        Ok(self.resolve(path).is_file())
    }

    fn files_with_extension(&self, dir: &str, extension: &str) -> Result<Vec<String>> {
        let suffix = format!(".{}", extension);
        let mut files = Vec::new();

        for entry in WalkDir::new(self.resolve(dir)).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            if !entry.file_name().to_string_lossy().ends_with(&suffix) {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or_else(|_| entry.path());
            files.push(normalize(relative));
        }

        Ok(files)
    }
}

//! Revision-pinned content
//!
//! Reads files and directories as they existed at a named git revision without
//! touching the working tree, the index, or HEAD.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use git2::{ErrorCode, ObjectType, Oid, Repository, Tree, TreeWalkMode, TreeWalkResult};
use tracing::debug;

use crate::error::{CorpusError, Result};
use crate::source::{ContentSource, DirectoryTree, EntryKind, TreeEntry};

/// Content of a repository at a fixed revision
pub struct RevisionSource {
    repo: Repository,
    revision: String,
    tree_id: Oid,
}

impl RevisionSource {
    /// Open the repository containing `repo_path` and pin `revision`
    /// (a branch, tag, commit id or any other revspec).
    pub fn open(repo_path: impl AsRef<Path>, revision: &str) -> Result<Self> {
        let repo = Repository::discover(repo_path)?;
        let tree_id = resolve_tree(&repo, revision)?;
        debug!("Pinned revision '{}' to tree {}", revision, tree_id);
        Ok(Self {
            repo,
            revision: revision.to_string(),
            tree_id,
        })
    }

    /// The revspec this source was opened with
    pub fn revision(&self) -> &str {
        &self.revision
    }

    fn tree(&self) -> Result<Tree<'_>> {
        Ok(self.repo.find_tree(self.tree_id)?)
    }

    /// Resolve `dir` to a subtree, `None` if it is missing or not a directory
    fn subtree(&self, dir: &str) -> Result<Option<Tree<'_>>> {
        let root = self.tree()?;
        if dir.is_empty() || dir == "." {
            return Ok(Some(root));
        }
        let entry = match root.get_path(Path::new(dir)) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if entry.kind() != Some(ObjectType::Tree) {
            return Ok(None);
        }
        Ok(Some(self.repo.find_tree(entry.id())?))
    }
}

fn resolve_tree(repo: &Repository, revision: &str) -> Result<Oid> {
    let object = match repo.revparse_single(revision) {
        Ok(object) => object,
        Err(e) if e.code() == ErrorCode::NotFound => {
            return Err(CorpusError::RevisionNotFound(revision.to_string()))
        }
        Err(e) => return Err(e.into()),
    };
    Ok(object.peel_to_tree()?.id())
}

impl ContentSource for RevisionSource {
    fn get(&self, path: &str) -> Result<Option<String>> {
        debug!("Loading '{}' at revision '{}'", path, self.revision);
        let tree = self.tree()?;
        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if entry.kind() != Some(ObjectType::Blob) {
            return Ok(None);
        }
        let blob = self.repo.find_blob(entry.id())?;
        String::from_utf8(blob.content().to_vec())
            .map(Some)
            .map_err(|_| CorpusError::Encoding(path.to_string()))
    }

    fn describe(&self) -> String {
        format!("revision '{}'", self.revision)
    }
}

impl DirectoryTree for RevisionSource {
    fn list_dir(&self, dir: &str) -> Result<Option<Vec<TreeEntry>>> {
        let Some(tree) = self.subtree(dir)? else {
            return Ok(None);
        };

        let mut entries: Vec<TreeEntry> = tree
            .iter()
            .filter_map(|entry| {
                let kind = match entry.kind() {
                    Some(ObjectType::Tree) => EntryKind::Dir,
                    Some(ObjectType::Blob) => EntryKind::File,
                    _ => return None,
                };
                entry.name().map(|name| TreeEntry {
                    name: name.to_string(),
                    kind,
                })
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Some(entries))
    }

    fn is_file(&self, path: &str) -> Result<bool> {
        let tree = self.tree()?;
        match tree.get_path(Path::new(path)) {
            Ok(entry) => Ok(entry.kind() == Some(ObjectType::Blob)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn files_with_extension(&self, dir: &str, extension: &str) -> Result<Vec<String>> {
        let Some(tree) = self.subtree(dir)? else {
            return Ok(Vec::new());
        };

        let suffix = format!(".{}", extension);
        let prefix = dir.trim_end_matches('/');
        let mut files = Vec::new();

        tree.walk(TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() == Some(ObjectType::Blob) {
                if let Some(name) = entry.name() {
                    if name.ends_with(&suffix) {
                        let relative = format!("{}{}", root, name);
                        files.push(crate::source::join(prefix, &relative));
                    }
                }
            }
            TreeWalkResult::Ok
        })?;

        files.sort();
        Ok(files)
    }
}

/// Files that differ between two revisions, as `git diff --name-only base head`
/// would list them. Both sides of every delta are included so renames and
/// deletions count as changes to the old path too.
pub fn changed_paths(repo_path: impl AsRef<Path>, base: &str, head: &str) -> Result<BTreeSet<String>> {
    let repo = Repository::discover(repo_path)?;
    let old_tree = repo.find_tree(resolve_tree(&repo, base)?)?;
    let new_tree = repo.find_tree(resolve_tree(&repo, head)?)?;

    let diff = repo.diff_tree_to_tree(Some(&old_tree), Some(&new_tree), None)?;

    let mut paths = BTreeSet::new();
    for delta in diff.deltas() {
        for file in [delta.old_file(), delta.new_file()] {
            if let Some(path) = file.path() {
                paths.insert(crate::source::normalize(path));
            }
        }
    }

    debug!("Found {} changed files between '{}' and '{}'", paths.len(), base, head);
    Ok(paths)
}

/// Parse a newline-delimited list of changed paths
pub fn parse_changed_paths(content: &str) -> BTreeSet<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.replace('\\', "/"))
        .collect()
}

/// Read a newline-delimited changed-path list from disk
pub fn read_changed_paths(path: impl AsRef<Path>) -> Result<BTreeSet<String>> {
    let content = fs::read_to_string(path)?;
    Ok(parse_changed_paths(&content))
}

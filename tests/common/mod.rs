//! Fixture corpora for integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use git2::{Commit, IndexAddOption, Oid, Repository, Signature};
use tempfile::TempDir;

/// A corpus in a temporary directory, optionally under git
pub struct Corpus {
    dir: TempDir,
}

impl Corpus {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn write(&self, rel: &str, content: &str) {
        let path = self.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    pub fn remove(&self, rel: &str) {
        fs::remove_file(self.join(rel)).unwrap();
    }

    /// Write `<dir>/<name>/<name>.typ` and `<name>.meta.yaml` with versions `n..1`
    pub fn write_doc(&self, group_dir: &str, name: &str, title: &str, latest: u32) {
        let versions: Vec<u32> = (1..=latest).rev().collect();
        self.write_doc_versions(group_dir, name, title, &versions);
    }

    pub fn write_doc_versions(&self, group_dir: &str, name: &str, title: &str, versions: &[u32]) {
        let base = format!("{}/{}/{}", group_dir, name, name);
        self.write(&format!("{}.typ", base), &format!("= {}\n", title));
        self.write(&format!("{}.meta.yaml", base), &meta_yaml(title, versions));
    }

    pub fn init_git(&self) -> Repository {
        Repository::init(self.path()).unwrap()
    }

    /// Stage everything (including deletions) and commit on HEAD
    pub fn commit(&self, message: &str) -> Oid {
        let repo = Repository::open(self.path()).unwrap();
        let mut index = repo.index().unwrap();
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None).unwrap();
        index.update_all(["*"].iter(), None).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();

        let sig = Signature::now("Corpus Tests", "tests@corpus.dev").unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }
}

pub fn meta_yaml(title: &str, versions: &[u32]) -> String {
    let mut out = format!("title: \"{}\"\nchangelog:\n", title);
    for v in versions {
        out.push_str(&format!(
            "  - version: {v}\n    date: \"2024-{:02}-01\"\n    authors: [\"Anna Rossi\"]\n    verifiers: [\"Bruno Bianchi\"]\n    description: \"Revision {v}\"\n",
            (*v).clamp(1, 12)
        ));
    }
    out
}

//! Convention-scan discovery
//!
//! ```text
//! docs/                             # Root
//! ├── 00-templates/                 # skipped
//! ├── 01-candidatura/               # Group: must match the group pattern
//! │   ├── interna/                  # Subgroup: one of the enumerated names
//! │   │   └── verbale-01/           # Document directory
//! │   │       ├── verbale-01.typ
//! │   │       ├── verbale-01.meta.yaml
//! │   │       └── sections/intro.typ    # subfile
//! │   └── bozze/                    # not a subgroup: pruned
//! └── misc/                         # not a group: pruned
//! ```
//!
//! The walk is a depth-tagged recursive visit. At each depth a directory name
//! either admits descent or prunes the whole subtree; depth 3 directories are
//! documents and nothing below them is visited.

use serde_json::Value;
use tracing::{debug, info, warn};

use super::{Collector, DocumentBuilder};
use crate::document::{Document, Model};
use crate::error::{CorpusError, Result, Violation};
use crate::source::join;

/// Position of a directory in the convention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Depth {
    Root,
    Group,
    Subgroup,
    Document,
}

impl Depth {
    fn child(self) -> Option<Depth> {
        match self {
            Depth::Root => Some(Depth::Group),
            Depth::Group => Some(Depth::Subgroup),
            Depth::Subgroup => Some(Depth::Document),
            Depth::Document => None,
        }
    }
}

/// Classification labels collected on the way down
#[derive(Debug, Clone, Default)]
struct Labels {
    group: String,
    subgroup: String,
}

/// What to do with a child directory
enum Admission {
    Descend,
    Skip,
    Prune(&'static str),
}

impl<'a> DocumentBuilder<'a> {
    /// Discover documents by walking the directory convention under the layout root.
    pub fn discover_convention(&self) -> Result<Model> {
        let root = self.layout.root.as_str();
        info!("Starting document discovery in '{}' ({})", root, self.content.describe());

        if self.tree.list_dir(root)?.is_none() {
            return Err(CorpusError::RootNotFound(root.to_string()));
        }

        let mut collector = Collector::default();
        self.visit(root, Depth::Root, &Labels::default(), &mut collector)?;
        self.finish(collector)
    }

    fn visit(&self, dir: &str, depth: Depth, labels: &Labels, out: &mut Collector) -> Result<()> {
        let Some(child_depth) = depth.child() else {
            return Ok(());
        };

        let entries = self.tree.list_dir(dir)?.unwrap_or_default();
        for entry in entries.iter().filter(|e| e.is_dir()) {
            let path = join(dir, &entry.name);

            match self.admit(child_depth, &entry.name) {
                Admission::Descend => {}
                Admission::Skip => {
                    debug!("Skipping '{}' directory.", path);
                    continue;
                }
                Admission::Prune(kind) => {
                    warn!("Skipping non-conforming {} directory: {}", kind, path);
                    continue;
                }
            }

            let mut labels = labels.clone();
            match child_depth {
                Depth::Group => labels.group = entry.name.clone(),
                Depth::Subgroup => labels.subgroup = entry.name.clone(),
                Depth::Document => {
                    out.accept(self.build_convention_document(&path, &entry.name, &labels));
                    continue;
                }
                Depth::Root => {}
            }
            self.visit(&path, child_depth, &labels, out)?;
        }
        Ok(())
    }

    fn admit(&self, depth: Depth, name: &str) -> Admission {
        match depth {
            Depth::Group if self.layout.skip_dirs.iter().any(|d| d == name) => Admission::Skip,
            Depth::Group if !self.layout.group_pattern.is_match(name) => Admission::Prune("group"),
            Depth::Subgroup if !self.layout.subgroups.iter().any(|s| s == name) => {
                Admission::Prune("subgroup")
            }
            _ => Admission::Descend,
        }
    }

    /// Validate one document directory and build its record.
    fn build_convention_document(
        &self,
        dir: &str,
        name: &str,
        labels: &Labels,
    ) -> std::result::Result<Document, Vec<Violation>> {
        debug!("Processing potential document: '{}'", name);

        let source = join(dir, &format!("{}.{}", name, self.layout.source_extension));
        let metadata_path = join(dir, &format!("{}.{}", name, self.layout.metadata_suffix));

        self.require_files(name, &[("metadata", &metadata_path), ("source", &source)])?;

        let value = self.load_yaml(name, "metadata", &metadata_path)?;
        let metadata = self.check_schema(name, &metadata_path, value)?;

        let title = metadata
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or(name)
            .to_string();

        let changelog_value = metadata.get("changelog").cloned().unwrap_or(Value::Null);
        let changelog = self.check_changelog(&title, &metadata_path, &changelog_value)?;

        let subfiles = self.subfiles(&title, &source)?;
        debug!("Found {} subfiles for '{}'", subfiles.len(), name);

        let output = format!(
            "{}/{}/{}.{}",
            labels.group, labels.subgroup, name, self.layout.output_extension
        );

        Ok(Document {
            output,
            group: labels.group.clone(),
            subgroup: Some(labels.subgroup.clone()),
            metadata_path,
            latest_version: changelog.latest_version(),
            last_modified_date: changelog.last_modified_date().to_string(),
            metadata,
            changelog,
            subfiles,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CorpusConfig;
    use crate::discovery::Layout;
    use crate::schema::MetadataSchema;
    use crate::source::LocalSource;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn meta(title: &str, versions: &[u32]) -> String {
        let mut out = format!("title: \"{}\"\nchangelog:\n", title);
        for v in versions {
            out.push_str(&format!(
                "  - version: {}\n    date: \"2024-0{}-01\"\n    authors: [\"Anna\"]\n    verifiers: [\"Bruno\"]\n    description: \"rev {}\"\n",
                v, v, v
            ));
        }
        out
    }

    fn write_doc(root: &Path, rel_dir: &str, name: &str, versions: &[u32]) {
        let dir = root.join(rel_dir).join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{}.typ", name)), "= Doc").unwrap();
        fs::write(dir.join(format!("{}.meta.yaml", name)), meta(name, versions)).unwrap();
    }

    fn discover(root: &Path) -> Result<Model> {
        let source = LocalSource::new(root);
        let schema = MetadataSchema::embedded().unwrap();
        let layout = Layout::from_config(&CorpusConfig::default()).unwrap();
        DocumentBuilder::new(&source, &source, &schema, &layout).discover_convention()
    }

    #[test]
    fn test_builds_document_from_convention() {
        let tmp = tempdir().unwrap();
        write_doc(tmp.path(), "docs/01-candidatura/interna", "verbale", &[2, 1]);

        let model = discover(tmp.path()).unwrap();
        assert_eq!(model.len(), 1);
        let doc = &model.documents()[0];
        assert_eq!(doc.source, "docs/01-candidatura/interna/verbale/verbale.typ");
        assert_eq!(doc.metadata_path, "docs/01-candidatura/interna/verbale/verbale.meta.yaml");
        assert_eq!(doc.output, "01-candidatura/interna/verbale.pdf");
        assert_eq!(doc.group, "01-candidatura");
        assert_eq!(doc.subgroup.as_deref(), Some("interna"));
        assert_eq!(doc.latest_version, 2);
        assert_eq!(doc.last_modified_date, "2024-02-01");
        assert_eq!(doc.title(), "verbale");
    }

    #[test]
    fn test_non_conforming_directories_pruned() {
        let tmp = tempdir().unwrap();
        write_doc(tmp.path(), "docs/01-candidatura/interna", "ok", &[1]);
        // Broken documents below pruned directories are never looked at
        write_doc(tmp.path(), "docs/misc/interna", "hidden", &[3, 1]);
        write_doc(tmp.path(), "docs/01-candidatura/bozze", "hidden", &[3, 1]);
        write_doc(tmp.path(), "docs/00-templates/interna", "template", &[5]);

        let model = discover(tmp.path()).unwrap();
        assert_eq!(model.len(), 1);
        assert_eq!(model.documents()[0].title(), "ok");
    }

    #[test]
    fn test_deeper_levels_ignored() {
        let tmp = tempdir().unwrap();
        write_doc(tmp.path(), "docs/01-candidatura/interna", "verbale", &[1]);
        let deep = tmp.path().join("docs/01-candidatura/interna/verbale/sections/nested");
        fs::create_dir_all(&deep).unwrap();
        fs::write(deep.join("nested.meta.yaml"), "not: [valid").unwrap();
        fs::write(deep.join("part.typ"), "").unwrap();

        let model = discover(tmp.path()).unwrap();
        let doc = &model.documents()[0];
        assert_eq!(
            doc.subfiles.iter().cloned().collect::<Vec<_>>(),
            vec!["docs/01-candidatura/interna/verbale/sections/nested/part.typ".to_string()]
        );
        assert!(!doc.subfiles.contains(&doc.source));
    }

    #[test]
    fn test_missing_root_is_error() {
        let tmp = tempdir().unwrap();
        assert!(matches!(discover(tmp.path()), Err(CorpusError::RootNotFound(_))));
    }

    #[test]
    fn test_empty_metadata_rejected() {
        let tmp = tempdir().unwrap();
        write_doc(tmp.path(), "docs/01-candidatura/slides", "deck", &[1]);
        fs::write(tmp.path().join("docs/01-candidatura/slides/deck/deck.meta.yaml"), "\n").unwrap();

        match discover(tmp.path()) {
            Err(CorpusError::Discovery(violations)) => {
                assert!(matches!(violations[0], Violation::Empty { .. }));
            }
            other => panic!("Expected discovery failure, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_yaml_rejected() {
        let tmp = tempdir().unwrap();
        write_doc(tmp.path(), "docs/01-candidatura/slides", "deck", &[1]);
        fs::write(
            tmp.path().join("docs/01-candidatura/slides/deck/deck.meta.yaml"),
            "title: [unclosed",
        )
        .unwrap();

        match discover(tmp.path()) {
            Err(CorpusError::Discovery(violations)) => {
                assert!(matches!(violations[0], Violation::Parse { .. }));
            }
            other => panic!("Expected discovery failure, got {:?}", other),
        }
    }
}

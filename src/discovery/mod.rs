//! Document discovery
//!
//! Builds a [`Model`] from a content source using one of two interchangeable
//! strategies with the same output contract:
//!
//! - [`convention`]: walks `<root>/<NN-group>/<subgroup>/<docname>/`
//! - [`manifest`]: iterates an explicit list of document entries
//!
//! Discovery is all-or-nothing. Every document is attempted and every
//! violation is logged and collected; if any document fails, the whole run
//! fails with [`CorpusError::Discovery`] carrying the full list. Directories
//! that do not follow the naming convention are not documents and are only
//! logged.

pub mod convention;
pub mod manifest;

use std::collections::BTreeSet;
use std::path::Path;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::changelog::{Changelog, ChangelogError};
use crate::config::{CorpusConfig, Strategy};
use crate::document::{Document, Model};
use crate::error::{CorpusError, Result, Violation};
use crate::schema::MetadataSchema;
use crate::source::{parent, ContentSource, DirectoryTree};

/// Naming rules of a corpus, compiled from configuration
#[derive(Debug, Clone)]
pub struct Layout {
    pub strategy: Strategy,
    pub root: String,
    pub source_extension: String,
    pub metadata_suffix: String,
    pub output_extension: String,
    pub subgroups: Vec<String>,
    pub group_pattern: Regex,
    pub skip_dirs: Vec<String>,
    pub manifest_path: String,
    pub changelog_suffix: String,
}

impl Layout {
    pub fn from_config(config: &CorpusConfig) -> Result<Self> {
        let corpus = &config.corpus;
        Ok(Self {
            strategy: corpus.strategy,
            root: corpus.root.trim_end_matches('/').to_string(),
            source_extension: corpus.source_extension.clone(),
            metadata_suffix: corpus.metadata_suffix.clone(),
            output_extension: corpus.output_extension.clone(),
            subgroups: corpus.subgroups.clone(),
            group_pattern: Regex::new(&corpus.group_pattern)?,
            skip_dirs: corpus.skip_dirs.clone(),
            manifest_path: config.manifest.path.clone(),
            changelog_suffix: config.manifest.changelog_suffix.clone(),
        })
    }
}

/// Turn changelog errors into violations attributed to `document` at `path`
pub(crate) fn changelog_violations(document: &str, path: &str, errors: Vec<ChangelogError>) -> Vec<Violation> {
    errors
        .into_iter()
        .map(|e| match e {
            ChangelogError::Sequence {
                fault,
                expected,
                actual,
            } => Violation::Sequence {
                document: document.to_string(),
                path: path.to_string(),
                fault: fault.to_string(),
                expected,
                actual,
            },
            other => Violation::ChangelogEntry {
                document: document.to_string(),
                path: path.to_string(),
                message: other.to_string(),
            },
        })
        .collect()
}

/// Assembles documents from a content source.
///
/// Content is read only through [`ContentSource`] and directories are walked
/// only through [`DirectoryTree`], so the same builder works on the working
/// tree and on a pinned revision.
pub struct DocumentBuilder<'a> {
    content: &'a dyn ContentSource,
    tree: &'a dyn DirectoryTree,
    schema: &'a MetadataSchema,
    layout: &'a Layout,
}

/// Documents and violations gathered during one run
#[derive(Default)]
struct Collector {
    documents: Vec<Document>,
    violations: Vec<Violation>,
}

impl Collector {
    fn accept(&mut self, outcome: std::result::Result<Document, Vec<Violation>>) {
        match outcome {
            Ok(doc) => self.documents.push(doc),
            Err(violations) => {
                for violation in &violations {
                    error!("Validation failed: {}", violation);
                }
                self.violations.extend(violations);
            }
        }
    }
}

impl<'a> DocumentBuilder<'a> {
    pub fn new(
        content: &'a dyn ContentSource,
        tree: &'a dyn DirectoryTree,
        schema: &'a MetadataSchema,
        layout: &'a Layout,
    ) -> Self {
        Self {
            content,
            tree,
            schema,
            layout,
        }
    }

    /// Run the strategy selected by the layout
    pub fn discover(&self) -> Result<Model> {
        match self.layout.strategy {
            Strategy::Convention => self.discover_convention(),
            Strategy::Manifest => self.discover_manifest(),
        }
    }

    fn finish(&self, collector: Collector) -> Result<Model> {
        let Collector {
            documents,
            mut violations,
        } = collector;

        if violations.is_empty() {
            match Model::from_documents(documents) {
                Ok(model) => {
                    if model.is_empty() {
                        warn!("Discovery finished. No valid documents were found.");
                    } else {
                        info!("Successfully built a model with {} documents.", model.len());
                    }
                    return Ok(model);
                }
                Err(duplicates) => {
                    for violation in &duplicates {
                        error!("Validation failed: {}", violation);
                    }
                    violations = duplicates;
                }
            }
        }

        error!(
            "Discovery in {} failed with {} violation(s)",
            self.content.describe(),
            violations.len()
        );
        Err(CorpusError::Discovery(violations))
    }

    /// Read and parse a YAML file. `document` names the owner in diagnostics.
    fn load_yaml(
        &self,
        document: &str,
        role: &'static str,
        path: &str,
    ) -> std::result::Result<Value, Vec<Violation>> {
        let text = match self.content.get(path) {
            Ok(Some(text)) => text,
            Ok(None) => {
                return Err(vec![Violation::MissingFile {
                    document: document.to_string(),
                    role,
                    path: path.to_string(),
                }])
            }
            Err(e) => {
                return Err(vec![Violation::Unreadable {
                    document: document.to_string(),
                    path: path.to_string(),
                    reason: e.to_string(),
                }])
            }
        };

        let empty = || {
            vec![Violation::Empty {
                document: document.to_string(),
                path: path.to_string(),
            }]
        };

        if text.trim().is_empty() {
            return Err(empty());
        }

        match serde_yaml::from_str::<Value>(&text) {
            Ok(Value::Null) => Err(empty()),
            Ok(value) => Ok(value),
            Err(e) => Err(vec![Violation::Parse {
                document: document.to_string(),
                path: path.to_string(),
                reason: e.to_string(),
            }]),
        }
    }

    /// Schema-validate a descriptor and return it as a mapping
    fn check_schema(
        &self,
        document: &str,
        path: &str,
        value: Value,
    ) -> std::result::Result<Map<String, Value>, Vec<Violation>> {
        self.schema.validate(&value).map_err(|errors| {
            errors
                .into_iter()
                .map(|e| Violation::Schema {
                    document: document.to_string(),
                    path: path.to_string(),
                    field_path: e.field_path,
                    message: e.message,
                })
                .collect::<Vec<_>>()
        })?;

        match value {
            Value::Object(map) => Ok(map),
            _ => Err(vec![Violation::Schema {
                document: document.to_string(),
                path: path.to_string(),
                field_path: "/".to_string(),
                message: "metadata must be a mapping".to_string(),
            }]),
        }
    }

    /// Structural and sequence validation of a changelog value
    fn check_changelog(
        &self,
        document: &str,
        path: &str,
        value: &Value,
    ) -> std::result::Result<Changelog, Vec<Violation>> {
        Changelog::parse(value).map_err(|errors| changelog_violations(document, path, errors))
    }

    /// Every file of the source's kind under the source's directory, minus the source
    fn subfiles(&self, document: &str, source: &str) -> std::result::Result<BTreeSet<String>, Vec<Violation>> {
        let extension = Path::new(source)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or(self.layout.source_extension.as_str());

        let files = self
            .tree
            .files_with_extension(parent(source), extension)
            .map_err(|e| {
                vec![Violation::Unreadable {
                    document: document.to_string(),
                    path: parent(source).to_string(),
                    reason: e.to_string(),
                }]
            })?;

        Ok(files.into_iter().filter(|f| f != source).collect())
    }

    /// Fail with a `MissingFile` violation for every path that is not a regular file
    fn require_files(
        &self,
        document: &str,
        files: &[(&'static str, &str)],
    ) -> std::result::Result<(), Vec<Violation>> {
        let mut violations = Vec::new();
        for &(role, path) in files {
            match self.tree.is_file(path) {
                Ok(true) => {}
                Ok(false) => violations.push(Violation::MissingFile {
                    document: document.to_string(),
                    role,
                    path: path.to_string(),
                }),
                Err(e) => violations.push(Violation::Unreadable {
                    document: document.to_string(),
                    path: path.to_string(),
                    reason: e.to_string(),
                }),
            }
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

//! Manifest-driven discovery
//!
//! The manifest is a YAML list of entries, each naming a document explicitly:
//!
//! ```yaml
//! - title: Norme di progetto
//!   source: docs/interni/norme.typ
//!   output: interni/norme.pdf
//!   group: interni
//! ```
//!
//! The changelog of each document lives next to its source, at
//! `<source without extension>.<changelog suffix>`.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{Collector, DocumentBuilder};
use crate::document::{Document, Model};
use crate::error::{CorpusError, Result, Violation};
use crate::schema::MetadataSchema;

const MANIFEST_LABEL: &str = "manifest";

/// One declared document
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    pub title: String,
    pub source: String,
    pub output: String,
    pub group: String,
}

/// Sidecar changelog path for a source file
pub fn changelog_path(source: &str, suffix: &str) -> String {
    let file_start = source.rfind('/').map(|i| i + 1).unwrap_or(0);
    let stem_end = source[file_start..]
        .rfind('.')
        .filter(|&i| i > 0)
        .map(|i| file_start + i)
        .unwrap_or(source.len());
    format!("{}.{}", &source[..stem_end], suffix)
}

impl<'a> DocumentBuilder<'a> {
    /// Discover documents listed in the layout's manifest file.
    pub fn discover_manifest(&self) -> Result<Model> {
        let path = self.layout.manifest_path.as_str();
        info!("Loading document manifest '{}' ({})", path, self.content.describe());

        let entries = self.load_manifest(path)?;
        let mut collector = Collector::default();
        for entry in &entries {
            collector.accept(self.build_manifest_document(entry));
        }
        self.finish(collector)
    }

    fn load_manifest(&self, path: &str) -> Result<Vec<ManifestEntry>> {
        let value = self
            .load_yaml(MANIFEST_LABEL, "manifest", path)
            .map_err(|violations| match violations.as_slice() {
                [Violation::MissingFile { .. }] => CorpusError::ManifestNotFound(path.to_string()),
                _ => CorpusError::Discovery(violations),
            })?;

        let schema = MetadataSchema::manifest()?;
        if let Err(errors) = schema.validate(&value) {
            let violations = errors
                .into_iter()
                .map(|e| Violation::Schema {
                    document: MANIFEST_LABEL.to_string(),
                    path: path.to_string(),
                    field_path: e.field_path,
                    message: e.message,
                })
                .collect();
            return Err(CorpusError::Discovery(violations));
        }

        Ok(serde_json::from_value(value)?)
    }

    fn build_manifest_document(&self, entry: &ManifestEntry) -> std::result::Result<Document, Vec<Violation>> {
        let title = entry.title.as_str();
        debug!("Processing manifest entry: '{}'", title);

        let metadata_path = changelog_path(&entry.source, &self.layout.changelog_suffix);
        self.require_files(title, &[("source", &entry.source), ("changelog", &metadata_path)])?;

        let value = self.load_yaml(title, "changelog", &metadata_path)?;
        // The sidecar is either the bare list or a mapping holding it
        let changelog_value = match value {
            Value::Object(mut map) => map.remove("changelog").unwrap_or(Value::Null),
            other => other,
        };
        let changelog = self.check_changelog(title, &metadata_path, &changelog_value)?;

        let mut metadata = Map::new();
        metadata.insert("title".to_string(), Value::String(entry.title.clone()));
        metadata.insert("changelog".to_string(), changelog_value);

        let subfiles = self.subfiles(title, &entry.source)?;

        Ok(Document {
            source: entry.source.clone(),
            output: entry.output.clone(),
            group: entry.group.clone(),
            subgroup: None,
            metadata_path,
            metadata,
            latest_version: changelog.latest_version(),
            last_modified_date: changelog.last_modified_date().to_string(),
            changelog,
            subfiles,
        })
    }
}

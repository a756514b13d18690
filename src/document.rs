//! Document records and the model that collects them

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::changelog::Changelog;
use crate::error::Violation;

/// One validated document of the corpus.
///
/// Built once per discovery run and never mutated; change is only observed by
/// comparing two models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Primary source file, unique within a model
    pub source: String,
    /// Rendered artifact path, relative to the output directory
    pub output: String,
    pub group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subgroup: Option<String>,
    /// Descriptor the changelog was read from
    pub metadata_path: String,
    /// Validated descriptor, always holding `title` and `changelog`
    pub metadata: Map<String, Value>,
    pub changelog: Changelog,
    /// Other files of the source's kind under the source's directory
    pub subfiles: BTreeSet<String>,
    pub latest_version: u32,
    pub last_modified_date: String,
}

impl Document {
    pub fn title(&self) -> &str {
        self.metadata
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or(&self.source)
    }

    /// The source plus every subfile: the files whose change counts as a
    /// content change of this document.
    pub fn content_files(&self) -> BTreeSet<&str> {
        std::iter::once(self.source.as_str())
            .chain(self.subfiles.iter().map(String::as_str))
            .collect()
    }

    /// Label used in diagnostics
    pub fn label(&self) -> String {
        format!("{} ({})", self.title(), self.source)
    }
}

/// The complete, validated collection of documents from one discovery run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Model {
    documents: Vec<Document>,
}

impl Model {
    /// Build a model, rejecting repeated sources.
    pub fn from_documents(documents: Vec<Document>) -> Result<Self, Vec<Violation>> {
        let mut seen = BTreeSet::new();
        let mut reported = BTreeSet::new();
        let mut violations = Vec::new();
        for doc in &documents {
            if !seen.insert(doc.source.as_str()) && reported.insert(doc.source.as_str()) {
                violations.push(Violation::DuplicateSource {
                    path: doc.source.clone(),
                });
            }
        }

        if violations.is_empty() {
            Ok(Self { documents })
        } else {
            Err(violations)
        }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, source: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.source == source)
    }

    pub fn by_source(&self) -> BTreeMap<&str, &Document> {
        self.documents
            .iter()
            .map(|d| (d.source.as_str(), d))
            .collect()
    }

    /// Documents ordered newest first by last-modified date, then by source
    pub fn sorted_by_last_modified(&self) -> Vec<&Document> {
        let mut docs: Vec<&Document> = self.documents.iter().collect();
        docs.sort_by(|a, b| {
            b.last_modified_date
                .cmp(&a.last_modified_date)
                .then_with(|| a.source.cmp(&b.source))
        });
        docs
    }

    /// Documents ordered by source, the canonical snapshot order
    pub fn sorted_by_source(&self) -> Vec<&Document> {
        self.by_source().into_values().collect()
    }

    /// Equality under source-keyed comparison, ignoring collection order
    pub fn same_documents(&self, other: &Model) -> bool {
        self.by_source() == other.by_source()
    }

    pub fn into_documents(self) -> Vec<Document> {
        self.documents
    }
}

//! Serialized model snapshots
//!
//! `generate` writes a snapshot of a discovered model; `compare` reads two of
//! them back. Documents are stored sorted by source and sets as sorted
//! sequences, so two snapshots of the same tree are byte-identical apart from
//! the timestamp. A SHA-256 digest of the document list guards against
//! hand-edited snapshots.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::changelog::Changelog;
use crate::checksum::Checksum;
use crate::discovery::changelog_violations;
use crate::document::{Document, Model};
use crate::error::{CorpusError, Result, Violation};

/// A model frozen to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub generated_at: DateTime<Utc>,
    /// Revision the model was discovered from, when not the working tree
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    pub digest: Checksum,
    pub documents: Vec<Document>,
}

impl ModelSnapshot {
    pub fn from_model(model: &Model, revision: Option<&str>) -> Result<Self> {
        let documents: Vec<Document> = model.sorted_by_source().into_iter().cloned().collect();
        let digest = Checksum::of_json(&documents)?;
        Ok(Self {
            generated_at: Utc::now(),
            revision: revision.map(String::from),
            digest,
            documents,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a snapshot and verify its digest
    pub fn from_json(content: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(content)?;
        let actual = Checksum::of_json(&snapshot.documents)?;
        if actual != snapshot.digest {
            return Err(CorpusError::DigestMismatch {
                expected: snapshot.digest.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(snapshot)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        debug!("Wrote snapshot of {} documents to {:?}", self.documents.len(), path);
        Ok(())
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Rebuild the model, re-checking every changelog and source uniqueness.
    ///
    /// The digest only detects accidental edits; it can be recomputed, so the
    /// versioning invariants are checked again before a snapshot is gated.
    pub fn into_model(self) -> Result<Model> {
        let mut violations = Vec::new();
        for doc in &self.documents {
            violations.extend(check_document(doc)?);
        }
        if !violations.is_empty() {
            for violation in &violations {
                error!("Snapshot validation failed: {}", violation);
            }
            return Err(CorpusError::Discovery(violations));
        }
        Model::from_documents(self.documents).map_err(CorpusError::Discovery)
    }
}

/// Changelog sequence and derived fields of one stored document
fn check_document(doc: &Document) -> Result<Vec<Violation>> {
    let title = doc.title();
    let changelog = match Changelog::parse(&serde_json::to_value(&doc.changelog)?) {
        Ok(changelog) => changelog,
        Err(errors) => return Ok(changelog_violations(title, &doc.metadata_path, errors)),
    };

    let mut violations = Vec::new();
    if doc.latest_version != changelog.latest_version() {
        violations.push(Violation::ChangelogEntry {
            document: title.to_string(),
            path: doc.metadata_path.clone(),
            message: format!(
                "latest_version {} does not match newest changelog version {}",
                doc.latest_version,
                changelog.latest_version()
            ),
        });
    }
    if doc.last_modified_date != changelog.last_modified_date() {
        violations.push(Violation::ChangelogEntry {
            document: title.to_string(),
            path: doc.metadata_path.clone(),
            message: format!(
                "last_modified_date {} does not match newest changelog date {}",
                doc.last_modified_date,
                changelog.last_modified_date()
            ),
        });
    }
    Ok(violations)
}

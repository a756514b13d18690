//! Version gate
//!
//! Compares a "before" and an "after" model together with the set of files
//! physically changed between them, and enforces the versioning contract:
//!
//! | Document | Content changed | Required `after.latest_version` |
//! |----------|-----------------|---------------------------------|
//! | new      | (any)           | `1`                             |
//! | common   | yes             | `before + 1`                    |
//! | common   | no              | `before`                        |
//!
//! A document's content changed when its source or any of its subfiles is in
//! the changed set. Added and removed documents are reported but never block.
//! Every violation is collected; the gate passes only when there are none.

use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::document::Model;

/// A broken versioning rule
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GateViolation {
    #[error("new document {document} must start at version 1, found {found}")]
    NewDocumentVersion { document: String, found: u32 },

    #[error("{document} was modified and must increment by exactly 1: version {before} -> {after}, expected {}", next_version(.before))]
    InvalidIncrement {
        document: String,
        before: u32,
        after: u32,
    },

    #[error("{document}: version bumped without content change ({before} -> {after})")]
    BumpWithoutChange {
        document: String,
        before: u32,
        after: u32,
    },
}

fn next_version(before: &u32) -> String {
    match before.checked_add(1) {
        Some(next) => next.to_string(),
        None => "none (version limit reached)".to_string(),
    }
}

/// Outcome of comparing two models
#[derive(Debug, Clone, Default, Serialize)]
pub struct GateReport {
    /// Sources present only after
    pub added: Vec<String>,
    /// Sources present only before
    pub removed: Vec<String>,
    /// Common sources whose content files changed
    pub modified: Vec<String>,
    /// Common sources with no changed content file
    pub unchanged: Vec<String>,
    pub violations: Vec<GateViolation>,
}

impl GateReport {
    pub fn is_accepted(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Run the version gate over two models and a changed-path set.
pub fn compare(before: &Model, after: &Model, changed: &BTreeSet<String>) -> GateReport {
    let before_docs = before.by_source();
    let after_docs = after.by_source();
    let mut report = GateReport::default();

    for (source, doc) in &after_docs {
        let Some(old) = before_docs.get(source) else {
            report.added.push(source.to_string());
            if doc.latest_version != 1 {
                report.violations.push(GateViolation::NewDocumentVersion {
                    document: doc.label(),
                    found: doc.latest_version,
                });
            } else {
                info!("New document '{}' correctly starts at version 1.", doc.title());
            }
            continue;
        };

        let touched: Vec<&str> = doc
            .content_files()
            .into_iter()
            .filter(|f| changed.contains(*f))
            .collect();

        if touched.is_empty() {
            report.unchanged.push(source.to_string());
            if doc.latest_version != old.latest_version {
                report.violations.push(GateViolation::BumpWithoutChange {
                    document: doc.label(),
                    before: old.latest_version,
                    after: doc.latest_version,
                });
            }
            continue;
        }

        debug!("Document '{}' was modified: {:?}", doc.title(), touched);
        report.modified.push(source.to_string());
        if old.latest_version.checked_add(1) != Some(doc.latest_version) {
            report.violations.push(GateViolation::InvalidIncrement {
                document: doc.label(),
                before: old.latest_version,
                after: doc.latest_version,
            });
        } else {
            info!(
                "Document '{}' correctly incremented version from {} to {}.",
                doc.title(),
                old.latest_version,
                doc.latest_version
            );
        }
    }

    report.removed = before_docs
        .keys()
        .filter(|source| !after_docs.contains_key(*source))
        .map(|source| source.to_string())
        .collect();

    for source in &report.added {
        info!("Added document: {}", source);
    }
    for source in &report.removed {
        info!("Removed document: {}", source);
    }
    for violation in &report.violations {
        error!("Version gate violation: {}", violation);
    }

    report
}

//! Changelog validation
//!
//! A changelog is the ordered revision history of one document, newest entry
//! first. Two independent checks apply:
//!
//! - **Structural**: a non-empty list of entries, each carrying `version`,
//!   `date`, `authors`, `verifiers` and `description` with the right types.
//! - **Sequence**: read top to bottom, versions are exactly `n, n-1, ..., 1`.
//!
//! The sequence rule guarantees that the latest version equals the number of
//! recorded revisions, which is what the version gate relies on.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Field set every changelog entry must carry
pub const ENTRY_FIELDS: [&str; 5] = ["version", "date", "authors", "verifiers", "description"];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One revision record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    pub version: u32,
    pub date: String,
    pub authors: Vec<String>,
    pub verifiers: Vec<String>,
    pub description: String,
}

/// Why a version sequence was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceFault {
    NotDescending,
    Duplicate(u32),
    Missing(Vec<u32>),
    Unexpected(Vec<u32>),
}

impl fmt::Display for SequenceFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceFault::NotDescending => write!(f, "versions are not sorted descending"),
            SequenceFault::Duplicate(v) => write!(f, "duplicate version {}", v),
            SequenceFault::Missing(vs) => write!(f, "missing version {}", join_versions(vs)),
            SequenceFault::Unexpected(vs) => write!(f, "unexpected version {}", join_versions(vs)),
        }
    }
}

fn join_versions(versions: &[u32]) -> String {
    versions
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Changelog validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChangelogError {
    #[error("changelog must be a list of entries")]
    NotAList,

    #[error("changelog has no entries")]
    Empty,

    #[error("entry #{index} must be a mapping")]
    NotAMapping { index: usize },

    #[error("entry #{index}: missing field '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("entry #{index}: field '{field}' {expected}")]
    WrongType {
        index: usize,
        field: &'static str,
        expected: &'static str,
    },

    #[error("{fault}; expected {expected:?}, found {actual:?}")]
    Sequence {
        fault: SequenceFault,
        expected: Vec<u32>,
        actual: Vec<u32>,
    },
}

/// A structurally valid changelog, newest entry first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Changelog(Vec<ChangelogEntry>);

impl Changelog {
    /// Structural check: every faulty entry is reported.
    pub fn from_value(value: &Value) -> Result<Self, Vec<ChangelogError>> {
        let items = value.as_array().ok_or_else(|| vec![ChangelogError::NotAList])?;
        if items.is_empty() {
            return Err(vec![ChangelogError::Empty]);
        }

        let mut entries = Vec::with_capacity(items.len());
        let mut errors = Vec::new();
        for (index, item) in items.iter().enumerate() {
            match parse_entry(index, item) {
                Ok(entry) => entries.push(entry),
                Err(mut entry_errors) => errors.append(&mut entry_errors),
            }
        }

        if errors.is_empty() {
            Ok(Self(entries))
        } else {
            Err(errors)
        }
    }

    /// Structural and sequence checks together.
    pub fn parse(value: &Value) -> Result<Self, Vec<ChangelogError>> {
        let changelog = Self::from_value(value)?;
        check_sequence(&changelog.versions()).map_err(|e| vec![e])?;
        Ok(changelog)
    }

    pub fn entries(&self) -> &[ChangelogEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn versions(&self) -> Vec<u32> {
        self.0.iter().map(|e| e.version).collect()
    }

    /// Newest entry
    pub fn latest(&self) -> Option<&ChangelogEntry> {
        self.0.first()
    }

    pub fn latest_version(&self) -> u32 {
        self.latest().map(|e| e.version).unwrap_or(0)
    }

    pub fn last_modified_date(&self) -> &str {
        self.latest().map(|e| e.date.as_str()).unwrap_or("")
    }
}

fn parse_entry(index: usize, item: &Value) -> Result<ChangelogEntry, Vec<ChangelogError>> {
    let Some(map) = item.as_object() else {
        return Err(vec![ChangelogError::NotAMapping { index }]);
    };

    let mut errors = Vec::new();
    for field in ENTRY_FIELDS {
        if !map.contains_key(field) {
            errors.push(ChangelogError::MissingField { index, field });
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let version = map["version"]
        .as_u64()
        .and_then(|v| u32::try_from(v).ok());
    if version.is_none() {
        errors.push(ChangelogError::WrongType {
            index,
            field: "version",
            expected: "must be a non-negative integer",
        });
    }

    let date = map["date"].as_str();
    if !date.is_some_and(|d| NaiveDate::parse_from_str(d, DATE_FORMAT).is_ok()) {
        errors.push(ChangelogError::WrongType {
            index,
            field: "date",
            expected: "must be a YYYY-MM-DD date",
        });
    }

    let authors = string_list(&map["authors"]);
    if authors.is_none() {
        errors.push(ChangelogError::WrongType {
            index,
            field: "authors",
            expected: "must be a list of names",
        });
    }

    let verifiers = string_list(&map["verifiers"]);
    if verifiers.is_none() {
        errors.push(ChangelogError::WrongType {
            index,
            field: "verifiers",
            expected: "must be a list of names",
        });
    }

    let description = map["description"].as_str();
    if description.is_none() {
        errors.push(ChangelogError::WrongType {
            index,
            field: "description",
            expected: "must be a string",
        });
    }

    match (version, date, authors, verifiers, description) {
        (Some(version), Some(date), Some(authors), Some(verifiers), Some(description))
            if errors.is_empty() =>
        {
            Ok(ChangelogEntry {
                version,
                date: date.to_string(),
                authors,
                verifiers,
                description: description.to_string(),
            })
        }
        _ => Err(errors),
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(String::from))
        .collect()
}

/// Accept iff `versions == [n, n-1, ..., 1]` where `n = versions.len()`.
pub fn check_sequence(versions: &[u32]) -> Result<(), ChangelogError> {
    let n = versions.len() as u32;
    let expected: Vec<u32> = (1..=n).rev().collect();
    if versions == expected.as_slice() {
        return Ok(());
    }

    Err(ChangelogError::Sequence {
        fault: diagnose(versions, &expected),
        expected,
        actual: versions.to_vec(),
    })
}

fn diagnose(actual: &[u32], expected: &[u32]) -> SequenceFault {
    if actual.windows(2).any(|w| w[0] < w[1]) {
        return SequenceFault::NotDescending;
    }

    let mut seen = BTreeSet::new();
    for &v in actual {
        if !seen.insert(v) {
            return SequenceFault::Duplicate(v);
        }
    }

    let expected_set: BTreeSet<u32> = expected.iter().copied().collect();
    let mut missing: Vec<u32> = expected_set.difference(&seen).copied().collect();
    if !missing.is_empty() {
        missing.reverse();
        return SequenceFault::Missing(missing);
    }
    let mut unexpected: Vec<u32> = seen.difference(&expected_set).copied().collect();
    unexpected.reverse();
    SequenceFault::Unexpected(unexpected)
}

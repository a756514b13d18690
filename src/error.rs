//! Error types for corpus discovery and gating

use thiserror::Error;

/// Result type for corpus operations
pub type Result<T> = std::result::Result<T, CorpusError>;

/// Corpus errors
#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("Corpus root not found: {0}")]
    RootNotFound(String),

    #[error("Manifest not found: {0}")]
    ManifestNotFound(String),

    #[error("Revision not found: {0}")]
    RevisionNotFound(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("File is not valid UTF-8: {0}")]
    Encoding(String),

    #[error("Snapshot digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("Discovery failed with {} violation(s)", .0.len())]
    Discovery(Vec<Violation>),

    #[error("Compiler not found: {0}")]
    CompilerNotFound(String),

    #[error("Site template not found: {0}")]
    TemplateNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

impl CorpusError {
    /// Per-document violations carried by a failed discovery, empty otherwise
    pub fn violations(&self) -> &[Violation] {
        match self {
            CorpusError::Discovery(violations) => violations,
            _ => &[],
        }
    }
}

/// A reason a single document was rejected during discovery.
///
/// `document` names the offending document (its title when known, otherwise
/// its directory or manifest entry) so diagnostics stay readable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("'{document}': missing {role} file '{path}'")]
    MissingFile {
        document: String,
        role: &'static str,
        path: String,
    },

    #[error("'{document}': could not read '{path}': {reason}")]
    Unreadable {
        document: String,
        path: String,
        reason: String,
    },

    #[error("'{document}': could not parse '{path}': {reason}")]
    Parse {
        document: String,
        path: String,
        reason: String,
    },

    #[error("'{document}': file '{path}' is empty")]
    Empty { document: String, path: String },

    #[error("'{document}': schema validation failed for '{path}' at {field_path}: {message}")]
    Schema {
        document: String,
        path: String,
        field_path: String,
        message: String,
    },

    #[error("'{document}': changelog in '{path}' is invalid: {message}")]
    ChangelogEntry {
        document: String,
        path: String,
        message: String,
    },

    #[error("'{document}': changelog versions in '{path}' are not sequential ({fault}); expected {expected:?}, found {actual:?}")]
    Sequence {
        document: String,
        path: String,
        fault: String,
        expected: Vec<u32>,
        actual: Vec<u32>,
    },

    #[error("duplicate document source '{path}'")]
    DuplicateSource { path: String },
}

impl Violation {
    /// Path of the file this violation points at
    pub fn path(&self) -> &str {
        match self {
            Violation::MissingFile { path, .. }
            | Violation::Unreadable { path, .. }
            | Violation::Parse { path, .. }
            | Violation::Empty { path, .. }
            | Violation::Schema { path, .. }
            | Violation::ChangelogEntry { path, .. }
            | Violation::Sequence { path, .. }
            | Violation::DuplicateSource { path } => path,
        }
    }
}

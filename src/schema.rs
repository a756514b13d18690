//! Structural validation of metadata descriptors
//!
//! Descriptors are YAML, parsed into `serde_json::Value` and checked against a
//! draft-7 JSON Schema. The default document schema and the manifest schema
//! are embedded; a corpus may supply its own document schema file.

use std::fmt;
use std::fs;
use std::path::Path;

use jsonschema::{Draft, JSONSchema};
use serde_json::Value;

use crate::error::{CorpusError, Result};

const META_SCHEMA: &str = include_str!("../schemas/meta.schema.json");
const MANIFEST_SCHEMA: &str = include_str!("../schemas/manifest.schema.json");

/// One structural problem found in a validated value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// JSON pointer to the offending field (`/` for the document root)
    pub field_path: String,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.field_path)
    }
}

/// A compiled JSON Schema
pub struct MetadataSchema {
    name: String,
    compiled: JSONSchema,
}

impl MetadataSchema {
    /// Compile a schema from an already-parsed value
    pub fn from_value(name: impl Into<String>, schema: &Value) -> Result<Self> {
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(schema)
            .map_err(|e| CorpusError::InvalidSchema(e.to_string()))?;
        Ok(Self {
            name: name.into(),
            compiled,
        })
    }

    /// Load and compile a schema file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CorpusError::InvalidSchema(format!("cannot read '{}': {}", path.display(), e))
        })?;
        let schema: Value = serde_json::from_str(&content)?;
        Self::from_value(path.display().to_string(), &schema)
    }

    /// The built-in document metadata schema
    pub fn embedded() -> Result<Self> {
        let schema: Value = serde_json::from_str(META_SCHEMA)?;
        Self::from_value("meta.schema.json", &schema)
    }

    /// The built-in manifest schema
    pub fn manifest() -> Result<Self> {
        let schema: Value = serde_json::from_str(MANIFEST_SCHEMA)?;
        Self::from_value("manifest.schema.json", &schema)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validate `instance`, reporting every violation.
    pub fn validate(&self, instance: &Value) -> std::result::Result<(), Vec<SchemaViolation>> {
        match self.compiled.validate(instance) {
            Ok(()) => Ok(()),
            Err(errors) => Err(errors
                .map(|error| {
                    let pointer = error.instance_path.to_string();
                    SchemaViolation {
                        field_path: if pointer.is_empty() { "/".to_string() } else { pointer },
                        message: error.to_string(),
                    }
                })
                .collect()),
        }
    }
}

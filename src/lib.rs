//! Document Corpus Model
//!
//! Discovers a versioned corpus of typeset documents, validates every
//! document's metadata and changelog, and enforces the versioning contract
//! between two revisions of the corpus.
//!
//! ## Features
//!
//! - **All-or-nothing discovery**: every violation is reported, and a single
//!   invalid document rejects the whole model
//! - **Two strategies**: directory convention or explicit manifest
//! - **Revision-aware**: the same discovery runs on the working tree or on any
//!   git revision
//! - **Version gate**: changed documents must bump their version by exactly one
//!
//! ## Layout
//!
//! ```text
//! docs/
//! ├── 00-templates/
//! ├── 01-candidatura/
//! │   ├── interna/
//! │   │   └── verbale-01/
//! │   │       ├── verbale-01.typ
//! │   │       └── verbale-01.meta.yaml
//! │   ├── esterna/
//! │   └── slides/
//! └── 11-rtb/
//! ```

pub mod changelog;
pub mod checksum;
pub mod config;
pub mod discovery;
pub mod document;
pub mod error;
pub mod gate;
pub mod render;
pub mod revision;
pub mod schema;
pub mod site;
pub mod snapshot;
pub mod source;

pub use changelog::{Changelog, ChangelogEntry};
pub use checksum::Checksum;
pub use config::{CorpusConfig, Strategy};
pub use discovery::{DocumentBuilder, Layout};
pub use document::{Document, Model};
pub use error::{CorpusError, Result, Violation};
pub use gate::{GateReport, GateViolation};
pub use render::{RenderSummary, Renderer};
pub use revision::RevisionSource;
pub use schema::MetadataSchema;
pub use site::SiteGenerator;
pub use snapshot::ModelSnapshot;
pub use source::{ContentSource, DirectoryTree, LocalSource};

/// Load the metadata schema named by the configuration, or the embedded one
pub fn load_schema(config: &CorpusConfig) -> Result<MetadataSchema> {
    match &config.schema.path {
        Some(path) => MetadataSchema::from_file(path),
        None => MetadataSchema::embedded(),
    }
}

/// Discover the model of a working tree rooted at `repo_root`
pub fn discover_local(config: &CorpusConfig, repo_root: impl Into<std::path::PathBuf>) -> Result<Model> {
    let source = LocalSource::new(repo_root);
    let schema = load_schema(config)?;
    let layout = Layout::from_config(config)?;
    DocumentBuilder::new(&source, &source, &schema, &layout).discover()
}

/// Discover the model of a git revision of the repository at `repo_path`
pub fn discover_revision(
    config: &CorpusConfig,
    repo_path: impl AsRef<std::path::Path>,
    revision: &str,
) -> Result<Model> {
    let source = RevisionSource::open(repo_path, revision)?;
    let schema = load_schema(config)?;
    let layout = Layout::from_config(config)?;
    DocumentBuilder::new(&source, &source, &schema, &layout).discover()
}

//! Configuration management for corpus tooling
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (corpus.toml)
//! - Environment variables (CORPUS__*)
//!
//! ## Example config file (corpus.toml):
//! ```toml
//! [corpus]
//! strategy = "convention"
//! root = "docs"
//! subgroups = ["interna", "esterna", "slides"]
//!
//! [schema]
//! path = ".schemas/meta.schema.json"
//!
//! [gate]
//! base = "origin/main"
//!
//! [render]
//! compiler = "typst"
//! font_path = "docs/00-templates/assets/fonts"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Layout of the corpus tree
    #[serde(default)]
    pub corpus: LayoutConfig,

    /// Manifest-driven discovery settings
    #[serde(default)]
    pub manifest: ManifestConfig,

    /// Metadata schema settings
    #[serde(default)]
    pub schema: SchemaSettings,

    /// Version gate settings
    #[serde(default)]
    pub gate: GateConfig,

    /// Renderer settings
    #[serde(default)]
    pub render: RenderConfig,

    /// Static site settings
    #[serde(default)]
    pub site: SiteConfig,
}

/// How documents are discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Walk `<root>/<NN-group>/<subgroup>/<docname>/`
    #[default]
    Convention,
    /// Read an explicit manifest of documents
    Manifest,
}

/// Corpus layout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default)]
    pub strategy: Strategy,

    /// Corpus root, relative to the repository root
    #[serde(default = "default_root")]
    pub root: String,

    /// Extension of primary source files (without the dot)
    #[serde(default = "default_source_extension")]
    pub source_extension: String,

    /// Suffix of the metadata descriptor: `<docname>.<suffix>`
    #[serde(default = "default_metadata_suffix")]
    pub metadata_suffix: String,

    /// Extension of rendered artifacts
    #[serde(default = "default_output_extension")]
    pub output_extension: String,

    /// Allowed subgroup directory names
    #[serde(default = "default_subgroups")]
    pub subgroups: Vec<String>,

    /// Pattern group directories must match
    #[serde(default = "default_group_pattern")]
    pub group_pattern: String,

    /// Root-level directories that are skipped silently
    #[serde(default = "default_skip_dirs")]
    pub skip_dirs: Vec<String>,
}

/// Manifest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestConfig {
    /// Path to the manifest file, relative to the repository root
    #[serde(default = "default_manifest_path")]
    pub path: String,

    /// Changelog sidecar suffix: `<source stem>.<suffix>`
    #[serde(default = "default_changelog_suffix")]
    pub changelog_suffix: String,
}

/// Schema configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaSettings {
    /// Custom metadata schema; the embedded schema is used when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Version gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Revision holding the "before" model
    #[serde(default = "default_base")]
    pub base: String,

    /// Revision the changed-file set is computed against
    #[serde(default = "default_head")]
    pub head: String,
}

/// Renderer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Compiler executable
    #[serde(default = "default_compiler")]
    pub compiler: String,

    /// Font directory; system fonts are ignored when set
    #[serde(default)]
    pub font_path: Option<PathBuf>,

    /// Output directory for rendered documents
    #[serde(default = "default_render_output")]
    pub output_dir: PathBuf,
}

/// Static site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Directory with static assets and `index.template.html`
    #[serde(default = "default_site_dir")]
    pub site_dir: PathBuf,

    /// Output directory for the generated site
    #[serde(default = "default_site_output")]
    pub output_dir: PathBuf,

    /// Subfolder of the site holding rendered documents
    #[serde(default = "default_docs_folder")]
    pub docs_folder: String,
}

// Default value functions
fn default_root() -> String {
    "docs".to_string()
}

fn default_source_extension() -> String {
    "typ".to_string()
}

fn default_metadata_suffix() -> String {
    "meta.yaml".to_string()
}

fn default_output_extension() -> String {
    "pdf".to_string()
}

fn default_subgroups() -> Vec<String> {
    vec![
        "interna".to_string(),
        "esterna".to_string(),
        "slides".to_string(),
    ]
}

fn default_group_pattern() -> String {
    r"^(01-|[1-9][0-9]-)".to_string()
}

fn default_skip_dirs() -> Vec<String> {
    vec!["00-templates".to_string()]
}

fn default_manifest_path() -> String {
    "documents.yaml".to_string()
}

fn default_changelog_suffix() -> String {
    "changelog.yaml".to_string()
}

fn default_base() -> String {
    "origin/main".to_string()
}

fn default_head() -> String {
    "HEAD".to_string()
}

fn default_compiler() -> String {
    "typst".to_string()
}

fn default_render_output() -> PathBuf {
    PathBuf::from("dist/docs")
}

fn default_site_dir() -> PathBuf {
    PathBuf::from("site")
}

fn default_site_output() -> PathBuf {
    PathBuf::from("dist")
}

fn default_docs_folder() -> String {
    "docs".to_string()
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Convention,
            root: default_root(),
            source_extension: default_source_extension(),
            metadata_suffix: default_metadata_suffix(),
            output_extension: default_output_extension(),
            subgroups: default_subgroups(),
            group_pattern: default_group_pattern(),
            skip_dirs: default_skip_dirs(),
        }
    }
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            path: default_manifest_path(),
            changelog_suffix: default_changelog_suffix(),
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            base: default_base(),
            head: default_head(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            compiler: default_compiler(),
            font_path: None,
            output_dir: default_render_output(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_dir: default_site_dir(),
            output_dir: default_site_output(),
            docs_folder: default_docs_folder(),
        }
    }
}

impl CorpusConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a specific file on top of the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["corpus.toml", ".corpus.toml", "config/corpus.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "corpus", "doc-corpus") {
            let xdg_config = config_dir.config_dir().join("corpus.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // CORPUS__GATE__BASE=origin/develop
        builder = builder.add_source(
            Environment::with_prefix("CORPUS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

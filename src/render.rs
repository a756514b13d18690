//! Document rendering through an external compiler
//!
//! Each document is compiled on its own; a failed document is logged and
//! counted but does not stop the others.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, error, info};

use crate::config::RenderConfig;
use crate::document::{Document, Model};
use crate::error::{CorpusError, Result};
use crate::source::parent;

/// Counts of one rendering run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl RenderSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Invokes the compiler for every document of a model
#[derive(Debug, Clone)]
pub struct Renderer {
    compiler: String,
    root: PathBuf,
    output_dir: PathBuf,
    font_path: Option<PathBuf>,
}

impl Renderer {
    /// `root` is the directory document paths are relative to
    pub fn new(config: &RenderConfig, root: impl Into<PathBuf>) -> Self {
        Self {
            compiler: config.compiler.clone(),
            root: root.into(),
            output_dir: config.output_dir.clone(),
            font_path: config.font_path.clone(),
        }
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Where a document's artifact is written
    pub fn output_path(&self, doc: &Document) -> PathBuf {
        self.output_dir.join(&doc.output)
    }

    /// Build the compile command for one document without running it
    pub fn command(&self, doc: &Document) -> Command {
        let mut command = Command::new(&self.compiler);
        command
            .arg("compile")
            .arg(self.root.join(&doc.source))
            .arg(self.output_path(doc))
            .arg("--input")
            .arg(format!("meta_path={}", meta_path_input(doc)))
            .arg("--root")
            .arg(&self.root);
        if let Some(fonts) = &self.font_path {
            command.arg("--ignore-system-fonts").arg("--font-path").arg(fonts);
        }
        command
    }

    /// Compile one document. `Ok(false)` means the compiler ran and failed.
    pub fn render(&self, doc: &Document) -> Result<bool> {
        let output = self.output_path(doc);
        if let Some(dir) = output.parent() {
            fs::create_dir_all(dir)?;
        }

        info!("Compiling '{}': {} -> {}", doc.title(), doc.source, output.display());
        let mut command = self.command(doc);
        debug!("Executing: {:?}", command);

        let result = match command.output() {
            Ok(result) => result,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CorpusError::CompilerNotFound(self.compiler.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let stderr = String::from_utf8_lossy(&result.stderr);
        if result.status.success() {
            if !stderr.trim().is_empty() {
                info!("WARNINGS: {}", stderr.trim());
            }
            info!("SUCCESS: '{}' compiled.", doc.title());
            Ok(true)
        } else {
            error!(
                "FAILURE: Compiling '{}' failed.\n--- START compiler ERROR ---\n{}\n--- END compiler ERROR ---",
                doc.title(),
                stderr.trim()
            );
            Ok(false)
        }
    }

    /// Compile every document of the model
    pub fn render_all(&self, model: &Model) -> Result<RenderSummary> {
        fs::create_dir_all(&self.output_dir)?;
        info!("Starting compilation of {} documents...", model.len());

        let mut summary = RenderSummary::default();
        for doc in model.documents() {
            if self.render(doc)? {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
        }

        info!(
            "Build finished. Summary: {} succeeded, {} failed.",
            summary.succeeded, summary.failed
        );
        Ok(summary)
    }
}

/// Descriptor path handed to the compiler, relative to the source directory.
///
/// Descriptors outside the source directory are given root-relative, which
/// the compiler resolves against `--root`.
fn meta_path_input(doc: &Document) -> String {
    let source_dir = parent(&doc.source);
    let prefix = if source_dir.is_empty() {
        String::new()
    } else {
        format!("{}/", source_dir)
    };
    match doc.metadata_path.strip_prefix(&prefix) {
        Some(rest) if !rest.contains('/') => rest.to_string(),
        _ => format!("/{}", doc.metadata_path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changelog::Changelog;
    use serde_json::{json, Map};
    use std::collections::BTreeSet;
    use std::ffi::OsStr;

    fn doc(source: &str, metadata_path: &str) -> Document {
        let changelog: Changelog = serde_json::from_value(json!([{
            "version": 1, "date": "2024-03-01", "authors": ["Anna"],
            "verifiers": [], "description": "first"
        }]))
        .unwrap();
        Document {
            source: source.to_string(),
            output: "01-candidatura/interna/verbale.pdf".to_string(),
            group: "01-candidatura".to_string(),
            subgroup: Some("interna".to_string()),
            metadata_path: metadata_path.to_string(),
            metadata: Map::new(),
            changelog,
            subfiles: BTreeSet::new(),
            latest_version: 1,
            last_modified_date: "2024-03-01".to_string(),
        }
    }

    fn args(command: &Command) -> Vec<String> {
        command
            .get_args()
            .map(|a: &OsStr| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_meta_path_relative_to_source_dir() {
        let d = doc("docs/a/verbale/verbale.typ", "docs/a/verbale/verbale.meta.yaml");
        assert_eq!(meta_path_input(&d), "verbale.meta.yaml");

        let top = doc("verbale.typ", "verbale.changelog.yaml");
        assert_eq!(meta_path_input(&top), "verbale.changelog.yaml");

        let elsewhere = doc("docs/a/verbale.typ", "meta/verbale.yaml");
        assert_eq!(meta_path_input(&elsewhere), "/meta/verbale.yaml");
    }

    #[test]
    fn test_command_arguments() {
        let config = RenderConfig {
            compiler: "typst".to_string(),
            font_path: Some(PathBuf::from("fonts")),
            output_dir: PathBuf::from("dist/docs"),
        };
        let renderer = Renderer::new(&config, "repo");
        let d = doc("docs/a/verbale/verbale.typ", "docs/a/verbale/verbale.meta.yaml");
        let command = renderer.command(&d);

        assert_eq!(command.get_program(), "typst");
        let expected: Vec<String> = vec![
            "compile".into(),
            Path::new("repo").join("docs/a/verbale/verbale.typ").to_string_lossy().into_owned(),
            Path::new("dist/docs")
                .join("01-candidatura/interna/verbale.pdf")
                .to_string_lossy()
                .into_owned(),
            "--input".into(),
            "meta_path=verbale.meta.yaml".into(),
            "--root".into(),
            "repo".into(),
            "--ignore-system-fonts".into(),
            "--font-path".into(),
            "fonts".into(),
        ];
        assert_eq!(args(&command), expected);
    }

    #[test]
    fn test_no_font_flags_without_font_path() {
        let renderer = Renderer::new(&RenderConfig::default(), ".");
        let command = renderer.command(&doc("a/b.typ", "a/b.meta.yaml"));
        assert!(!args(&command).iter().any(|a| a == "--ignore-system-fonts"));
    }

    #[test]
    fn test_missing_compiler_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let config = RenderConfig {
            compiler: "definitely-not-a-real-compiler-binary".to_string(),
            font_path: None,
            output_dir: tmp.path().join("out"),
        };
        let renderer = Renderer::new(&config, tmp.path());
        let model = Model::from_documents(vec![doc("a/b.typ", "a/b.meta.yaml")]).unwrap();
        assert!(matches!(
            renderer.render_all(&model),
            Err(CorpusError::CompilerNotFound(_))
        ));
        assert!(tmp.path().join("out/01-candidatura/interna").is_dir());
    }
}

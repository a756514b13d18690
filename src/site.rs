//! Static site generation
//!
//! Copies the site's assets to the output directory and fills
//! `index.template.html` with one link list per document group. A group list
//! is spliced in at the marker `<!--KEY_LIST_MARKER-->`, where `KEY` is the
//! group name without its numeric prefix, upper-cased, with `-` as `_`
//! (`01-candidatura` -> `CANDIDATURA`).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use maud::{html, Markup};
use regex::Regex;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::SiteConfig;
use crate::document::{Document, Model};
use crate::error::{CorpusError, Result};

pub const TEMPLATE_NAME: &str = "index.template.html";
pub const INDEX_NAME: &str = "index.html";
const TEMPLATE_SUFFIX: &str = ".template.html";
const EMPTY_LIST: &str = r##"<a href="#">Nessun documento</a>"##;

/// Marker key for a group label
pub fn group_key(group: &str) -> String {
    let stripped = group
        .split_once('-')
        .filter(|(prefix, _)| !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()))
        .map(|(_, rest)| rest)
        .unwrap_or(group);
    stripped.to_uppercase().replace('-', "_")
}

pub fn marker(key: &str) -> String {
    format!("<!--{}_LIST_MARKER-->", key)
}

fn link(doc: &Document, docs_folder: &str) -> Markup {
    let href = format!("{}/{}", docs_folder.trim_end_matches('/'), doc.output);
    html! {
        a href=(href) target="_blank" { (doc.title()) " (v" (doc.latest_version) ")" }
    }
}

/// Link lists keyed by group marker key, newest document first
pub fn group_links(model: &Model, docs_folder: &str) -> BTreeMap<String, Vec<String>> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for doc in model.sorted_by_last_modified() {
        groups
            .entry(group_key(&doc.group))
            .or_default()
            .push(link(doc, docs_folder).into_string());
    }
    groups
}

/// Replace group markers in a template; markers with no documents get a placeholder
pub fn populate(template: &str, links: &BTreeMap<String, Vec<String>>) -> Result<String> {
    let mut html = template.to_string();
    for (key, list) in links {
        let marker = marker(key);
        if !html.contains(&marker) {
            debug!("Template has no marker for group {}", key);
            continue;
        }
        html = html.replace(&marker, &list.join("\n"));
    }

    let leftover = Regex::new(r"<!--[A-Z0-9_]+_LIST_MARKER-->")?;
    Ok(leftover.replace_all(&html, EMPTY_LIST).into_owned())
}

/// Writes the site for a model
#[derive(Debug, Clone)]
pub struct SiteGenerator {
    site_dir: PathBuf,
    output_dir: PathBuf,
    docs_folder: String,
}

impl SiteGenerator {
    pub fn new(config: &SiteConfig) -> Self {
        Self {
            site_dir: config.site_dir.clone(),
            output_dir: config.output_dir.clone(),
            docs_folder: config.docs_folder.clone(),
        }
    }

    /// Copy assets and write `index.html`; returns the index path.
    pub fn generate(&self, model: &Model) -> Result<PathBuf> {
        let template_path = self.site_dir.join(TEMPLATE_NAME);
        if !template_path.is_file() {
            return Err(CorpusError::TemplateNotFound(template_path.display().to_string()));
        }

        fs::create_dir_all(&self.output_dir)?;
        self.copy_assets()?;

        info!("Populating template '{}'...", template_path.display());
        let template = fs::read_to_string(&template_path)?;
        let html = populate(&template, &group_links(model, &self.docs_folder))?;

        let index = self.output_dir.join(INDEX_NAME);
        fs::write(&index, html)?;
        info!("Generated site index at '{}'", index.display());
        Ok(index)
    }

    fn copy_assets(&self) -> Result<()> {
        info!(
            "Copying static assets from '{}' to '{}'...",
            self.site_dir.display(),
            self.output_dir.display()
        );
        for entry in WalkDir::new(&self.site_dir).min_depth(1).sort_by_file_name() {
            let entry = entry?;
            let rel = entry
                .path()
                .strip_prefix(&self.site_dir)
                .unwrap_or(entry.path());
            let dest = self.output_dir.join(rel);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&dest)?;
            } else if !is_template(entry.path()) {
                debug!("Copying {}", rel.display());
                fs::copy(entry.path(), &dest)?;
            }
        }
        Ok(())
    }
}

fn is_template(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with(TEMPLATE_SUFFIX))
        .unwrap_or(false)
}

//! Corpus Site CLI
//!
//! Generates the static site linking every compiled document.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use doc_corpus::{CorpusConfig, CorpusError, ModelSnapshot, SiteGenerator};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "corpus-site")]
#[command(about = "Generate the static site with document links")]
struct Cli {
    /// Repository root the corpus paths are relative to
    #[arg(short, long, default_value = ".")]
    repo: PathBuf,

    /// Extra configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Use a model snapshot instead of discovering the working tree
    #[arg(long)]
    model: Option<PathBuf>,

    /// Source directory of the website
    #[arg(long)]
    site_dir: Option<PathBuf>,

    /// Output directory for the final website
    #[arg(long)]
    outdir: Option<PathBuf>,

    /// Subfolder of the site holding compiled documents
    #[arg(long)]
    docs_folder: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        print_violations(&e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = CorpusConfig::load_from(cli.config.as_deref()).context("Failed to load configuration")?;

    let model = match &cli.model {
        Some(path) => ModelSnapshot::read(path)
            .with_context(|| format!("Failed to load snapshot {}", path.display()))?
            .into_model()?,
        None => doc_corpus::discover_local(&config, &cli.repo)?,
    };

    let mut site = config.site.clone();
    if let Some(dir) = cli.site_dir {
        site.site_dir = dir;
    }
    if let Some(dir) = cli.outdir {
        site.output_dir = dir;
    }
    if let Some(folder) = cli.docs_folder {
        site.docs_folder = folder;
    }

    let index = SiteGenerator::new(&site).generate(&model)?;
    println!("✅ Site generated at {}", index.display());
    Ok(())
}

fn print_violations(err: &anyhow::Error) {
    let Some(violations) = err.downcast_ref::<CorpusError>().map(CorpusError::violations) else {
        return;
    };
    if violations.is_empty() {
        return;
    }
    eprintln!("❌ Document validation failed:");
    for violation in violations {
        eprintln!("   └─ {}", violation);
    }
}

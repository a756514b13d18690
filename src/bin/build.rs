//! Corpus Build CLI
//!
//! Compiles every document of the working tree.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use doc_corpus::{CorpusConfig, CorpusError, Renderer};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "corpus-build")]
#[command(about = "Compile all documents of the corpus")]
struct Cli {
    /// Repository root the corpus paths are relative to
    #[arg(short, long, default_value = ".")]
    repo: PathBuf,

    /// Extra configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Output directory for compiled documents (defaults to the configured one)
    #[arg(long)]
    outdir: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        print_violations(&e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = CorpusConfig::load_from(cli.config.as_deref()).context("Failed to load configuration")?;
    let model = doc_corpus::discover_local(&config, &cli.repo)?;
    if model.is_empty() {
        return Ok(());
    }

    let mut renderer = Renderer::new(&config.render, &cli.repo);
    if let Some(outdir) = cli.outdir {
        renderer = renderer.with_output_dir(outdir);
    }

    let summary = renderer.render_all(&model)?;
    println!("{} succeeded, {} failed", summary.succeeded, summary.failed);
    if !summary.is_success() {
        bail!("{} document(s) failed to compile", summary.failed);
    }
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

//! Corpus Model CLI
//!
//! Discovers the document model, snapshots it, and runs the version gate.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use doc_corpus::revision::{changed_paths, read_changed_paths};
use doc_corpus::{gate, CorpusConfig, CorpusError, GateReport, Model, ModelSnapshot};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "corpus-model")]
#[command(about = "Discover, snapshot and version-gate a document corpus")]
struct Cli {
    /// Repository root the corpus paths are relative to
    #[arg(short, long, default_value = ".")]
    repo: PathBuf,

    /// Extra configuration file
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover the model and write a snapshot
    Generate {
        /// Discover from this git revision instead of the working tree
        #[arg(long)]
        revision: Option<String>,
        /// Snapshot file
        #[arg(short, long, default_value = "documents.json")]
        output: PathBuf,
    },

    /// Run the version gate over two snapshots
    Compare {
        #[arg(long)]
        before: PathBuf,
        #[arg(long)]
        after: PathBuf,
        /// Newline-delimited list of changed paths
        #[arg(long)]
        changed: PathBuf,
    },

    /// Validate the working tree and print a summary
    Check,

    /// Run the version gate between two git revisions
    Gate {
        /// Base revision (defaults to the configured one)
        #[arg(long)]
        base: Option<String>,
        /// Head revision (defaults to the configured one)
        #[arg(long)]
        head: Option<String>,
        /// Read changed paths from a file instead of diffing the revisions
        #[arg(long)]
        changed: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    Config,
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

    match cli.command {
        Commands::Generate { revision, output } => {
            let model = match &revision {
                Some(rev) => doc_corpus::discover_revision(&config, &cli.repo, rev)?,
                None => doc_corpus::discover_local(&config, &cli.repo)?,
            };
            let snapshot = ModelSnapshot::from_model(&model, revision.as_deref())?;
            snapshot.write(&output)?;
            info!("Wrote {} documents to {}", model.len(), output.display());
            Ok(())
        }

        Commands::Compare { before, after, changed } => {
            let before = load_snapshot(&before)?;
            let after = load_snapshot(&after)?;
            let changed = read_changed_paths(&changed)
                .with_context(|| format!("Failed to read changed paths from {}", changed.display()))?;
            run_gate(&before, &after, &changed)
        }

        Commands::Check => {
            let model = doc_corpus::discover_local(&config, &cli.repo)?;
            println!("✅ {} documents valid", model.len());
            for doc in model.sorted_by_source() {
                println!("  {} v{} ({})", doc.source, doc.latest_version, doc.last_modified_date);
            }
            Ok(())
        }

        Commands::Gate { base, head, changed } => {
            let base = base.unwrap_or(config.gate.base.clone());
            let head = head.unwrap_or(config.gate.head.clone());
            info!("Gating {} -> {}", base, head);

            let before = doc_corpus::discover_revision(&config, &cli.repo, &base)
                .with_context(|| format!("Failed to build the model of base revision '{}'", base))?;
            let after = doc_corpus::discover_revision(&config, &cli.repo, &head)
                .with_context(|| format!("Failed to build the model of head revision '{}'", head))?;
            let changed = match changed {
                Some(path) => read_changed_paths(&path)?,
                None => changed_paths(&cli.repo, &base, &head)?,
            };
            run_gate(&before, &after, &changed)
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn load_snapshot(path: &Path) -> anyhow::Result<Model> {
    let snapshot = ModelSnapshot::read(path)
        .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
    Ok(snapshot.into_model()?)
}

fn run_gate(before: &Model, after: &Model, changed: &BTreeSet<String>) -> anyhow::Result<()> {
    let report = gate::compare(before, after, changed);
    print_report(&report);
    if !report.is_accepted() {
        bail!("Version gate failed with {} violation(s)", report.violations.len());
    }
    Ok(())
}

fn print_report(report: &GateReport) {
    println!(
        "🔍 {} added, {} removed, {} modified, {} unchanged",
        report.added.len(),
        report.removed.len(),
        report.modified.len(),
        report.unchanged.len()
    );
    if report.is_accepted() {
        println!("✅ Version checks passed");
        return;
    }
    println!("❌ Version check failed:");
    for violation in &report.violations {
        println!("   └─ {}", violation);
    }
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

//! Version Gate Tests
//!
//! Builds git histories on the fly and gates one revision against another.

mod common;

use std::collections::BTreeSet;

use common::Corpus;
use doc_corpus::revision::{changed_paths, read_changed_paths};
use doc_corpus::source::{ContentSource, DirectoryTree};
use doc_corpus::{
    discover_local, discover_revision, gate, CorpusConfig, CorpusError, GateViolation, Model, ModelSnapshot,
    RevisionSource, Strategy, Violation,
};

const INTERNA: &str = "docs/01-candidatura/interna";

fn gate_between(corpus: &Corpus, base: &str, head: &str) -> gate::GateReport {
    let config = CorpusConfig::default();
    let before = discover_revision(&config, corpus.path(), base).unwrap();
    let after = discover_revision(&config, corpus.path(), head).unwrap();
    let changed = changed_paths(corpus.path(), base, head).unwrap();
    gate::compare(&before, &after, &changed)
}

fn base_corpus() -> (Corpus, String) {
    let corpus = Corpus::new();
    corpus.init_git();
    corpus.write_doc(INTERNA, "verbale", "Verbale", 1);
    corpus.write_doc(INTERNA, "norme", "Norme", 3);
    corpus.write(&format!("{}/norme/sezioni/intro.typ", INTERNA), "intro");
    let base = corpus.commit("initial").to_string();
    (corpus, base)
}

// =============================================================================
// Revision source
// =============================================================================

#[test]
fn test_revision_source_reads_committed_content() {
    let (corpus, base) = base_corpus();
    corpus.write(&format!("{}/verbale/verbale.typ", INTERNA), "= Edited");
    corpus.write("docs/untracked.txt", "local only");

    let source = RevisionSource::open(corpus.path(), &base).unwrap();
    assert_eq!(
        source.get(&format!("{}/verbale/verbale.typ", INTERNA)).unwrap().as_deref(),
        Some("= Verbale\n")
    );
    assert!(source.get("docs/untracked.txt").unwrap().is_none());
    assert!(source.is_file(&format!("{}/norme/norme.meta.yaml", INTERNA)).unwrap());
    assert!(!source.is_file(INTERNA).unwrap());

    let names: Vec<String> = source
        .list_dir(INTERNA)
        .unwrap()
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["norme", "verbale"]);

    let typ = source
        .files_with_extension(&format!("{}/norme", INTERNA), "typ")
        .unwrap();
    assert_eq!(
        typ,
        vec![
            format!("{}/norme/norme.typ", INTERNA),
            format!("{}/norme/sezioni/intro.typ", INTERNA),
        ]
    );
}

#[test]
fn test_unknown_revision_rejected() {
    let (corpus, _) = base_corpus();
    assert!(matches!(
        RevisionSource::open(corpus.path(), "no-such-branch"),
        Err(CorpusError::RevisionNotFound(_))
    ));
}

#[test]
fn test_revision_model_matches_working_tree() {
    let (corpus, base) = base_corpus();
    let config = CorpusConfig::default();
    let local = discover_local(&config, corpus.path()).unwrap();
    let pinned = discover_revision(&config, corpus.path(), &base).unwrap();
    assert!(local.same_documents(&pinned));
}

#[test]
fn test_manifest_discovery_at_revision() {
    let corpus = Corpus::new();
    corpus.init_git();
    corpus.write(
        "documents.yaml",
        "- {title: Guida, source: guida.typ, output: guida.pdf, group: g}\n\
         - {title: Norme, source: src/interni/norme.typ, output: norme.pdf, group: g}\n",
    );
    corpus.write("guida.typ", "= Guida");
    corpus.write("guida.changelog.yaml", "- {version: 1, date: 2024-01-01, authors: [Anna], verifiers: [], description: prima}\n");
    corpus.write("src/interni/norme.typ", "= Norme");
    corpus.write("src/interni/glossario.typ", "= Glossario");
    corpus.write(
        "src/interni/norme.changelog.yaml",
        "changelog:\n  - {version: 1, date: 2024-01-01, authors: [Anna], verifiers: [], description: prima}\n",
    );
    corpus.write("assets/logo.svg", "<svg/>");
    let head = corpus.commit("manifest corpus").to_string();
    corpus.write("src/interni/bozza.typ", "uncommitted");

    let mut config = CorpusConfig::default();
    config.corpus.strategy = Strategy::Manifest;
    let model = discover_revision(&config, corpus.path(), &head).unwrap();
    assert_eq!(model.len(), 2);

    let norme = model.get("src/interni/norme.typ").unwrap();
    assert_eq!(
        norme.subfiles.iter().collect::<Vec<_>>(),
        vec!["src/interni/glossario.typ"]
    );

    // A top-level source owns every other content file in the tree
    let guida = model.get("guida.typ").unwrap();
    assert_eq!(
        guida.subfiles.iter().collect::<Vec<_>>(),
        vec!["src/interni/glossario.typ", "src/interni/norme.typ"]
    );
}

// =============================================================================
// Gate over git history
// =============================================================================

#[test]
fn test_correct_history_accepted() {
    let (corpus, base) = base_corpus();
    corpus.write_doc(INTERNA, "verbale", "Verbale", 2);
    corpus.write(&format!("{}/verbale/verbale.typ", INTERNA), "= Verbale, rivisto\n");
    corpus.write_doc("docs/11-rtb/esterna", "lettera", "Lettera", 1);
    let head = corpus.commit("revise verbale, add lettera").to_string();

    let report = gate_between(&corpus, &base, &head);
    assert!(report.is_accepted(), "{:?}", report.violations);
    assert_eq!(report.added, vec!["docs/11-rtb/esterna/lettera/lettera.typ"]);
    assert_eq!(report.modified, vec![format!("{}/verbale/verbale.typ", INTERNA)]);
    assert_eq!(report.unchanged, vec![format!("{}/norme/norme.typ", INTERNA)]);
}

#[test]
fn test_subfile_change_without_bump_rejected() {
    let (corpus, base) = base_corpus();
    corpus.write(&format!("{}/norme/sezioni/intro.typ", INTERNA), "intro, riscritta");
    let head = corpus.commit("edit intro").to_string();

    let report = gate_between(&corpus, &base, &head);
    assert_eq!(
        report.violations,
        vec![GateViolation::InvalidIncrement {
            document: format!("Norme ({}/norme/norme.typ)", INTERNA),
            before: 3,
            after: 3,
        }]
    );
}

#[test]
fn test_metadata_only_bump_rejected() {
    let (corpus, base) = base_corpus();
    corpus.write(
        &format!("{}/verbale/verbale.meta.yaml", INTERNA),
        &common::meta_yaml("Verbale", &[2, 1]),
    );
    let head = corpus.commit("bump without change").to_string();

    let report = gate_between(&corpus, &base, &head);
    assert!(matches!(
        report.violations.as_slice(),
        [GateViolation::BumpWithoutChange { before: 1, after: 2, .. }]
    ));
}

#[test]
fn test_removed_document_reported() {
    let (corpus, base) = base_corpus();
    corpus.remove(&format!("{}/verbale/verbale.typ", INTERNA));
    corpus.remove(&format!("{}/verbale/verbale.meta.yaml", INTERNA));
    let head = corpus.commit("drop verbale").to_string();

    let changed = changed_paths(corpus.path(), &base, &head).unwrap();
    assert!(changed.contains(&format!("{}/verbale/verbale.typ", INTERNA)));

    let report = gate_between(&corpus, &base, &head);
    assert!(report.is_accepted());
    assert_eq!(report.removed, vec![format!("{}/verbale/verbale.typ", INTERNA)]);
}

#[test]
fn test_invalid_head_model_is_error() {
    let (corpus, _) = base_corpus();
    corpus.write_doc_versions(INTERNA, "verbale", "Verbale", &[3, 1]);
    let head = corpus.commit("broken changelog").to_string();

    assert!(matches!(
        discover_revision(&CorpusConfig::default(), corpus.path(), &head),
        Err(CorpusError::Discovery(_))
    ));
}

// =============================================================================
// Gate over snapshots
// =============================================================================

#[test]
fn test_compare_snapshots_with_changed_list() {
    let (corpus, base) = base_corpus();
    let config = CorpusConfig::default();
    let before = discover_revision(&config, corpus.path(), &base).unwrap();
    ModelSnapshot::from_model(&before, Some(&base))
        .unwrap()
        .write(corpus.join("out/before.json"))
        .unwrap();

    corpus.write_doc_versions(INTERNA, "verbale", "Verbale", &[3, 2, 1]);
    corpus.write(&format!("{}/verbale/verbale.typ", INTERNA), "= Nuovo\n");
    let after = discover_local(&config, corpus.path()).unwrap();
    ModelSnapshot::from_model(&after, None)
        .unwrap()
        .write(corpus.join("out/after.json"))
        .unwrap();

    corpus.write(
        "out/changed.txt",
        &format!("{}/verbale/verbale.typ\n\n{}/verbale/verbale.meta.yaml\n", INTERNA, INTERNA),
    );

    let before = ModelSnapshot::read(corpus.join("out/before.json")).unwrap().into_model().unwrap();
    let after = ModelSnapshot::read(corpus.join("out/after.json")).unwrap().into_model().unwrap();
    let changed = read_changed_paths(corpus.join("out/changed.txt")).unwrap();
    assert_eq!(changed.len(), 2);

    let report = gate::compare(&before, &after, &changed);
    assert!(matches!(
        report.violations.as_slice(),
        [GateViolation::InvalidIncrement { before: 1, after: 3, .. }]
    ));

    let none: BTreeSet<String> = BTreeSet::new();
    let report = gate::compare(&before, &after, &none);
    assert!(matches!(
        report.violations.as_slice(),
        [GateViolation::BumpWithoutChange { .. }]
    ));
}

#[test]
fn test_gate_at_version_limit_reports_violation() {
    let (corpus, base) = base_corpus();
    let config = CorpusConfig::default();
    let at_limit = |model: Model| {
        let documents = model
            .into_documents()
            .into_iter()
            .map(|mut doc| {
                doc.latest_version = u32::MAX;
                doc
            })
            .collect();
        Model::from_documents(documents).unwrap()
    };

    let before = at_limit(discover_revision(&config, corpus.path(), &base).unwrap());
    corpus.write(&format!("{}/verbale/verbale.typ", INTERNA), "= Verbale, rivisto\n");
    let head = corpus.commit("edit verbale").to_string();
    let after = at_limit(discover_revision(&config, corpus.path(), &head).unwrap());
    let changed = changed_paths(corpus.path(), &base, &head).unwrap();

    let report = gate::compare(&before, &after, &changed);
    assert_eq!(report.unchanged, vec![format!("{}/norme/norme.typ", INTERNA)]);
    match report.violations.as_slice() {
        [violation @ GateViolation::InvalidIncrement { before, after, .. }] => {
            assert_eq!((*before, *after), (u32::MAX, u32::MAX));
            assert!(violation.to_string().contains("version limit reached"));
        }
        other => panic!("Expected one InvalidIncrement, got {:?}", other),
    }
}

#[test]
fn test_inconsistent_snapshot_rejected_before_gating() {
    let (corpus, base) = base_corpus();
    let model = discover_revision(&CorpusConfig::default(), corpus.path(), &base).unwrap();
    let documents = model
        .into_documents()
        .into_iter()
        .map(|mut doc| {
            if doc.title() == "Norme" {
                doc.latest_version = 9;
            }
            doc
        })
        .collect();
    let edited = Model::from_documents(documents).unwrap();

    // The digest is recomputed, so only the changelog check can catch it
    let path = corpus.join("out/edited.json");
    ModelSnapshot::from_model(&edited, Some(&base)).unwrap().write(&path).unwrap();
    let snapshot = ModelSnapshot::read(&path).unwrap();

    match snapshot.into_model() {
        Err(CorpusError::Discovery(violations)) => {
            assert_eq!(violations.len(), 1);
            assert!(matches!(violations[0], Violation::ChangelogEntry { .. }));
            assert!(violations[0]
                .to_string()
                .contains("latest_version 9 does not match newest changelog version 3"));
        }
        other => panic!("Expected snapshot rejection, got {:?}", other),
    }
}

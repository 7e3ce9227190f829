//! One ingestion run: fetch, validate, index and persist a new snapshot.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use appsearch_core::data_processor::DataProcessor;
use appsearch_core::document::InputDocument;
use appsearch_core::error::{Error, Result};
use appsearch_core::traits::{Embedder, FulltextEngine, SemanticEngine, SemanticOptions};
use appsearch_core::types::{ApplicationFileLocator, ApplicationSummary, SummaryMap};

use crate::run_blocking;
use crate::snapshot::{write_atomic, SnapshotDir};
use crate::source::DataSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub version: String,
    pub path: PathBuf,
    pub documents: usize,
    /// Records dropped by the status filter.
    pub skipped: usize,
    pub invalid: usize,
    pub duplicates: usize,
}

/// Validated documents of one run, first occurrence of each ref kept.
#[derive(Debug, Default)]
pub struct Collected {
    pub documents: Vec<InputDocument>,
    pub summaries: SummaryMap,
    pub skipped: usize,
    pub invalid: usize,
    pub duplicates: usize,
}

pub async fn collect<D: DataSource>(source: &D, locators: &[ApplicationFileLocator], processor: &DataProcessor) -> Result<Collected> {
    let mut batches = Vec::with_capacity(locators.len());
    for locator in locators {
        batches.push(source.fetch_applications(locator).await?);
    }
    let round_names = fetch_round_names(source, locators).await;

    let mut out = Collected::default();
    let mut seen = HashSet::new();
    for (locator, records) in locators.iter().zip(batches) {
        let round = processor.process_records(locator.chain_id, &locator.round_id, &records);
        out.skipped += round.skipped;
        out.invalid += round.invalid.len();
        for doc in round.documents {
            if !seen.insert(doc.application_ref.clone()) {
                warn!(application_ref = %doc.application_ref, "duplicate application ref, keeping first record");
                out.duplicates += 1;
                continue;
            }
            let name = round_names.get(&(doc.chain_id, doc.round_id.to_lowercase())).cloned();
            out.summaries.insert(doc.application_ref.clone(), ApplicationSummary::from_document(&doc, name));
            out.documents.push(doc);
        }
    }
    Ok(out)
}

/// Round names are decoration; a chain whose round list can't be fetched
/// just yields unnamed summaries.
async fn fetch_round_names<D: DataSource>(source: &D, locators: &[ApplicationFileLocator]) -> HashMap<(u64, String), String> {
    let chains: BTreeSet<u64> = locators.iter().map(|l| l.chain_id).collect();
    let mut names = HashMap::new();
    for chain_id in chains {
        match source.fetch_rounds(chain_id).await {
            Ok(rounds) => {
                for round in rounds {
                    if let Some(name) = round.name {
                        names.insert((round.chain_id, round.round_id.to_lowercase()), name);
                    }
                }
            }
            Err(e) => warn!(chain_id, error = %e, "failed to fetch round names"),
        }
    }
    names
}

fn create_target(target: &SnapshotDir) -> Result<()> {
    if let Some(root) = target.path.parent() {
        fs::create_dir_all(root)?;
    }
    fs::create_dir(&target.path).map_err(|e| match e.kind() {
        ErrorKind::AlreadyExists => Error::ReindexNotSupported(target.path.clone()),
        _ => Error::Io(e),
    })
}

/// Build both indices and write them with the corpus into `target`.
/// `target` must not exist. Summaries are written last.
pub async fn run_ingestion<F, S, D>(
    source: &D,
    locators: &[ApplicationFileLocator],
    target: &SnapshotDir,
    processor: &DataProcessor,
    embedder: Arc<dyn Embedder>,
    semantic: &SemanticOptions,
) -> Result<IngestReport>
where
    F: FulltextEngine,
    S: SemanticEngine,
    D: DataSource,
{
    if target.path.exists() {
        return Err(Error::ReindexNotSupported(target.path.clone()));
    }
    let started = Instant::now();
    let collected = collect(source, locators, processor).await?;
    info!(
        version = %target.version,
        locators = locators.len(),
        documents = collected.documents.len(),
        invalid = collected.invalid,
        duplicates = collected.duplicates,
        "fetched applications"
    );

    create_target(target)?;
    write_atomic(&target.documents_path(), &serde_json::to_vec(&collected.documents)?)?;

    let documents = collected.documents;
    let corpus = documents.clone();
    let fulltext = run_blocking(move || F::build(&corpus)?.serialize()).await?;
    write_atomic(&target.fulltext_path(), &fulltext)?;
    debug!(version = %target.version, bytes = fulltext.len(), "wrote fulltext index");

    build_semantic::<S>(&documents, embedder, semantic, &target.semantic_path()).await?;

    write_atomic(&target.summaries_path(), &serde_json::to_vec(&collected.summaries)?)?;
    info!(version = %target.version, elapsed_ms = started.elapsed().as_millis() as u64, "snapshot complete");

    Ok(IngestReport {
        version: target.version.clone(),
        path: target.path.clone(),
        documents: documents.len(),
        skipped: collected.skipped,
        invalid: collected.invalid,
        duplicates: collected.duplicates,
    })
}

pub(crate) async fn build_semantic<S: SemanticEngine>(
    documents: &[InputDocument],
    embedder: Arc<dyn Embedder>,
    options: &SemanticOptions,
    location: &Path,
) -> Result<S> {
    Ok(S::build(documents, embedder, options, Some(location)).await?)
}

//! The live dataset.
//!
//! Queries clone the current `Arc<Snapshot>` under a short read lock and never
//! wait on a refresh. A reload builds the next snapshot off to the side and
//! publishes it with a single assignment; a failed reload leaves the live one
//! in place.

use parking_lot::RwLock;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use appsearch_core::config::Settings;
use appsearch_core::data_processor::{DataProcessor, FieldMapping};
use appsearch_core::document::InputDocument;
use appsearch_core::error::{Error, Result};
use appsearch_core::query::{QueryDefaults, SearchQuery};
use appsearch_core::traits::{Embedder, FulltextEngine, SemanticEngine, SemanticOptions};
use appsearch_core::types::{ApplicationFileLocator, ApplicationSummary, SearchEngineResult, SearchType, SummaryMap};
use appsearch_hybrid::HybridSearchEngine;

use crate::ingest::{build_semantic, run_ingestion, IngestReport};
use crate::run_blocking;
use crate::snapshot::{self, write_atomic, SnapshotDir};
use crate::source::DataSource;

/// What a reload after the first one replaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReloadPolicy {
    /// Swap the summary map, keep the engines loaded at first reload.
    #[default]
    SummariesOnly,
    /// Swap summaries and engines together.
    FullSnapshot,
}

#[derive(Debug, Clone)]
pub struct DatasetConfig {
    pub storage_root: PathBuf,
    pub field_mapping: FieldMapping,
    pub semantic: SemanticOptions,
    pub query_defaults: QueryDefaults,
    /// Cap applied by [`Dataset::search_with_summaries`].
    pub max_results: usize,
    pub snapshots_to_keep: usize,
    pub reload_policy: ReloadPolicy,
}

impl DatasetConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            storage_root: settings.storage_root(),
            field_mapping: settings.field_mapping.clone(),
            semantic: settings.semantic_options(),
            query_defaults: settings.search,
            max_results: settings.max_results_per_search_strategy,
            snapshots_to_keep: settings.snapshots_to_keep,
            reload_policy: if settings.reload_indices { ReloadPolicy::FullSnapshot } else { ReloadPolicy::SummariesOnly },
        }
    }
}

pub struct Snapshot<F, S> where F: FulltextEngine, S: SemanticEngine {
    pub version: String,
    /// Snapshot the engines were loaded from. Trails `version` under
    /// [`ReloadPolicy::SummariesOnly`].
    pub engine_version: String,
    pub summaries: SummaryMap,
    pub engine: HybridSearchEngine<F, S>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetState {
    Uninitialized,
    Loaded { version: String },
    Refreshing { version: Option<String> },
}

/// A search result joined with its summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    #[serde(flatten)]
    pub summary: ApplicationSummary,
    pub score: f32,
    pub search_type: SearchType,
}

const RELOADING: u8 = 1;
const INGESTING: u8 = 1 << 1;

/// Holds one activity bit set until dropped.
struct Activity<'a> {
    flags: &'a AtomicU8,
    bit: u8,
}

impl<'a> Activity<'a> {
    fn enter(flags: &'a AtomicU8, bit: u8) -> Self {
        flags.fetch_or(bit, Ordering::AcqRel);
        Self { flags, bit }
    }
}

impl Drop for Activity<'_> {
    fn drop(&mut self) { self.flags.fetch_and(!self.bit, Ordering::AcqRel); }
}

pub struct Dataset<F, S> where F: FulltextEngine, S: SemanticEngine {
    config: DatasetConfig,
    processor: DataProcessor,
    embedder: Arc<dyn Embedder>,
    current: RwLock<Option<Arc<Snapshot<F, S>>>>,
    reload_guard: Mutex<()>,
    ingest_guard: Mutex<()>,
    activity: AtomicU8,
}

impl<F, S> Dataset<F, S> where F: FulltextEngine, S: SemanticEngine {
    pub fn new(config: DatasetConfig, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            processor: DataProcessor::new(config.field_mapping.clone()),
            config,
            embedder,
            current: RwLock::new(None),
            reload_guard: Mutex::new(()),
            ingest_guard: Mutex::new(()),
            activity: AtomicU8::new(0),
        }
    }

    pub fn from_settings(settings: &Settings, embedder: Arc<dyn Embedder>) -> Self { Self::new(DatasetConfig::from_settings(settings), embedder) }

    pub fn config(&self) -> &DatasetConfig { &self.config }

    pub fn current(&self) -> Option<Arc<Snapshot<F, S>>> { self.current.read().clone() }

    pub fn state(&self) -> DatasetState {
        let version = self.current().map(|s| s.version.clone());
        let busy = self.activity.load(Ordering::Acquire) != 0;
        match (busy, version) {
            (true, version) => DatasetState::Refreshing { version },
            (false, Some(version)) => DatasetState::Loaded { version },
            (false, None) => DatasetState::Uninitialized,
        }
    }

    fn loaded(&self) -> Result<Arc<Snapshot<F, S>>> {
        self.current().ok_or_else(|| Error::NotFound("dataset has not been loaded yet".into()))
    }

    pub fn parse_query(&self, query: &str) -> Result<SearchQuery> { SearchQuery::parse_with_defaults(query, &self.config.query_defaults) }

    /// Queries without keywords return no results.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchEngineResult>> {
        let query = self.parse_query(query)?;
        if !query.is_valid() {
            return Ok(Vec::new());
        }
        let snapshot = self.loaded()?;
        Ok(snapshot.engine.search(&query).await?)
    }

    /// Results joined with their summaries, at most `max_results` of them.
    /// Refs the live summary map doesn't know are logged and dropped.
    pub async fn search_with_summaries(&self, query: &str) -> Result<Vec<SearchHit>> {
        let query = self.parse_query(query)?;
        if !query.is_valid() {
            return Ok(Vec::new());
        }
        let snapshot = self.loaded()?;
        let results = snapshot.engine.search(&query).await?;
        let hits = results
            .into_iter()
            .filter_map(|result| match snapshot.summaries.get(&result.application_ref) {
                Some(summary) => Some(SearchHit { summary: summary.clone(), score: result.score, search_type: result.search_type }),
                None => {
                    warn!(application_ref = %result.application_ref, version = %snapshot.version, "search result has no summary");
                    None
                }
            })
            .take(self.config.max_results)
            .collect();
        Ok(hits)
    }

    pub fn get_summary(&self, application_ref: &str) -> Result<ApplicationSummary> {
        self.loaded()?
            .summaries
            .get(application_ref)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("no application {application_ref}")))
    }

    /// Empty until the first successful reload.
    pub fn list_summaries(&self) -> Vec<ApplicationSummary> {
        self.current().map(|s| s.summaries.values().cloned().collect()).unwrap_or_default()
    }

    /// Publish the newest complete snapshot.
    ///
    /// Engines are reused from the live snapshot when the policy allows it and
    /// their snapshot directory is still complete on disk. Another process may
    /// have pruned it, in which case they are loaded from the new snapshot.
    pub async fn reload(&self) -> Result<String> {
        let _guard = self.reload_guard.try_lock().map_err(|_| Error::RefreshInProgress)?;
        let _active = Activity::enter(&self.activity, RELOADING);
        let root = &self.config.storage_root;
        let dir = snapshot::latest_complete(root)?
            .ok_or_else(|| Error::NotFound(format!("no complete snapshot under {}", root.display())))?;
        let summaries = dir.read_summaries()?;
        let live = self.current();

        if let Some(live) = &live {
            if summaries.is_empty() && !live.summaries.is_empty() {
                let reason = format!("snapshot {} has no applications while {} serves {}", dir.version, live.version, live.summaries.len());
                warn!(version = %dir.version, live = %live.version, "refusing to publish empty snapshot");
                return Err(Error::AnomalyDetected(reason));
            }
        }

        let reusable = live.as_ref().filter(|live| {
            live.engine_version == dir.version
                || (self.config.reload_policy == ReloadPolicy::SummariesOnly && self.engines_on_disk(live))
        });
        let (engine, engine_version) = match reusable {
            Some(live) => (live.engine.clone(), live.engine_version.clone()),
            None => (self.load_engines(&dir).await?, dir.version.clone()),
        };

        let count = summaries.len();
        let next = Arc::new(Snapshot { version: dir.version.clone(), engine_version, summaries, engine });
        *self.current.write() = Some(next);
        info!(version = %dir.version, applications = count, "dataset reloaded");
        Ok(dir.version)
    }

    fn engines_on_disk(&self, live: &Snapshot<F, S>) -> bool {
        let present = SnapshotDir::new(&self.config.storage_root, live.engine_version.as_str()).is_complete();
        if !present {
            warn!(engine_version = %live.engine_version, "snapshot backing the live engines is gone, loading engines again");
        }
        present
    }

    async fn load_engines(&self, dir: &SnapshotDir) -> Result<HybridSearchEngine<F, S>> {
        let fulltext = match fs::read(dir.fulltext_path()) {
            Ok(bytes) => run_blocking(move || F::deserialize(&bytes)).await,
            Err(e) => Err(Error::Io(e)),
        };
        let semantic: Result<S> = S::load(&dir.semantic_path(), self.embedder.clone(), &self.config.semantic).await.map_err(Error::from);

        let documents = if fulltext.is_err() || semantic.is_err() { dir.read_documents()? } else { Vec::new() };

        let fulltext = match fulltext {
            Ok(engine) => engine,
            Err(e) => {
                warn!(version = %dir.version, error = %e, "fulltext index unusable, rebuilding from corpus");
                self.rebuild_fulltext(dir, documents.clone()).await?
            }
        };
        let semantic = match semantic {
            Ok(engine) => engine,
            Err(e) => {
                warn!(version = %dir.version, error = %e, "semantic index unusable, rebuilding from corpus");
                self.rebuild_semantic(dir, &documents).await?
            }
        };
        debug!(version = %dir.version, documents = fulltext.num_documents(), "engines loaded");
        Ok(HybridSearchEngine::new(Arc::new(fulltext), Arc::new(semantic)))
    }

    async fn rebuild_fulltext(&self, dir: &SnapshotDir, documents: Vec<InputDocument>) -> Result<F> {
        let (engine, bytes) = run_blocking(move || {
            let engine = F::build(&documents)?;
            let bytes = engine.serialize()?;
            Ok((engine, bytes))
        })
        .await?;
        write_atomic(&dir.fulltext_path(), &bytes)?;
        Ok(engine)
    }

    async fn rebuild_semantic(&self, dir: &SnapshotDir, documents: &[InputDocument]) -> Result<S> {
        let location = dir.semantic_path();
        if location.exists() {
            fs::remove_dir_all(&location)?;
        }
        build_semantic::<S>(documents, self.embedder.clone(), &self.config.semantic, &location).await
    }

    /// Write a new snapshot without publishing it. Old snapshots are pruned
    /// first, never the ones backing the live state.
    pub async fn ingest_and_persist<D: DataSource>(&self, source: &D, locators: &[ApplicationFileLocator]) -> Result<IngestReport> {
        let _guard = self.ingest_guard.try_lock().map_err(|_| Error::RefreshInProgress)?;
        let _active = Activity::enter(&self.activity, INGESTING);
        let root = &self.config.storage_root;
        let live = self.current();
        let protected: Vec<&str> = live.iter().flat_map(|s| [s.version.as_str(), s.engine_version.as_str()]).collect();
        snapshot::prune(root, self.config.snapshots_to_keep, &protected)?;

        let target = SnapshotDir::new(root, snapshot::new_version());
        run_ingestion::<F, S, D>(source, locators, &target, &self.processor, self.embedder.clone(), &self.config.semantic).await
    }

    /// Ingest, then publish what was ingested.
    pub async fn refresh<D: DataSource>(&self, source: &D, locators: &[ApplicationFileLocator]) -> Result<String> {
        let report = self.ingest_and_persist(source, locators).await?;
        debug!(version = %report.version, documents = report.documents, "ingested, reloading");
        self.reload().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_follows_settings() {
        let mut settings = Settings::default();
        assert_eq!(DatasetConfig::from_settings(&settings).reload_policy, ReloadPolicy::SummariesOnly);

        settings.reload_indices = true;
        settings.semantic.use_cache = false;
        settings.storage_dir = "/srv/appsearch".into();
        let config = DatasetConfig::from_settings(&settings);
        assert_eq!(config.reload_policy, ReloadPolicy::FullSnapshot);
        assert_eq!(config.max_results, 25);
        assert_eq!(config.storage_root, PathBuf::from("/srv/appsearch"));
        assert!(config.semantic.cache_dir.is_none());
    }
}

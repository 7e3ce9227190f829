use crate::document::InputDocument;
use crate::types::SearchEngineResult;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Text to fixed-size vector. Implementations must be deterministic for a
/// given `id`.
pub trait Embedder: Send + Sync {
    /// Stable identity of the model and its settings; recorded next to every
    /// vector index built with it.
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Lexical engine. Built in memory, persisted as bytes.
pub trait FulltextEngine: Send + Sync + Sized + 'static {
    fn build(documents: &[InputDocument]) -> anyhow::Result<Self>;
    /// Every match, best first.
    fn search(&self, query: &str) -> anyhow::Result<Vec<SearchEngineResult>>;
    fn serialize(&self) -> anyhow::Result<Vec<u8>>;
    fn deserialize(bytes: &[u8]) -> anyhow::Result<Self>;
    fn num_documents(&self) -> usize;
}

#[derive(Debug, Clone)]
pub struct SemanticOptions {
    pub top_k: usize,
    pub batch_size: usize,
    /// Shared embedding cache location; `None` disables caching.
    pub cache_dir: Option<PathBuf>,
}

impl Default for SemanticOptions {
    fn default() -> Self { Self { top_k: 10, batch_size: 32, cache_dir: None } }
}

/// Similarity engine over document embeddings, persisted at a location.
pub trait SemanticEngine: Send + Sync + Sized + 'static {
    /// Without `persist_location` the index lives in scratch storage owned by
    /// the returned value.
    fn build(
        documents: &[InputDocument],
        embedder: Arc<dyn Embedder>,
        options: &SemanticOptions,
        persist_location: Option<&Path>,
    ) -> impl Future<Output = anyhow::Result<Self>> + Send;

    fn load(location: &Path, embedder: Arc<dyn Embedder>, options: &SemanticOptions) -> impl Future<Output = anyhow::Result<Self>> + Send;

    /// Top-k by similarity, restricted to `score > min_score` when given.
    fn search(&self, query: &str, min_score: Option<f32>) -> impl Future<Output = anyhow::Result<Vec<SearchEngineResult>>> + Send;
}

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;

use appsearch_core::query::{SearchQuery, SearchStrategy};
use appsearch_core::traits::{FulltextEngine, SemanticEngine};
use appsearch_core::types::SearchEngineResult;

pub mod fusion;

pub use fusion::combine;

/// Runs a parsed query against one or both engines per its strategy.
pub struct HybridSearchEngine<F, S> where F: FulltextEngine, S: SemanticEngine {
    fulltext: Arc<F>,
    semantic: Arc<S>,
}

impl<F, S> Clone for HybridSearchEngine<F, S> where F: FulltextEngine, S: SemanticEngine {
    fn clone(&self) -> Self { Self { fulltext: self.fulltext.clone(), semantic: self.semantic.clone() } }
}

impl<F, S> HybridSearchEngine<F, S> where F: FulltextEngine, S: SemanticEngine {
    pub fn new(fulltext: Arc<F>, semantic: Arc<S>) -> Self { Self { fulltext, semantic } }

    pub fn fulltext(&self) -> &Arc<F> { &self.fulltext }

    pub fn semantic(&self) -> &Arc<S> { &self.semantic }

    async fn fulltext_search(&self, text: &str) -> Result<Vec<SearchEngineResult>> {
        let engine = self.fulltext.clone();
        let text = text.to_string();
        tokio::task::spawn_blocking(move || engine.search(&text)).await.context("fulltext search task panicked")?
    }

    /// Invalid queries (no keywords) yield no results.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchEngineResult>> {
        if !query.is_valid() {
            return Ok(vec![]);
        }
        let params = query.params();
        let text = query.string();
        let results = match params.strategy {
            SearchStrategy::Fulltext => self.fulltext_search(&text).await?,
            SearchStrategy::Semantic => self.semantic.search(&text, Some(params.semantic_score_cutoff)).await?,
            SearchStrategy::Hybrid => {
                let fulltext = self.fulltext_search(&text).await?;
                let semantic = self.semantic.search(&text, None).await?;
                debug!(fulltext = fulltext.len(), semantic = semantic.len(), "fusing results");
                combine(&fulltext, &semantic, params.hybrid_fulltext_std_dev_factor, params.semantic_score_cutoff)
            }
        };
        debug!(query = query.raw(), strategy = %params.strategy, results = results.len(), "search complete");
        Ok(results)
    }
}

use std::path::Path;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail};
use appsearch_core::document::InputDocument;
use appsearch_core::query::SearchQuery;
use appsearch_core::traits::{Embedder, FulltextEngine, SemanticEngine, SemanticOptions};
use appsearch_core::types::SearchEngineResult;
use appsearch_hybrid::HybridSearchEngine;

/// Blocks its caller until the test releases it.
struct GatedFulltext { gate: Mutex<Receiver<()>> }

impl FulltextEngine for GatedFulltext {
    fn build(_: &[InputDocument]) -> anyhow::Result<Self> { bail!("constructed directly") }

    fn search(&self, _: &str) -> anyhow::Result<Vec<SearchEngineResult>> {
        let gate = self.gate.lock().map_err(|_| anyhow!("gate poisoned"))?;
        gate.recv_timeout(Duration::from_secs(5)).map_err(|_| anyhow!("search blocked the runtime"))?;
        Ok(vec![SearchEngineResult::fulltext("1:0xr:0", 1.0)])
    }

    fn serialize(&self) -> anyhow::Result<Vec<u8>> { Ok(Vec::new()) }
    fn deserialize(_: &[u8]) -> anyhow::Result<Self> { bail!("constructed directly") }
    fn num_documents(&self) -> usize { 1 }
}

struct NoSemantic;

impl SemanticEngine for NoSemantic {
    async fn build(_: &[InputDocument], _: Arc<dyn Embedder>, _: &SemanticOptions, _: Option<&Path>) -> anyhow::Result<Self> { Ok(NoSemantic) }
    async fn load(_: &Path, _: Arc<dyn Embedder>, _: &SemanticOptions) -> anyhow::Result<Self> { Ok(NoSemantic) }
    async fn search(&self, _: &str, _: Option<f32>) -> anyhow::Result<Vec<SearchEngineResult>> { Ok(Vec::new()) }
}

fn gated() -> (HybridSearchEngine<GatedFulltext, NoSemantic>, mpsc::Sender<()>) {
    let (release, gate) = mpsc::channel();
    (HybridSearchEngine::new(Arc::new(GatedFulltext { gate: Mutex::new(gate) }), Arc::new(NoSemantic)), release)
}

// Single-threaded runtime: the releasing task only runs if the fulltext
// search is off the executor thread.
#[tokio::test]
async fn fulltext_search_does_not_block_the_executor() {
    for query in ["forests --strategy=fulltext", "forests --strategy=hybrid"] {
        let (engine, release) = gated();
        let releaser = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            release.send(()).expect("release");
        });
        let results = engine.search(&SearchQuery::parse(query).expect("parse")).await.expect("search");
        assert_eq!(results.len(), 1, "{query}");
        assert_eq!(results[0].application_ref, "1:0xr:0");
        releaser.await.expect("releaser");
    }
}

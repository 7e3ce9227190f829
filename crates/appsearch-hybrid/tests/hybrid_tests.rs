use std::sync::Arc;

use appsearch_core::document::InputDocument;
use appsearch_core::query::SearchQuery;
use appsearch_core::traits::{Embedder, FulltextEngine, SemanticEngine, SemanticOptions};
use appsearch_core::types::SearchType;
use appsearch_embed::HashEmbedder;
use appsearch_hybrid::HybridSearchEngine;
use appsearch_text::TantivyIndex;
use appsearch_vector::LanceSemanticIndex;

fn doc(i: usize, name: &str, description: &str) -> InputDocument {
    InputDocument {
        application_ref: format!("1:0xr:{i}"),
        chain_id: 1,
        round_id: "0xr".into(),
        round_application_id: i.to_string(),
        project_id: None,
        name: name.to_string(),
        website_url: "https://example.org".into(),
        payout_wallet_address: "0xpayout".into(),
        banner_image_cid: None,
        logo_image_cid: None,
        description_markdown: description.to_string(),
        summary_text: description.to_string(),
    }
}

async fn engine() -> HybridSearchEngine<TantivyIndex, LanceSemanticIndex> {
    let docs = vec![
        doc(0, "Forest Keepers", "planting trees in forests"),
        doc(1, "Private Voting", "zero knowledge proofs for voting"),
        doc(2, "Water Wells", "clean water for villages"),
        doc(3, "Canopy", "tree canopy research and forests"),
    ];
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(256));
    let options = SemanticOptions { top_k: 10, batch_size: 8, cache_dir: None };
    let fulltext = TantivyIndex::build(&docs).expect("fulltext");
    let semantic = LanceSemanticIndex::build(&docs, embedder, &options, None).await.expect("semantic");
    HybridSearchEngine::new(Arc::new(fulltext), Arc::new(semantic))
}

#[tokio::test]
async fn strategies_dispatch_to_their_engines() {
    let engine = engine().await;

    let q = SearchQuery::parse("forests --strategy=fulltext").expect("parse");
    let results = engine.search(&q).await.expect("search");
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.search_type == SearchType::Fulltext));

    let q = SearchQuery::parse("forests --strategy=semantic --semantic-score-cutoff=0.1").expect("parse");
    let results = engine.search(&q).await.expect("search");
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.search_type == SearchType::Semantic && r.score > 0.1));
}

#[tokio::test]
async fn hybrid_results_have_unique_refs() {
    let engine = engine().await;
    let q = SearchQuery::parse("forests trees --semantic-score-cutoff=0").expect("parse");
    let results = engine.search(&q).await.expect("search");
    let mut refs: Vec<_> = results.iter().map(|r| r.application_ref.clone()).collect();
    let n = refs.len();
    refs.sort();
    refs.dedup();
    assert_eq!(refs.len(), n, "no ref appears twice");
    assert_eq!(results.first().map(|r| r.search_type), Some(SearchType::Fulltext));
}

#[tokio::test]
async fn invalid_query_short_circuits() {
    let engine = engine().await;
    let q = SearchQuery::parse("--strategy=hybrid").expect("parse");
    assert!(engine.search(&q).await.expect("search").is_empty());
}

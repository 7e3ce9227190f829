use std::sync::Arc;

use appsearch_core::document::InputDocument;
use appsearch_core::error::Error;
use appsearch_core::traits::{Embedder, SemanticEngine, SemanticOptions};
use appsearch_core::types::SearchType;
use appsearch_embed::HashEmbedder;
use appsearch_vector::cache::{content_hash, EmbeddingCache};
use appsearch_vector::LanceSemanticIndex;
use tempfile::TempDir;

fn doc(i: usize, description: &str) -> InputDocument {
    InputDocument {
        application_ref: format!("10:0xround:{i}"),
        chain_id: 10,
        round_id: "0xround".into(),
        round_application_id: i.to_string(),
        project_id: None,
        name: format!("Project {i}"),
        website_url: "https://example.org".into(),
        payout_wallet_address: "0xpayout".into(),
        banner_image_cid: None,
        logo_image_cid: None,
        description_markdown: description.to_string(),
        summary_text: description.to_string(),
    }
}

fn corpus() -> Vec<InputDocument> {
    vec![
        doc(0, "planting trees in tropical forests"),
        doc(1, "zero knowledge proofs for private voting"),
        doc(2, "clean drinking water for rural villages"),
        doc(3, "reforestation and trees for the climate"),
    ]
}

fn embedder() -> Arc<dyn Embedder> { Arc::new(HashEmbedder::new(256)) }

fn options() -> SemanticOptions { SemanticOptions { top_k: 3, batch_size: 2, cache_dir: None } }

#[tokio::test]
async fn lancedb_full_flow() {
    let tmp = TempDir::new().expect("tmp");
    let location = tmp.path().join("semantic-index");

    let built = LanceSemanticIndex::build(&corpus(), embedder(), &options(), Some(&location)).await.expect("build");
    assert_eq!(built.num_rows().await.expect("rows"), 4);

    let results = built.search("trees forests", None).await.expect("search");
    assert!(!results.is_empty() && results.len() <= 3, "top_k bounds results: {results:?}");
    assert!(results.iter().all(|r| r.search_type == SearchType::Semantic));
    assert_eq!(results[0].application_ref, "10:0xround:0");
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));

    let loaded = LanceSemanticIndex::load(&location, embedder(), &options()).await.expect("load");
    assert_eq!(loaded.search("trees forests", None).await.expect("search"), results);
}

#[tokio::test]
async fn min_score_filters_strictly() {
    let index = LanceSemanticIndex::build(&corpus(), embedder(), &options(), None).await.expect("build");
    let all = index.search("trees", None).await.expect("search");
    let best = all[0].score;
    let filtered = index.search("trees", Some(best)).await.expect("search");
    assert!(filtered.is_empty(), "score must be strictly above the cutoff");
    let loose = index.search("trees", Some(-1.0)).await.expect("search");
    assert_eq!(loose.len(), all.len());
}

#[tokio::test]
async fn rebuilding_an_existing_location_is_refused() {
    let tmp = TempDir::new().expect("tmp");
    let location = tmp.path().join("semantic-index");
    LanceSemanticIndex::build(&corpus(), embedder(), &options(), Some(&location)).await.expect("first build");
    let err = LanceSemanticIndex::build(&corpus(), embedder(), &options(), Some(&location)).await.err().expect("second build fails");
    assert!(matches!(Error::from(err), Error::ReindexNotSupported(_)));
}

#[tokio::test]
async fn load_reports_missing_empty_and_foreign_indices() {
    let tmp = TempDir::new().expect("tmp");

    let err = LanceSemanticIndex::load(&tmp.path().join("nope"), embedder(), &options()).await.err().expect("missing");
    assert!(matches!(Error::from(err), Error::NotFound(_)));

    let empty = tmp.path().join("empty");
    LanceSemanticIndex::build(&[], embedder(), &options(), Some(&empty)).await.expect("empty build");
    let err = LanceSemanticIndex::load(&empty, embedder(), &options()).await.err().expect("empty");
    assert!(matches!(Error::from(err), Error::NotFound(_)));

    let full = tmp.path().join("full");
    LanceSemanticIndex::build(&corpus(), embedder(), &options(), Some(&full)).await.expect("build");
    let other: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(128));
    let err = LanceSemanticIndex::load(&full, other, &options()).await.err().expect("foreign embedder");
    assert!(matches!(Error::from(err), Error::CorruptIndex(_)));
}

#[tokio::test]
async fn embedding_cache_is_shared_across_builds() {
    let tmp = TempDir::new().expect("tmp");
    let opts = SemanticOptions { cache_dir: Some(tmp.path().join("cache")), ..options() };
    LanceSemanticIndex::build(&corpus(), embedder(), &opts, Some(&tmp.path().join("a"))).await.expect("build");

    let cache = EmbeddingCache::open(&tmp.path().join("cache"), embedder().id(), 256).await.expect("open cache");
    let hashes: Vec<String> = corpus().iter().map(|d| content_hash(&d.description_markdown)).collect();
    let hits = cache.get_many(&hashes).await.expect("lookup");
    assert_eq!(hits.len(), 4);

    let expected = embedder().embed_batch(&[corpus()[2].description_markdown.clone()]).expect("embed");
    assert_eq!(hits[&hashes[2]], expected[0]);
}

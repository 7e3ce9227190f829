use appsearch_core::config::{EmbeddingBackend, EmbeddingSettings};
use appsearch_embed::{get_default_embedder, HashEmbedder};
use appsearch_core::traits::Embedder;

fn cosine(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

#[test]
fn hash_embedder_shapes_and_determinism() {
    let settings = EmbeddingSettings { backend: EmbeddingBackend::Hash, ..Default::default() };
    let embedder = get_default_embedder(&settings).expect("embedder");
    assert_eq!(embedder.id(), "hash:384");

    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 384, "embedding dim is 384");

    // Norm approximately 1.0
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    // Deterministic for same input
    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn shared_words_are_closer() {
    let e = HashEmbedder::new(256);
    let v = e.embed_batch(&["Planting trees in forests".to_string(), "TREES, forests!".to_string(), "zero knowledge proofs".to_string()]).expect("embed");
    assert!(cosine(&v[0], &v[1]) > cosine(&v[0], &v[2]));
}

#[test]
fn missing_model_dir_is_an_error() {
    let settings = EmbeddingSettings { model_dir: "/nonexistent/appsearch-model".into(), ..Default::default() };
    assert!(get_default_embedder(&settings).is_err());
}

#[test]
fn wordless_text_still_has_unit_norm() {
    let e = HashEmbedder::new(8);
    let v = e.embed_batch(&["".to_string(), "!!! ---".to_string(), "seeds".to_string()]).expect("embed");
    for emb in &v {
        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() <= 1e-5, "norm={norm}");
    }
    assert_eq!(v[0], v[1]);
    assert!(cosine(&v[0], &v[2]).is_finite());
}
